//! Cross-compilation driver.
//!
//! Derives the linker environment for a resolved target and invokes cargo
//! for the server package. The environment is a plain value threaded into
//! the child process only; the orchestrator's own environment is never
//! mutated, so concurrent builds for different architectures cannot
//! interfere with each other.

pub mod artifacts;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::target::Target;
use crate::toolchain::Toolchain;

/// Errors from compilation and artifact relocation.
#[derive(Debug, Error)]
pub enum CompileError {
  /// cargo exited with a non-zero status. Diagnostics have already reached
  /// the user through the inherited stderr.
  #[error("cargo build failed for package {package} (exit code {code:?})")]
  CargoFailed { package: String, code: Option<i32> },

  /// A successful compile left nothing matching the expected binary prefix.
  #[error("no artifact matching '{prefix}*' found in {}", .dir.display())]
  ArtifactMissing { prefix: String, dir: PathBuf },

  /// I/O error while spawning cargo or relocating artifacts.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Compute the environment for linking against a musl cross-toolchain.
///
/// The map is applied to the cargo child process with `Command::envs`:
/// - `PATH` with the toolchain `bin/` directory prepended, so the cross gcc
///   finds its own binutils
/// - `CC_<triple>` naming the cross gcc for build scripts compiling C code
/// - `RUSTFLAGS` routing the final link through the same gcc
pub fn link_env(target: &Target, toolchain: &Toolchain) -> BTreeMap<String, String> {
  let gcc = toolchain.gcc();
  let bin_dir = toolchain.bin_dir();

  let path = match std::env::var("PATH") {
    Ok(current) => format!("{}:{}", bin_dir.display(), current),
    Err(_) => bin_dir.display().to_string(),
  };

  let mut env = BTreeMap::new();
  env.insert("PATH".to_string(), path);
  env.insert(
    format!("CC_{}", target.triple.replace('-', "_")),
    gcc.display().to_string(),
  );
  env.insert("RUSTFLAGS".to_string(), format!("-C linker={}", gcc.display()));
  env
}

/// Run `cargo build --release --target <triple> --package <package>` inside
/// `source_dir`.
///
/// Only the named package is built, never the whole workspace. stdout and
/// stderr are inherited so compiler diagnostics are surfaced verbatim.
/// `cargo_override` substitutes the cargo executable (used by tests).
pub async fn compile(
  source_dir: &Path,
  package: &str,
  target: &Target,
  env: &BTreeMap<String, String>,
  cargo_override: Option<&str>,
) -> Result<(), CompileError> {
  let cargo = cargo_override.unwrap_or("cargo");

  info!(package = %package, triple = %target.triple, "compiling");
  debug!(cargo = %cargo, source = %source_dir.display(), "spawning compiler");

  let status = Command::new(cargo)
    .args(["build", "--release", "--target", target.triple, "--package", package])
    .current_dir(source_dir)
    .envs(env)
    .stdout(Stdio::inherit())
    .stderr(Stdio::inherit())
    .status()
    .await?;

  if !status.success() {
    return Err(CompileError::CargoFailed {
      package: package.to_string(),
      code: status.code(),
    });
  }

  info!(package = %package, "compile finished");
  Ok(())
}
