//! Single-architecture build pipeline.
//!
//! Composes the stages for one already-resolved target:
//!
//! 1. Provision the cross-toolchain into the invocation's workspace
//! 2. Derive the scoped linker environment
//! 3. Compile the server package for the target triple
//! 4. Relocate the produced binaries to the flat output directory
//! 5. Assemble the runtime image
//!
//! Each stage fails fast; no image is produced unless every stage succeeds.
//! Architecture resolution happens in the caller before this runs, so
//! unsupported input can never reach network or filesystem work.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::compile::{self, CompileError, artifacts};
use crate::image::{self, ImageError, RuntimeImage};
use crate::target::Target;
use crate::toolchain::{self, ToolchainError};
use crate::workspace::{self, Workspace};

/// Options for a single-architecture build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
  /// Server source tree containing the cargo workspace to build.
  pub source_dir: PathBuf,

  /// Cargo package to build (the server component only, never the whole
  /// workspace).
  pub package: String,

  /// Workspace base directory; each architecture builds in its own
  /// subdirectory underneath it.
  pub work_dir: PathBuf,

  /// File-name prefix of binaries to relocate. Defaults to the package name.
  pub bin_prefix: Option<String>,

  /// Host serving `<toolchain>-cross.tgz` bundles.
  pub toolchain_host: String,

  /// Optional SHA-256 digest the downloaded bundle must match.
  pub toolchain_sha256: Option<String>,

  /// Substitute cargo executable.
  pub cargo: Option<String>,
}

impl BuildOptions {
  pub fn new(source_dir: impl Into<PathBuf>, package: impl Into<String>) -> Self {
    let source_dir = source_dir.into();
    let work_dir = workspace::base_dir(None, &source_dir);

    Self {
      source_dir,
      package: package.into(),
      work_dir,
      bin_prefix: None,
      toolchain_host: toolchain::toolchain_host(None),
      toolchain_sha256: None,
      cargo: None,
    }
  }

  fn prefix(&self) -> &str {
    self.bin_prefix.as_deref().unwrap_or(&self.package)
  }
}

/// Result of a successful single-architecture build.
#[derive(Debug)]
pub struct BuildReport {
  pub target: &'static Target,

  /// Primary relocated server binary.
  pub artifact: PathBuf,

  /// Every binary relocated from the release directory.
  pub relocated: Vec<PathBuf>,

  pub image: RuntimeImage,
  pub elapsed: Duration,
}

/// Errors from the build pipeline.
#[derive(Debug, Error)]
pub enum BuildError {
  /// Server source tree does not exist.
  #[error("source directory not found: {}", .0.display())]
  SourceNotFound(PathBuf),

  /// Toolchain provisioning failed.
  #[error(transparent)]
  Toolchain(#[from] ToolchainError),

  /// Compilation or relocation failed.
  #[error(transparent)]
  Compile(#[from] CompileError),

  /// Image assembly failed.
  #[error(transparent)]
  Image(#[from] ImageError),

  /// I/O error while preparing the workspace.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl BuildError {
  /// Exit code to surface for this failure.
  ///
  /// Compile failures propagate the compiler's own exit code; everything
  /// else maps to 1.
  pub fn exit_code(&self) -> i32 {
    match self {
      BuildError::Compile(CompileError::CargoFailed { code: Some(code), .. }) => *code,
      _ => 1,
    }
  }
}

/// Run the full pipeline for one resolved target.
pub async fn run(target: &'static Target, options: &BuildOptions) -> Result<BuildReport, BuildError> {
  let started = Instant::now();

  if !options.source_dir.is_dir() {
    return Err(BuildError::SourceNotFound(options.source_dir.clone()));
  }

  let workspace = Workspace::create(&options.work_dir, target.arch)?;

  info!(
    arch = %target.arch,
    triple = %target.triple,
    workspace = %workspace.root().display(),
    "starting build"
  );

  let toolchain = toolchain::provision(
    target,
    &options.toolchain_host,
    options.toolchain_sha256.as_deref(),
    &workspace.toolchains_dir(),
  )
  .await?;

  let env = compile::link_env(target, &toolchain);
  compile::compile(
    &options.source_dir,
    &options.package,
    target,
    &env,
    options.cargo.as_deref(),
  )
  .await?;

  let relocated = artifacts::relocate(
    &options.source_dir,
    target.triple,
    options.prefix(),
    &workspace.out_dir(),
  )?;

  // Prefer the binary named exactly after the package; fall back to the
  // first relocated artifact otherwise.
  let artifact = relocated
    .iter()
    .find(|path| path.file_name().and_then(|name| name.to_str()) == Some(options.package.as_str()))
    .unwrap_or(&relocated[0])
    .clone();

  let image = image::assemble(&artifact, &workspace.image_dir())?;

  let elapsed = started.elapsed();
  info!(arch = %target.arch, elapsed = ?elapsed, "build complete");

  Ok(BuildReport {
    target,
    artifact,
    relocated,
    image,
    elapsed,
  })
}
