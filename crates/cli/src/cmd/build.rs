//! Implementation of the `crossbake build` command.
//!
//! Resolves every requested architecture up front, so an unsupported name
//! aborts before any network or filesystem work, then runs one isolated
//! pipeline per architecture concurrently.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::task::JoinSet;
use tracing::debug;

use crossbake_lib::consts::TARGETARCH_ENV;
use crossbake_lib::pipeline::{self, BuildError, BuildOptions, BuildReport};
use crossbake_lib::target::{self, Target};
use crossbake_lib::{toolchain, workspace};

use crate::output;

#[derive(Debug, Args)]
pub struct BuildArgs {
  /// Server source tree (cargo workspace root)
  #[arg(default_value = ".")]
  pub source_dir: PathBuf,

  /// Cargo package to build
  #[arg(short, long)]
  pub package: String,

  /// Target architecture; repeatable. Defaults to $TARGETARCH.
  #[arg(short, long = "arch")]
  pub arch: Vec<String>,

  /// Workspace base directory (default: $CROSSBAKE_WORK_DIR, else
  /// <source>/.crossbake)
  #[arg(long)]
  pub work_dir: Option<PathBuf>,

  /// Host serving cross-toolchain archives (default: $CROSSBAKE_TOOLCHAIN_HOST,
  /// else https://musl.cc)
  #[arg(long)]
  pub toolchain_host: Option<String>,

  /// Expected SHA-256 of the toolchain archive; verification is skipped when
  /// unset
  #[arg(long)]
  pub toolchain_sha256: Option<String>,

  /// File-name prefix of binaries to relocate (default: package name)
  #[arg(long)]
  pub bin_prefix: Option<String>,

  /// Cargo executable to invoke
  #[arg(long)]
  pub cargo: Option<String>,
}

pub fn cmd_build(args: BuildArgs) -> Result<()> {
  // Resolve every architecture before any I/O happens.
  let arch_names = if args.arch.is_empty() {
    match std::env::var(TARGETARCH_ENV) {
      Ok(value) => vec![value],
      Err(_) => {
        output::print_error(&format!(
          "no architecture given: pass --arch or set {TARGETARCH_ENV}"
        ));
        std::process::exit(2);
      }
    }
  } else {
    args.arch.clone()
  };

  let mut targets: Vec<&'static Target> = Vec::new();
  for name in &arch_names {
    match target::resolve(name) {
      Ok(target) => {
        if !targets.iter().any(|known| known.arch == target.arch) {
          targets.push(target);
        }
      }
      Err(err) => {
        output::print_error(&err.to_string());
        std::process::exit(2);
      }
    }
  }

  for target in &targets {
    output::print_info(&format!("{} → {}", target.arch, target.triple));
  }

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  match rt.block_on(run_builds(targets, &args)) {
    Ok(reports) => {
      println!();
      output::print_success(&format!("Built {} image(s)", reports.len()));
      for report in &reports {
        output::print_stat("Arch", report.target.arch.as_str());
        output::print_stat("Artifact", &report.artifact.display().to_string());
        output::print_stat("Image", &report.image.root.display().to_string());
        output::print_stat("Entrypoint", &report.image.entrypoint);
        output::print_stat("Took", &output::format_duration(report.elapsed));
      }
      Ok(())
    }
    Err(err) => {
      output::print_error(&err.to_string());
      std::process::exit(err.exit_code());
    }
  }
}

/// Run one pipeline per target, each in its own workspace subtree.
///
/// All builds run to completion; if any failed, the first failure is
/// reported after the rest have finished (they are independent, so a
/// sibling's failure does not cancel them).
async fn run_builds(targets: Vec<&'static Target>, args: &BuildArgs) -> Result<Vec<BuildReport>, BuildError> {
  let work_dir = workspace::base_dir(args.work_dir.as_deref(), &args.source_dir);
  let toolchain_host = toolchain::toolchain_host(args.toolchain_host.as_deref());
  debug!(work_dir = %work_dir.display(), host = %toolchain_host, "resolved build configuration");

  let mut set = JoinSet::new();

  for target in targets {
    let mut options = BuildOptions::new(&args.source_dir, &args.package);
    options.work_dir = work_dir.clone();
    options.bin_prefix = args.bin_prefix.clone();
    options.toolchain_host = toolchain_host.clone();
    options.toolchain_sha256 = args.toolchain_sha256.clone();
    options.cargo = args.cargo.clone();

    set.spawn(async move { pipeline::run(target, &options).await });
  }

  let mut reports = Vec::new();
  let mut first_error = None;

  while let Some(joined) = set.join_next().await {
    let result = joined.map_err(|e| BuildError::Io(std::io::Error::other(e)))?;
    match result {
      Ok(report) => reports.push(report),
      Err(err) => {
        if first_error.is_none() {
          first_error = Some(err);
        }
      }
    }
  }

  if let Some(err) = first_error {
    return Err(err);
  }

  reports.sort_by_key(|report| report.target.arch.as_str());
  Ok(reports)
}
