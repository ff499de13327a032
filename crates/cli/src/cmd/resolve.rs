//! Implementation of the `crossbake resolve` command.
//!
//! Resolves an architecture name the way `build` would and prints the derived
//! target triple and toolchain identifier, without performing any build work.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crossbake_lib::target;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ResolveArgs {
  /// Architecture name as supplied by the build driver (e.g. amd64, arm64)
  pub arch: String,

  /// Output format
  #[arg(long, value_enum, default_value = "text")]
  pub format: OutputFormat,
}

#[derive(Serialize)]
struct Resolved<'a> {
  arch: &'a str,
  triple: &'a str,
  toolchain: &'a str,
}

pub fn cmd_resolve(args: ResolveArgs) -> Result<()> {
  let target = match target::resolve(&args.arch) {
    Ok(target) => target,
    Err(err) => {
      output::print_error(&err.to_string());
      std::process::exit(2);
    }
  };

  if args.format.is_json() {
    output::print_json(&Resolved {
      arch: target.arch.as_str(),
      triple: target.triple,
      toolchain: target.toolchain,
    })?;
  } else {
    output::print_stat("Arch", target.arch.as_str());
    output::print_stat("Triple", target.triple);
    output::print_stat("Toolchain", target.toolchain);
  }

  Ok(())
}
