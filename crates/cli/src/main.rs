use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// crossbake - minimal runtime images from statically linked cross builds
#[derive(Parser)]
#[command(name = "crossbake")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the server and stage a runtime image for one or more architectures
  Build(cmd::BuildArgs),

  /// Resolve an architecture name to its target triple and toolchain
  Resolve(cmd::ResolveArgs),
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Build(args) => cmd::cmd_build(args),
    Commands::Resolve(args) => cmd::cmd_resolve(args),
  }
}
