mod build;
mod resolve;

pub use build::{BuildArgs, cmd_build};
pub use resolve::{ResolveArgs, cmd_resolve};
