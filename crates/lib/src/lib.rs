//! crossbake-lib: build pipeline for minimal static-server runtime images.
//!
//! This crate implements the single-architecture build step behind the
//! `crossbake` CLI:
//! - `target`: architecture name -> target triple + cross-toolchain id
//! - `toolchain`: download and unpack the matching musl cross-toolchain
//! - `compile`: scoped linker environment, cargo invocation, relocation
//! - `image`: stage the binary into a fresh runtime image directory
//! - `pipeline`: sequential composition of the stages above

pub mod compile;
pub mod consts;
pub mod image;
pub mod pipeline;
pub mod target;
pub mod toolchain;
pub mod workspace;
