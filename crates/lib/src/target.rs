//! Target architecture resolution.
//!
//! Maps the architecture name supplied by the outer build driver to the Rust
//! target triple and the musl cross-toolchain identifier used by the rest of
//! the pipeline. Both derived values live in the same table row, so the
//! toolchain can never use a different libc family than the triple it links
//! binaries for.

use std::fmt;

use thiserror::Error;

/// CPU architectures the pipeline can build images for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArch {
  X86,
  X86_64,
  Aarch64,
}

impl TargetArch {
  /// Returns the canonical build-driver name for this architecture.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "386",
      Self::X86_64 => "amd64",
      Self::Aarch64 => "arm64",
    }
  }
}

impl fmt::Display for TargetArch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// One row of the target table: everything derived from an architecture name.
#[derive(Debug, PartialEq, Eq)]
pub struct Target {
  pub arch: TargetArch,

  /// Accepted spellings of the architecture name.
  pub aliases: &'static [&'static str],

  /// Rust target triple passed to cargo.
  pub triple: &'static str,

  /// Identifier of the prebuilt cross-toolchain bundle.
  pub toolchain: &'static str,
}

/// The fixed set of supported targets.
///
/// Invariant: `triple` and `toolchain` in a row name the same CPU and the
/// same libc family (musl for musl).
pub const TARGETS: &[Target] = &[
  Target {
    arch: TargetArch::X86,
    aliases: &["386", "i386", "i686", "x86"],
    triple: "i686-unknown-linux-musl",
    toolchain: "i686-linux-musl",
  },
  Target {
    arch: TargetArch::X86_64,
    aliases: &["amd64", "x86-64", "x86_64"],
    triple: "x86_64-unknown-linux-musl",
    toolchain: "x86_64-linux-musl",
  },
  Target {
    arch: TargetArch::Aarch64,
    aliases: &["arm64", "aarch64"],
    triple: "aarch64-unknown-linux-musl",
    toolchain: "aarch64-linux-musl",
  },
];

/// The supplied architecture name is not one of the supported set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported architecture '{}' (supported: {})", .name, supported_names())]
pub struct UnsupportedArch {
  pub name: String,
}

/// Resolve an architecture name to its target table row.
///
/// Pure lookup with no side effects; an unknown name fails here, before any
/// network or filesystem work can happen.
pub fn resolve(name: &str) -> Result<&'static Target, UnsupportedArch> {
  TARGETS
    .iter()
    .find(|target| target.aliases.contains(&name))
    .ok_or_else(|| UnsupportedArch { name: name.to_string() })
}

/// Comma-separated list of every accepted architecture name.
pub fn supported_names() -> String {
  TARGETS
    .iter()
    .flat_map(|target| target.aliases.iter().copied())
    .collect::<Vec<_>>()
    .join(", ")
}
