//! Cross-toolchain provisioning.
//!
//! Downloads the prebuilt musl cross-compiler bundle matching a resolved
//! target and unpacks it into the invocation's workspace. Every invocation
//! owns its own unpacked bundle; nothing is shared or reused across builds.

pub mod fetch;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::consts::{DEFAULT_TOOLCHAIN_HOST, TOOLCHAIN_ARCHIVE_SUFFIX, TOOLCHAIN_HOST_ENV};
use crate::target::Target;

/// An unpacked cross-toolchain bundle on local disk.
#[derive(Debug, Clone)]
pub struct Toolchain {
  /// Toolchain identifier, e.g. `x86_64-linux-musl`.
  pub id: String,

  /// Root of the unpacked bundle.
  pub root: PathBuf,
}

impl Toolchain {
  /// Directory containing the toolchain executables.
  pub fn bin_dir(&self) -> PathBuf {
    self.root.join("bin")
  }

  /// Path to the target C compiler, which also serves as the linker for the
  /// static build.
  pub fn gcc(&self) -> PathBuf {
    self.bin_dir().join(format!("{}-gcc", self.id))
  }
}

/// Errors from toolchain provisioning.
#[derive(Debug, Error)]
pub enum ToolchainError {
  /// Download failed (transport error or non-success status).
  #[error("toolchain fetch failed for {url}: {message}")]
  Fetch { url: String, message: String },

  /// Downloaded archive does not match the expected SHA-256 digest.
  #[error("toolchain digest mismatch: expected {expected}, got {actual}")]
  DigestMismatch { expected: String, actual: String },

  /// Archive is not a valid gzipped tar stream.
  #[error("corrupt toolchain archive: {0}")]
  Archive(std::io::Error),

  /// Unpacked bundle is missing the expected cross compiler.
  #[error("toolchain bundle has no compiler at {}", .0.display())]
  MissingCompiler(PathBuf),

  /// I/O error while staging the bundle.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Resolve the toolchain host: explicit value, env override, built-in default.
pub fn toolchain_host(explicit: Option<&str>) -> String {
  if let Some(host) = explicit {
    return host.to_string();
  }

  if let Ok(host) = std::env::var(TOOLCHAIN_HOST_ENV) {
    return host;
  }

  DEFAULT_TOOLCHAIN_HOST.to_string()
}

/// Construct the download URL for a toolchain bundle.
pub fn archive_url(host: &str, toolchain_id: &str) -> String {
  format!(
    "{}/{}{}",
    host.trim_end_matches('/'),
    toolchain_id,
    TOOLCHAIN_ARCHIVE_SUFFIX
  )
}

/// Fetch and unpack the cross-toolchain for `target` under `dest_root`.
///
/// When `expected_sha256` is given the downloaded archive is verified before
/// unpacking; otherwise the bytes are trusted as-is. After unpacking, the
/// bundle must contain `bin/<id>-gcc` or provisioning fails, so a broken
/// bundle surfaces here instead of as an obscure linker error later.
pub async fn provision(
  target: &Target,
  host: &str,
  expected_sha256: Option<&str>,
  dest_root: &Path,
) -> Result<Toolchain, ToolchainError> {
  let url = archive_url(host, target.toolchain);
  let bytes = fetch::download(&url).await?;

  if let Some(expected) = expected_sha256 {
    fetch::verify_digest(&bytes, expected)?;
  }

  let root = dest_root.join(format!("{}-cross", target.toolchain));
  fetch::unpack_tar_gz(&bytes, &root)?;

  let toolchain = Toolchain {
    id: target.toolchain.to_string(),
    root,
  };

  let gcc = toolchain.gcc();
  if !gcc.is_file() {
    return Err(ToolchainError::MissingCompiler(gcc));
  }

  info!(toolchain = %toolchain.id, root = %toolchain.root.display(), "toolchain ready");

  Ok(toolchain)
}
