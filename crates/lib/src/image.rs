//! Runtime image assembly.
//!
//! Stages the compiled server binary into a fresh minimal rootfs and writes
//! the image configuration declaring it as the entrypoint. Nothing from the
//! build stage other than the binary itself reaches the image directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::consts::IMAGE_INSTALL_DIR;

/// Image configuration written next to the rootfs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
  /// Process to execute when the container starts.
  pub entrypoint: Vec<String>,

  /// Default arguments. Kept empty: arguments are supplied at container-run
  /// time and forwarded to the entrypoint.
  pub cmd: Vec<String>,
}

/// An assembled runtime image directory.
#[derive(Debug)]
pub struct RuntimeImage {
  /// Image directory containing `rootfs/` and `config.json`.
  pub root: PathBuf,

  /// Absolute install path of the binary inside the rootfs.
  pub entrypoint: String,
}

/// Errors from image assembly.
#[derive(Debug, Error)]
pub enum ImageError {
  /// The compiled artifact to stage does not exist.
  #[error("artifact missing: {}", .0.display())]
  ArtifactMissing(PathBuf),

  /// The artifact path has no usable file name.
  #[error("artifact has no file name: {}", .0.display())]
  InvalidArtifact(PathBuf),

  /// Image config serialization failed.
  #[error("failed to encode image config: {0}")]
  Config(#[from] serde_json::Error),

  /// I/O error while staging the image.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Assemble a runtime image containing exactly `artifact` at the fixed
/// install path.
///
/// `image_dir` is recreated from scratch on every call, so stale output from
/// an earlier build can never leak into the final image.
pub fn assemble(artifact: &Path, image_dir: &Path) -> Result<RuntimeImage, ImageError> {
  if !artifact.is_file() {
    return Err(ImageError::ArtifactMissing(artifact.to_path_buf()));
  }

  let name = artifact
    .file_name()
    .and_then(|n| n.to_str())
    .ok_or_else(|| ImageError::InvalidArtifact(artifact.to_path_buf()))?;

  if image_dir.exists() {
    fs::remove_dir_all(image_dir)?;
  }

  let rootfs = image_dir.join("rootfs");
  let bin_dir = rootfs.join(IMAGE_INSTALL_DIR.trim_start_matches('/'));
  fs::create_dir_all(&bin_dir)?;
  fs::copy(artifact, bin_dir.join(name))?;

  let entrypoint = format!("{IMAGE_INSTALL_DIR}/{name}");
  let config = ImageConfig {
    entrypoint: vec![entrypoint.clone()],
    cmd: Vec::new(),
  };
  fs::write(image_dir.join("config.json"), serde_json::to_vec_pretty(&config)?)?;

  info!(image = %image_dir.display(), entrypoint = %entrypoint, "image assembled");

  Ok(RuntimeImage {
    root: image_dir.to_path_buf(),
    entrypoint,
  })
}
