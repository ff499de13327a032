//! Toolchain archive download and extraction.
//!
//! The remote bundle is a gzipped tar whose entries all live under a single
//! `<id>-cross/` directory; extraction strips that component so the unpacked
//! layout is predictable regardless of how the archive was rolled.

use std::fs;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::Archive;
use tracing::{debug, info};

use super::ToolchainError;

/// Download `url` and return the raw response body.
pub async fn download(url: &str) -> Result<Vec<u8>, ToolchainError> {
  info!(url = %url, "fetching toolchain archive");

  let response = reqwest::get(url).await.map_err(|e| ToolchainError::Fetch {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  if !response.status().is_success() {
    return Err(ToolchainError::Fetch {
      url: url.to_string(),
      message: format!("HTTP {}", response.status()),
    });
  }

  let bytes = response.bytes().await.map_err(|e| ToolchainError::Fetch {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  info!(size = bytes.len(), "download complete");

  Ok(bytes.to_vec())
}

/// Verify downloaded bytes against an expected SHA-256 digest (lowercase or
/// uppercase hex).
pub fn verify_digest(bytes: &[u8], expected: &str) -> Result<(), ToolchainError> {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  let actual = hex::encode(hasher.finalize());

  if !actual.eq_ignore_ascii_case(expected) {
    return Err(ToolchainError::DigestMismatch {
      expected: expected.to_string(),
      actual,
    });
  }

  debug!(digest = %actual, "digest verified");
  Ok(())
}

/// Unpack a gzipped tar stream into `dest`, stripping the first path
/// component of every entry.
pub fn unpack_tar_gz(bytes: &[u8], dest: &Path) -> Result<(), ToolchainError> {
  fs::create_dir_all(dest)?;

  let decoder = GzDecoder::new(bytes);
  let mut archive = Archive::new(decoder);

  for entry in archive.entries().map_err(ToolchainError::Archive)? {
    let mut entry = entry.map_err(ToolchainError::Archive)?;
    let path = entry.path().map_err(ToolchainError::Archive)?;

    let stripped: PathBuf = path.components().skip(1).collect();
    if stripped.as_os_str().is_empty() {
      continue;
    }

    let dest_path = dest.join(&stripped);
    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent)?;
    }

    entry.unpack(&dest_path).map_err(ToolchainError::Archive)?;
  }

  debug!(dest = %dest.display(), "archive unpacked");
  Ok(())
}

#[cfg(test)]
pub mod tests {
  use super::*;
  use flate2::Compression;
  use flate2::write::GzEncoder;
  use tempfile::TempDir;

  /// Build a gzipped tarball shaped like a musl.cc bundle. With `with_gcc`
  /// the bundle contains `bin/<id>-gcc`; without it only a README.
  pub fn toolchain_archive(id: &str, with_gcc: bool) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    append_file(&mut builder, &format!("{id}-cross/README"), b"cross toolchain\n", 0o644);
    if with_gcc {
      append_file(
        &mut builder,
        &format!("{id}-cross/bin/{id}-gcc"),
        b"#!/bin/sh\nexit 0\n",
        0o755,
      );
    }

    builder.into_inner().unwrap().finish().unwrap()
  }

  fn append_file(
    builder: &mut tar::Builder<GzEncoder<Vec<u8>>>,
    path: &str,
    data: &[u8],
    mode: u32,
  ) {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(mode);
    header.set_cksum();
    builder.append_data(&mut header, path, data).unwrap();
  }

  #[tokio::test]
  async fn download_returns_body_on_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/x86_64-linux-musl-cross.tgz")
      .with_body(b"archive-bytes")
      .create_async()
      .await;

    let url = format!("{}/x86_64-linux-musl-cross.tgz", server.url());
    let bytes = download(&url).await.unwrap();

    mock.assert_async().await;
    assert_eq!(bytes, b"archive-bytes");
  }

  #[tokio::test]
  async fn download_fails_on_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("GET", "/missing-cross.tgz")
      .with_status(404)
      .create_async()
      .await;

    let url = format!("{}/missing-cross.tgz", server.url());
    let err = download(&url).await.unwrap_err();

    match err {
      ToolchainError::Fetch { message, .. } => assert!(message.contains("404")),
      other => panic!("expected Fetch error, got {other:?}"),
    }
  }

  #[test]
  fn verify_digest_accepts_matching_hash() {
    // SHA-256 of "abc"
    let expected = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    verify_digest(b"abc", expected).unwrap();
    verify_digest(b"abc", &expected.to_uppercase()).unwrap();
  }

  #[test]
  fn verify_digest_rejects_mismatch() {
    let err = verify_digest(b"abc", &"0".repeat(64)).unwrap_err();
    match err {
      ToolchainError::DigestMismatch { actual, .. } => {
        assert_eq!(actual.len(), 64);
      }
      other => panic!("expected DigestMismatch, got {other:?}"),
    }
  }

  #[test]
  fn unpack_strips_top_level_directory() {
    let archive = toolchain_archive("i686-linux-musl", true);
    let dest = TempDir::new().unwrap();

    unpack_tar_gz(&archive, dest.path()).unwrap();

    assert!(dest.path().join("README").is_file());
    assert!(dest.path().join("bin/i686-linux-musl-gcc").is_file());
  }

  #[test]
  #[cfg(unix)]
  fn unpack_preserves_execute_bit() {
    use std::os::unix::fs::PermissionsExt;

    let archive = toolchain_archive("i686-linux-musl", true);
    let dest = TempDir::new().unwrap();

    unpack_tar_gz(&archive, dest.path()).unwrap();

    let mode = fs::metadata(dest.path().join("bin/i686-linux-musl-gcc"))
      .unwrap()
      .permissions()
      .mode();
    assert_ne!(mode & 0o111, 0, "gcc must stay executable");
  }

  #[test]
  fn unpack_rejects_garbage() {
    let dest = TempDir::new().unwrap();
    let err = unpack_tar_gz(b"definitely not a tgz", dest.path()).unwrap_err();
    assert!(matches!(err, ToolchainError::Archive(_)));
  }
}
