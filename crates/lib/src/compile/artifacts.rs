//! Artifact relocation.
//!
//! Copies compiled binaries out of cargo's triple-specific output directory
//! into a flat, architecture-agnostic directory, so later stages never need
//! to know which triple produced them.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::CompileError;

/// Copy release binaries matching `prefix` from cargo's output directory for
/// `triple` into `out_dir`, returning the copied paths sorted by name.
///
/// Dep-info files (`*.d`) are skipped. An empty result is `ArtifactMissing`:
/// a successful compile must have produced at least the server binary, so
/// finding nothing here is a pipeline defect, not a user error.
pub fn relocate(
  source_dir: &Path,
  triple: &str,
  prefix: &str,
  out_dir: &Path,
) -> Result<Vec<PathBuf>, CompileError> {
  let release_dir = source_dir.join("target").join(triple).join("release");
  fs::create_dir_all(out_dir)?;

  let mut relocated = Vec::new();

  if release_dir.is_dir() {
    for entry in fs::read_dir(&release_dir)? {
      let entry = entry?;
      let path = entry.path();

      if !path.is_file() {
        continue;
      }

      let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        continue;
      };

      if !name.starts_with(prefix) || name.ends_with(".d") {
        continue;
      }

      let dest = out_dir.join(name);
      fs::copy(&path, &dest)?;
      debug!(from = %path.display(), to = %dest.display(), "relocated artifact");
      relocated.push(dest);
    }
  }

  if relocated.is_empty() {
    return Err(CompileError::ArtifactMissing {
      prefix: prefix.to_string(),
      dir: release_dir,
    });
  }

  relocated.sort();
  info!(count = relocated.len(), out = %out_dir.display(), "artifacts relocated");

  Ok(relocated)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  const TRIPLE: &str = "x86_64-unknown-linux-musl";

  fn release_dir(source: &Path) -> PathBuf {
    let dir = source.join("target").join(TRIPLE).join("release");
    fs::create_dir_all(&dir).unwrap();
    dir
  }

  #[test]
  fn relocates_prefix_matches_and_skips_dep_info() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let release = release_dir(source.path());

    fs::write(release.join("srv"), b"server").unwrap();
    fs::write(release.join("srv-ctl"), b"control").unwrap();
    fs::write(release.join("srv.d"), b"dep info").unwrap();
    fs::write(release.join("libother.rlib"), b"unrelated").unwrap();

    let relocated = relocate(source.path(), TRIPLE, "srv", out.path()).unwrap();

    let names: Vec<_> = relocated
      .iter()
      .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
      .collect();
    assert_eq!(names, ["srv", "srv-ctl"]);
    assert_eq!(fs::read(out.path().join("srv")).unwrap(), b"server");
    assert!(!out.path().join("srv.d").exists());
    assert!(!out.path().join("libother.rlib").exists());
  }

  #[test]
  #[cfg(unix)]
  fn relocation_preserves_execute_bit() {
    use std::os::unix::fs::PermissionsExt;

    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let release = release_dir(source.path());

    let bin = release.join("srv");
    fs::write(&bin, b"server").unwrap();
    fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

    relocate(source.path(), TRIPLE, "srv", out.path()).unwrap();

    let mode = fs::metadata(out.path().join("srv")).unwrap().permissions().mode();
    assert_ne!(mode & 0o111, 0);
  }

  #[test]
  fn relocation_is_idempotent() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let release = release_dir(source.path());
    fs::write(release.join("srv"), b"server").unwrap();

    let first = relocate(source.path(), TRIPLE, "srv", out.path()).unwrap();
    let bytes_first = fs::read(&first[0]).unwrap();

    let second = relocate(source.path(), TRIPLE, "srv", out.path()).unwrap();
    let bytes_second = fs::read(&second[0]).unwrap();

    assert_eq!(first, second);
    assert_eq!(bytes_first, bytes_second);
  }

  #[test]
  fn missing_release_dir_is_artifact_missing() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let err = relocate(source.path(), TRIPLE, "srv", out.path()).unwrap_err();
    assert!(matches!(err, CompileError::ArtifactMissing { .. }));
  }

  #[test]
  fn no_prefix_match_is_artifact_missing() {
    let source = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let release = release_dir(source.path());
    fs::write(release.join("unrelated"), b"x").unwrap();

    let err = relocate(source.path(), TRIPLE, "srv", out.path()).unwrap_err();
    match err {
      CompileError::ArtifactMissing { prefix, .. } => assert_eq!(prefix, "srv"),
      other => panic!("expected ArtifactMissing, got {other:?}"),
    }
  }
}
