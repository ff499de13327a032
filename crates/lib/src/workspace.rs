//! Per-invocation build workspaces.
//!
//! Every architecture build gets its own directory tree, so parallel builds
//! share no state: separate toolchain unpacks, separate output directories,
//! separate image directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::consts::{APP_NAME, WORK_DIR_ENV};
use crate::target::TargetArch;

/// Isolated directory tree for one architecture's build.
#[derive(Debug, Clone)]
pub struct Workspace {
  root: PathBuf,
}

impl Workspace {
  /// Create (or reuse) the workspace for `arch` under `base`.
  pub fn create(base: &Path, arch: TargetArch) -> io::Result<Self> {
    let root = base.join(arch.as_str());
    fs::create_dir_all(&root)?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Where toolchain bundles are unpacked.
  pub fn toolchains_dir(&self) -> PathBuf {
    self.root.join("toolchains")
  }

  /// Flat, architecture-agnostic artifact output directory.
  pub fn out_dir(&self) -> PathBuf {
    self.root.join("out")
  }

  /// Where the runtime image is assembled.
  pub fn image_dir(&self) -> PathBuf {
    self.root.join("image")
  }
}

/// Resolve the workspace base directory.
///
/// Precedence: explicit option, `CROSSBAKE_WORK_DIR`, `.crossbake` under the
/// source tree.
pub fn base_dir(explicit: Option<&Path>, source_dir: &Path) -> PathBuf {
  if let Some(path) = explicit {
    return path.to_path_buf();
  }

  if let Ok(path) = std::env::var(WORK_DIR_ENV) {
    return PathBuf::from(path);
  }

  source_dir.join(format!(".{APP_NAME}"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;
  use tempfile::TempDir;

  #[test]
  fn workspace_layout_is_keyed_by_arch() {
    let temp = TempDir::new().unwrap();
    let workspace = Workspace::create(temp.path(), TargetArch::Aarch64).unwrap();

    assert_eq!(workspace.root(), temp.path().join("arm64"));
    assert_eq!(workspace.toolchains_dir(), temp.path().join("arm64/toolchains"));
    assert_eq!(workspace.out_dir(), temp.path().join("arm64/out"));
    assert_eq!(workspace.image_dir(), temp.path().join("arm64/image"));
    assert!(workspace.root().is_dir());
  }

  #[test]
  fn workspaces_for_different_arches_are_disjoint() {
    let temp = TempDir::new().unwrap();
    let amd64 = Workspace::create(temp.path(), TargetArch::X86_64).unwrap();
    let arm64 = Workspace::create(temp.path(), TargetArch::Aarch64).unwrap();

    assert_ne!(amd64.root(), arm64.root());
  }

  #[test]
  #[serial]
  fn base_dir_precedence() {
    let source = Path::new("/src/server");

    temp_env::with_var(WORK_DIR_ENV, Some("/custom/work"), || {
      assert_eq!(
        base_dir(Some(Path::new("/explicit")), source),
        PathBuf::from("/explicit")
      );
      assert_eq!(base_dir(None, source), PathBuf::from("/custom/work"));
    });

    temp_env::with_var(WORK_DIR_ENV, None::<&str>, || {
      assert_eq!(base_dir(None, source), PathBuf::from("/src/server/.crossbake"));
    });
  }
}
