//! Manifest storage below a platform directory.
//!
//! # Storage Layout
//!
//! ```text
//! <root>/<platform>/
//! ├── 1/patch_manifest.json
//! ├── 2/patch_manifest.json
//! └── ...
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::layout;
use crate::util::fs::write_atomic;

use super::types::{ManifestError, PatchManifest};

/// Load a manifest file.
///
/// Returns the empty manifest if the file doesn't exist. A file that exists but
/// does not parse is an error, never an empty manifest.
pub fn load_manifest_file(path: &Path) -> Result<PatchManifest, ManifestError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => {
      debug!(path = ?path, "no manifest on disk, using empty manifest");
      return Ok(PatchManifest::empty());
    }
    Err(e) => {
      return Err(ManifestError::Read {
        path: path.to_path_buf(),
        source: e,
      });
    }
  };

  PatchManifest::from_json(&content).map_err(|e| ManifestError::Corrupt {
    path: path.to_path_buf(),
    source: Box::new(e),
  })
}

/// Reads and writes the manifests of one platform.
#[derive(Debug, Clone)]
pub struct ManifestStore {
  platform_dir: PathBuf,
}

impl ManifestStore {
  pub fn new(platform_dir: impl Into<PathBuf>) -> Self {
    Self {
      platform_dir: platform_dir.into(),
    }
  }

  pub fn platform_dir(&self) -> &Path {
    &self.platform_dir
  }

  /// Path of the manifest for `version`.
  pub fn path(&self, version: u32) -> PathBuf {
    layout::manifest_path(&self.platform_dir.join(version.to_string()))
  }

  pub fn exists(&self, version: u32) -> bool {
    self.path(version).is_file()
  }

  /// Load the manifest for `version`, or the empty manifest if none was written.
  pub fn load(&self, version: u32) -> Result<PatchManifest, ManifestError> {
    let path = self.path(version);
    let manifest = load_manifest_file(&path)?;

    if manifest.version != 0 && manifest.version != version {
      return Err(ManifestError::VersionMismatch {
        path,
        expected: version,
        found: manifest.version,
      });
    }

    Ok(manifest)
  }

  /// Versions that have a manifest on disk, ascending.
  ///
  /// Package directories without a manifest (left behind by a failed run) are skipped.
  pub fn versions(&self) -> Result<Vec<u32>, ManifestError> {
    let versions = layout::existing_versions(&self.platform_dir).map_err(|e| ManifestError::Read {
      path: self.platform_dir.clone(),
      source: e,
    })?;
    Ok(versions.into_iter().filter(|v| self.exists(*v)).collect())
  }

  /// The most recent manifest with a version below `version`.
  ///
  /// Returns the empty manifest when there is none.
  pub fn latest_before(&self, version: u32) -> Result<PatchManifest, ManifestError> {
    match self.versions()?.into_iter().rev().find(|v| *v < version) {
      Some(previous) => self.load(previous),
      None => Ok(PatchManifest::empty()),
    }
  }

  /// Write `manifest` into its version's package directory.
  pub fn save(&self, manifest: &PatchManifest) -> Result<PathBuf, ManifestError> {
    let path = self.path(manifest.version);
    let write_err = |source| ManifestError::Write {
      path: path.clone(),
      source,
    };

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(write_err)?;
    }
    let content = manifest.to_json()?;
    write_atomic(&path, content.as_bytes()).map_err(write_err)?;

    Ok(path)
  }
}
