//! On-disk layout of build outputs.
//!
//! ```text
//! <root>/<platform>/
//! ├── output/                 # working output, reused across versions
//! │   └── <artifact>          # built artifact files
//! └── <version>/
//!     ├── patch_manifest.json
//!     ├── build_report.txt
//!     └── <file_name>         # artifacts changed in this version
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::consts::{BUILD_REPORT_FILE, OUTPUT_DIR_NAME, PATCH_MANIFEST_FILE};
use crate::params::TargetPlatform;

pub fn platform_dir(root: &Path, platform: &TargetPlatform) -> PathBuf {
  root.join(platform.as_str())
}

pub fn output_dir(root: &Path, platform: &TargetPlatform) -> PathBuf {
  platform_dir(root, platform).join(OUTPUT_DIR_NAME)
}

pub fn package_dir(root: &Path, platform: &TargetPlatform, version: u32) -> PathBuf {
  platform_dir(root, platform).join(version.to_string())
}

pub fn manifest_path(package_dir: &Path) -> PathBuf {
  package_dir.join(PATCH_MANIFEST_FILE)
}

pub fn report_path(package_dir: &Path) -> PathBuf {
  package_dir.join(BUILD_REPORT_FILE)
}

/// Versions that have a package directory below `platform_dir`, ascending.
///
/// Non-numeric entries (such as `output/`) are skipped. A missing platform
/// directory yields no versions.
pub fn existing_versions(platform_dir: &Path) -> io::Result<Vec<u32>> {
  let entries = match fs::read_dir(platform_dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(e),
  };

  let mut versions = Vec::new();
  for entry in entries {
    let entry = entry?;
    if !entry.file_type()?.is_dir() {
      continue;
    }
    if let Some(version) = entry.file_name().to_str().and_then(|name| name.parse::<u32>().ok()) {
      versions.push(version);
    }
  }
  versions.sort_unstable();
  Ok(versions)
}
