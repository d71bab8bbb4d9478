//! Staging of changed artifacts into a version's package directory.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::diff::ChangeSet;
use crate::manifest::PatchManifest;

#[derive(Debug, Error)]
#[error("failed to copy {} to {}: {source}", from.display(), to.display())]
pub struct CopyError {
  pub from: PathBuf,
  pub to: PathBuf,
  #[source]
  pub source: std::io::Error,
}

/// Copy each changed artifact from `output_dir` into `package_dir` under its
/// distributed file name. Returns the copied paths in manifest order.
pub fn copy_updates(
  changes: &ChangeSet,
  manifest: &PatchManifest,
  output_dir: &Path,
  package_dir: &Path,
) -> Result<Vec<PathBuf>, CopyError> {
  let mut copied = Vec::with_capacity(changes.len());

  for record in changes.records(manifest) {
    let from = output_dir.join(&record.name);
    let to = package_dir.join(&record.file_name);
    fs::copy(&from, &to).map_err(|e| CopyError {
      from: from.clone(),
      to: to.clone(),
      source: e,
    })?;
    debug!(artifact = %record.name, to = ?to, "staged update");
    copied.push(to);
  }

  Ok(copied)
}
