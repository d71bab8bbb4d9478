//! Differences between consecutive manifests.
//!
//! The change set is what a client of version `n - 1` must download to reach
//! version `n`. Hash identity decides membership; whether an artifact was
//! rebuilt does not matter.

use std::collections::HashMap;

use serde::Serialize;

use crate::manifest::{ArtifactRecord, ManifestError, ManifestStore, PatchManifest};

/// Artifacts to redistribute for one version.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
  /// Version diffed against, `None` when there was no predecessor manifest.
  pub prior_version: Option<u32>,

  /// Artifacts absent from the prior manifest.
  pub added: Vec<String>,

  /// Artifacts whose hash differs from the prior manifest.
  pub modified: Vec<String>,

  /// Artifacts only in the prior manifest. Informational; nothing is shipped
  /// for them.
  pub removed: Vec<String>,
}

impl ChangeSet {
  /// Added names, then modified names.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.added.iter().chain(&self.modified).map(String::as_str)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.names().any(|n| n == name)
  }

  pub fn len(&self) -> usize {
    self.added.len() + self.modified.len()
  }

  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.modified.is_empty()
  }

  /// Records of `manifest` that are part of this change set, in manifest order.
  pub fn records<'a>(&'a self, manifest: &'a PatchManifest) -> impl Iterator<Item = &'a ArtifactRecord> {
    manifest.artifacts.iter().filter(move |record| self.contains(&record.name))
  }
}

/// Compare `current` against `prior`.
pub fn compute_changes(current: &PatchManifest, prior: &PatchManifest) -> ChangeSet {
  let previous: HashMap<&str, &ArtifactRecord> = prior.artifacts.iter().map(|r| (r.name.as_str(), r)).collect();
  let mut changes = ChangeSet {
    prior_version: (prior.version != 0).then_some(prior.version),
    ..Default::default()
  };

  for record in &current.artifacts {
    match previous.get(record.name.as_str()) {
      None => changes.added.push(record.name.clone()),
      Some(old) if old.hash != record.hash => changes.modified.push(record.name.clone()),
      Some(_) => {}
    }
  }

  for record in &prior.artifacts {
    if current.get(&record.name).is_none() {
      changes.removed.push(record.name.clone());
    }
  }

  changes
}

/// Load the manifest of `version - 1`, the empty manifest if there is none.
pub fn load_predecessor(store: &ManifestStore, version: u32) -> Result<PatchManifest, ManifestError> {
  match version.checked_sub(1) {
    Some(previous) if previous > 0 => store.load(previous),
    _ => Ok(PatchManifest::empty()),
  }
}
