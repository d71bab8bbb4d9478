//! In-memory collector for tests and embedding.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::params::TargetPlatform;
use crate::util::hash::{ContentHash, HashAlgorithm, hash_bytes};

use super::types::{CollectError, Collector, InclusionRule, SourceInfo};

/// Collector whose rules and sources are supplied directly.
///
/// Source content hashes are computed from the given bytes; `location` points
/// wherever the caller says the content lives.
#[derive(Debug, Clone, Default)]
pub struct StaticCollector {
  rules: Vec<InclusionRule>,
  sources: BTreeMap<String, SourceInfo>,
}

impl StaticCollector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn rule(mut self, rule: InclusionRule) -> Self {
    self.rules.push(rule);
    self
  }

  /// Register a source with its content.
  pub fn add_source(mut self, path: &str, location: impl Into<PathBuf>, content: &[u8]) -> Self {
    self.sources.insert(
      path.to_string(),
      SourceInfo {
        path: path.to_string(),
        location: location.into(),
        hash: hash_bytes(content, HashAlgorithm::Sha256),
        type_hash: None,
        references: Vec::new(),
      },
    );
    self
  }

  /// Register a fully specified source.
  pub fn add_source_info(mut self, info: SourceInfo) -> Self {
    self.sources.insert(info.path.clone(), info);
    self
  }

  /// Add references from `path` to other sources. No-op for unknown sources.
  pub fn references<I, S>(mut self, path: &str, references: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    if let Some(info) = self.sources.get_mut(path) {
      info.references.extend(references.into_iter().map(Into::into));
    }
    self
  }

  pub fn type_hash(mut self, path: &str, type_hash: impl Into<String>) -> Self {
    if let Some(info) = self.sources.get_mut(path) {
      info.type_hash = Some(type_hash.into());
    }
    self
  }

  /// Override a source's content hash, e.g. to simulate an edit.
  pub fn with_hash(mut self, path: &str, hash: ContentHash) -> Self {
    if let Some(info) = self.sources.get_mut(path) {
      info.hash = hash;
    }
    self
  }
}

impl Collector for StaticCollector {
  fn collect(&self, _platform: &TargetPlatform) -> Result<Vec<InclusionRule>, CollectError> {
    Ok(self.rules.clone())
  }

  fn source(&self, path: &str) -> Option<SourceInfo> {
    self.sources.get(path).cloned()
  }
}
