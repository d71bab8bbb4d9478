use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::TargetPlatform;
use crate::util::hash::{ContentHash, HashError};

/// Errors produced while collecting inclusion rules or sources.
#[derive(Debug, Error)]
pub enum CollectError {
  #[error("failed to read {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse project file {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to walk source root: {message}")]
  Walk { message: String },

  #[error(transparent)]
  Hash(#[from] HashError),
}

/// Maps a selection of sources to one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionRule {
  /// Base artifact name.
  pub artifact: String,
  /// Logical source paths selected by this rule.
  pub sources: Vec<String>,
  /// Optional variant tag; the artifact is then named `<artifact>.<variant>`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variant: Option<String>,
}

impl InclusionRule {
  pub fn new<I, S>(artifact: impl Into<String>, sources: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      artifact: artifact.into(),
      sources: sources.into_iter().map(Into::into).collect(),
      variant: None,
    }
  }

  pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
    self.variant = Some(variant.into());
    self
  }

  /// Name of the artifact this rule contributes to.
  pub fn artifact_name(&self) -> String {
    match &self.variant {
      Some(variant) => format!("{}.{}", self.artifact, variant),
      None => self.artifact.clone(),
    }
  }
}

/// What the collector knows about one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
  /// Logical path, `/`-separated and relative to the source root.
  pub path: String,
  /// Where the compiler can read the content.
  pub location: PathBuf,
  /// SHA-256 of the content.
  pub hash: ContentHash,
  /// Digest of the type metadata the source carries, if any.
  pub type_hash: Option<String>,
  /// Logical paths of other sources this one references.
  pub references: Vec<String>,
}

/// Decides which sources belong to which artifact.
pub trait Collector {
  /// Inclusion rules for `platform`, in priority order.
  fn collect(&self, platform: &TargetPlatform) -> Result<Vec<InclusionRule>, CollectError>;

  /// Look up a source by logical path.
  fn source(&self, path: &str) -> Option<SourceInfo>;
}

impl<T: Collector + ?Sized> Collector for &T {
  fn collect(&self, platform: &TargetPlatform) -> Result<Vec<InclusionRule>, CollectError> {
    (**self).collect(platform)
  }

  fn source(&self, path: &str) -> Option<SourceInfo> {
    (**self).source(path)
  }
}
