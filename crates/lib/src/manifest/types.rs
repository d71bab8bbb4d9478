//! Patch manifest types.
//!
//! The patch manifest is the record a build version leaves behind: every
//! artifact that makes up the package, its distributable hash and size, and
//! the artifacts it depends on. Clients diff manifests of consecutive versions
//! to decide which files to download.
//!
//! # Serialization
//!
//! Manifests are stored as pretty-printed JSON. Field order follows the struct
//! declarations and artifact order follows resolution order, so two builds of
//! unchanged content produce byte-identical files.
//!
//! ```json
//! {
//!   "format": 1,
//!   "version": 3,
//!   "hash_algorithm": "sha256",
//!   "artifacts": [
//!     {
//!       "name": "ui",
//!       "file_name": "ui",
//!       "hash": "a1b2...",
//!       "size": 1024,
//!       "dependencies": ["shared"],
//!       "fingerprint": "c3d4...",
//!       "version": 2
//!     }
//!   ],
//!   "variants": [{ "artifact": "ui", "tag": "en" }]
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MANIFEST_FORMAT;
use crate::util::hash::{ContentHash, HashAlgorithm};

/// Errors reading, writing or validating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read manifest {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to write manifest {}: {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse manifest: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize manifest: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported manifest format {found} (expected {expected})")]
  UnsupportedFormat { found: u32, expected: u32 },

  /// A manifest file exists but cannot be trusted.
  #[error("manifest {} is corrupt: {source}", path.display())]
  Corrupt {
    path: PathBuf,
    #[source]
    source: Box<ManifestError>,
  },

  #[error("manifest {} records version {found}, expected {expected}", path.display())]
  VersionMismatch { path: PathBuf, expected: u32, found: u32 },

  #[error("artifact '{artifact}' depends on '{dependency}', which is not in the manifest")]
  DanglingDependency { artifact: String, dependency: String },

  #[error("artifact '{0}' appears more than once")]
  DuplicateArtifact(String),

  #[error("no hash available for artifact '{0}'")]
  MissingDigest(String),
}

/// One built artifact as recorded in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
  /// Artifact name, unique within a manifest.
  pub name: String,
  /// Name of the distributed file (the name, optionally suffixed with the hash).
  pub file_name: String,
  /// Hash of the distributable (compressed, encrypted) bytes.
  pub hash: ContentHash,
  pub size: u64,
  /// Direct dependencies, by artifact name.
  #[serde(default)]
  pub dependencies: Vec<String>,
  /// Digest of the inputs this artifact was built from.
  pub fingerprint: ContentHash,
  /// Build version in which `hash` last changed.
  pub version: u32,
}

impl ArtifactRecord {
  /// File name the artifact is distributed under.
  pub fn distributed_name(name: &str, hash: &ContentHash, append_hash: bool) -> String {
    if append_hash {
      format!("{}_{}", name, hash.0)
    } else {
      name.to_string()
    }
  }
}

/// A named alternative form of an artifact (e.g. a locale).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variant {
  /// Base artifact name without the variant suffix.
  pub artifact: String,
  pub tag: String,
}

impl Variant {
  pub fn new(artifact: impl Into<String>, tag: impl Into<String>) -> Self {
    Self {
      artifact: artifact.into(),
      tag: tag.into(),
    }
  }

  /// Qualified identifier, `<artifact>.<tag>`.
  pub fn id(&self) -> String {
    format!("{}.{}", self.artifact, self.tag)
  }
}

impl fmt::Display for Variant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{}", self.artifact, self.tag)
  }
}

/// The versioned record of everything one build produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchManifest {
  /// Serialization format, see [`MANIFEST_FORMAT`].
  pub format: u32,
  /// Build version; 0 means "no build".
  pub version: u32,
  pub hash_algorithm: HashAlgorithm,
  /// Artifacts in resolution order.
  #[serde(default)]
  pub artifacts: Vec<ArtifactRecord>,
  #[serde(default)]
  pub variants: Vec<Variant>,
}

impl Default for PatchManifest {
  fn default() -> Self {
    Self::empty()
  }
}

impl PatchManifest {
  /// The manifest of "no previous build": version 0, no artifacts, no variants.
  pub fn empty() -> Self {
    Self {
      format: MANIFEST_FORMAT,
      version: 0,
      hash_algorithm: HashAlgorithm::default(),
      artifacts: Vec::new(),
      variants: Vec::new(),
    }
  }

  pub fn new(version: u32, hash_algorithm: HashAlgorithm) -> Self {
    Self {
      version,
      hash_algorithm,
      ..Self::empty()
    }
  }

  pub fn is_empty(&self) -> bool {
    self.artifacts.is_empty() && self.variants.is_empty()
  }

  pub fn get(&self, name: &str) -> Option<&ArtifactRecord> {
    self.artifacts.iter().find(|record| record.name == name)
  }

  /// Records whose content changed in `version`.
  pub fn changed_in(&self, version: u32) -> impl Iterator<Item = &ArtifactRecord> {
    self.artifacts.iter().filter(move |record| record.version == version)
  }

  pub fn total_size(&self) -> u64 {
    self.artifacts.iter().map(|record| record.size).sum()
  }

  /// Check that names are unique and every dependency names a record.
  pub fn validate(&self) -> Result<(), ManifestError> {
    let mut names = HashSet::with_capacity(self.artifacts.len());
    for record in &self.artifacts {
      if !names.insert(record.name.as_str()) {
        return Err(ManifestError::DuplicateArtifact(record.name.clone()));
      }
    }

    for record in &self.artifacts {
      if let Some(dependency) = record.dependencies.iter().find(|dep| !names.contains(dep.as_str())) {
        return Err(ManifestError::DanglingDependency {
          artifact: record.name.clone(),
          dependency: dependency.clone(),
        });
      }
    }

    Ok(())
  }

  pub fn to_json(&self) -> Result<String, ManifestError> {
    let mut json = serde_json::to_string_pretty(self).map_err(ManifestError::Serialize)?;
    json.push('\n');
    Ok(json)
  }

  pub fn from_json(content: &str) -> Result<Self, ManifestError> {
    let manifest: PatchManifest = serde_json::from_str(content).map_err(ManifestError::Parse)?;
    if manifest.format != MANIFEST_FORMAT {
      return Err(ManifestError::UnsupportedFormat {
        found: manifest.format,
        expected: MANIFEST_FORMAT,
      });
    }
    Ok(manifest)
  }
}
