use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::hash::HashAlgorithm;

/// Identifier of the platform artifacts are built for (e.g. `android`, `ios`).
///
/// Used verbatim as a directory name below the output root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetPlatform(pub String);

impl TargetPlatform {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TargetPlatform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Compression applied to artifact payloads by the compiler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressOption {
  #[default]
  Uncompressed,
  Gzip,
}

impl CompressOption {
  pub fn as_str(self) -> &'static str {
    match self {
      CompressOption::Uncompressed => "uncompressed",
      CompressOption::Gzip => "gzip",
    }
  }
}

impl fmt::Display for CompressOption {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for CompressOption {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "uncompressed" | "none" => Ok(CompressOption::Uncompressed),
      "gzip" => Ok(CompressOption::Gzip),
      other => Err(format!("unknown compression '{}' (expected uncompressed or gzip)", other)),
    }
  }
}

/// Input to a single build invocation. Immutable for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildParameters {
  /// Root directory all platform outputs are written below.
  pub output_root: PathBuf,
  pub platform: TargetPlatform,
  /// Caller-supplied build version. Not derived from disk state.
  pub version: u32,
  pub hash_algorithm: HashAlgorithm,
  pub compression: CompressOption,
  /// Rebuild every artifact regardless of fingerprints.
  pub force_rebuild: bool,
  /// Append the artifact hash to distributed file names.
  pub append_hash: bool,
  /// Do not embed type metadata in artifacts.
  pub disable_type_metadata: bool,
  /// Do not let type metadata changes trigger rebuilds.
  pub ignore_type_metadata_changes: bool,
}

impl BuildParameters {
  pub fn new(output_root: impl Into<PathBuf>, platform: impl Into<String>, version: u32) -> Self {
    Self {
      output_root: output_root.into(),
      platform: TargetPlatform::new(platform),
      version,
      hash_algorithm: HashAlgorithm::default(),
      compression: CompressOption::default(),
      force_rebuild: false,
      append_hash: false,
      disable_type_metadata: false,
      ignore_type_metadata_changes: true,
    }
  }

  pub fn with_force_rebuild(mut self, force: bool) -> Self {
    self.force_rebuild = force;
    self
  }

  pub fn with_compression(mut self, compression: CompressOption) -> Self {
    self.compression = compression;
    self
  }

  pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
    self.hash_algorithm = algorithm;
    self
  }

  pub fn with_append_hash(mut self, append: bool) -> Self {
    self.append_hash = append;
    self
  }

  pub fn with_type_metadata(mut self, disable: bool, ignore_changes: bool) -> Self {
    self.disable_type_metadata = disable;
    self.ignore_type_metadata_changes = ignore_changes;
    self
  }

  /// Options handed to the compiler and the incremental engine.
  pub fn options(&self) -> BuildOptions {
    BuildOptions {
      compression: self.compression,
      force_rebuild: self.force_rebuild,
      append_hash: self.append_hash,
      disable_type_metadata: self.disable_type_metadata,
      ignore_type_metadata_changes: self.ignore_type_metadata_changes,
    }
  }
}

/// The option subset of [`BuildParameters`] that shapes artifact bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
  pub compression: CompressOption,
  pub force_rebuild: bool,
  pub append_hash: bool,
  pub disable_type_metadata: bool,
  pub ignore_type_metadata_changes: bool,
}

impl BuildOptions {
  /// Whether type metadata hashes participate in fingerprints.
  pub fn tracks_type_metadata(&self) -> bool {
    !self.disable_type_metadata && !self.ignore_type_metadata_changes
  }
}
