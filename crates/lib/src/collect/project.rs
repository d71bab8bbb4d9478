//! JSON project file collector.
//!
//! A project file names a source root and the rules that group its files into
//! artifacts:
//!
//! ```json
//! {
//!   "source_root": "assets",
//!   "rules": [
//!     { "artifact": "shared", "sources": ["shared/"] },
//!     { "artifact": "ui", "sources": ["ui/"], "variant": "en", "platforms": ["ios"] }
//!   ],
//!   "references": { "ui/button.txt": ["shared/atlas.txt"] },
//!   "type_metadata": { "ui/button.txt": "ButtonV2" },
//!   "settings": { "compression": "gzip" }
//! }
//! ```
//!
//! Selectors ending in `/` (or naming a directory) select every file below it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::params::{BuildParameters, CompressOption, TargetPlatform};
use crate::util::hash::{HashAlgorithm, hash_file};

use super::types::{CollectError, Collector, InclusionRule, SourceInfo};

/// One rule as written in the project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
  pub artifact: String,
  pub sources: Vec<String>,
  #[serde(default)]
  pub variant: Option<String>,
  /// Platforms the rule applies to; empty means all.
  #[serde(default)]
  pub platforms: Vec<String>,
}

impl RuleConfig {
  fn applies_to(&self, platform: &TargetPlatform) -> bool {
    self.platforms.is_empty() || self.platforms.iter().any(|p| p == platform.as_str())
  }
}

/// Build defaults stored in the project file. Command line flags win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
  pub hash_algorithm: Option<HashAlgorithm>,
  pub compression: Option<CompressOption>,
  pub append_hash: Option<bool>,
  pub disable_type_metadata: Option<bool>,
  pub ignore_type_metadata_changes: Option<bool>,
}

impl ProjectSettings {
  /// Apply the settings that are present on top of `params`.
  pub fn apply(&self, mut params: BuildParameters) -> BuildParameters {
    if let Some(algorithm) = self.hash_algorithm {
      params.hash_algorithm = algorithm;
    }
    if let Some(compression) = self.compression {
      params.compression = compression;
    }
    if let Some(append) = self.append_hash {
      params.append_hash = append;
    }
    if let Some(disable) = self.disable_type_metadata {
      params.disable_type_metadata = disable;
    }
    if let Some(ignore) = self.ignore_type_metadata_changes {
      params.ignore_type_metadata_changes = ignore;
    }
    params
  }
}

/// Deserialized project file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
  #[serde(default = "default_source_root")]
  pub source_root: PathBuf,
  #[serde(default)]
  pub rules: Vec<RuleConfig>,
  #[serde(default)]
  pub references: BTreeMap<String, Vec<String>>,
  #[serde(default)]
  pub type_metadata: BTreeMap<String, String>,
  #[serde(default)]
  pub settings: ProjectSettings,
}

fn default_source_root() -> PathBuf {
  PathBuf::from(".")
}

impl ProjectConfig {
  pub fn from_file(path: &Path) -> Result<Self, CollectError> {
    let content = fs::read_to_string(path).map_err(|e| CollectError::Read {
      path: path.to_path_buf(),
      source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| CollectError::Parse {
      path: path.to_path_buf(),
      source: e,
    })
  }
}

/// Collector backed by a project file and the files below its source root.
#[derive(Debug, Clone)]
pub struct ProjectCollector {
  config: ProjectConfig,
  sources: BTreeMap<String, SourceInfo>,
}

impl ProjectCollector {
  /// Load the project file at `path` and hash every file below its source root.
  pub fn load(path: &Path) -> Result<Self, CollectError> {
    let config = ProjectConfig::from_file(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let source_root = base.join(&config.source_root);
    Self::from_config(config, &source_root)
  }

  /// Build a collector from an already parsed config and an absolute source root.
  pub fn from_config(config: ProjectConfig, source_root: &Path) -> Result<Self, CollectError> {
    let files = scan_source_root(source_root)?;
    info!(root = ?source_root, files = files.len(), "hashing project sources");

    let hashed = files
      .into_par_iter()
      .map(|(logical, location)| -> Result<_, CollectError> {
        let (hash, _) = hash_file(&location, HashAlgorithm::Sha256)?;
        Ok((logical, location, hash))
      })
      .collect::<Result<Vec<_>, _>>()?;

    let sources = hashed
      .into_iter()
      .map(|(logical, location, hash)| {
        let info = SourceInfo {
          references: config.references.get(&logical).cloned().unwrap_or_default(),
          type_hash: config.type_metadata.get(&logical).cloned(),
          path: logical.clone(),
          location,
          hash,
        };
        (logical, info)
      })
      .collect();

    Ok(Self { config, sources })
  }

  pub fn config(&self) -> &ProjectConfig {
    &self.config
  }

  pub fn settings(&self) -> &ProjectSettings {
    &self.config.settings
  }

  pub fn source_count(&self) -> usize {
    self.sources.len()
  }

  /// Expand a selector into logical source paths.
  ///
  /// A selector that matches nothing is returned unchanged so the resolver can
  /// report it as missing.
  fn expand(&self, selector: &str) -> Vec<String> {
    if self.sources.contains_key(selector) {
      return vec![selector.to_string()];
    }

    let prefix = format!("{}/", selector.trim_end_matches('/'));
    let matched: Vec<String> = self
      .sources
      .range(prefix.clone()..)
      .take_while(|(path, _)| path.starts_with(&prefix))
      .map(|(path, _)| path.clone())
      .collect();

    if matched.is_empty() {
      debug!(selector, "selector matched no sources");
      vec![selector.to_string()]
    } else {
      matched
    }
  }
}

impl Collector for ProjectCollector {
  fn collect(&self, platform: &TargetPlatform) -> Result<Vec<InclusionRule>, CollectError> {
    Ok(
      self
        .config
        .rules
        .iter()
        .filter(|rule| rule.applies_to(platform))
        .map(|rule| InclusionRule {
          artifact: rule.artifact.clone(),
          sources: rule.sources.iter().flat_map(|selector| self.expand(selector)).collect(),
          variant: rule.variant.clone(),
        })
        .collect(),
    )
  }

  fn source(&self, path: &str) -> Option<SourceInfo> {
    self.sources.get(path).cloned()
  }
}

/// All regular files below `root` as (logical path, location), sorted by path.
fn scan_source_root(root: &Path) -> Result<Vec<(String, PathBuf)>, CollectError> {
  let mut files = Vec::new();

  for entry in WalkDir::new(root).sort_by_file_name() {
    let entry = entry.map_err(|e| CollectError::Walk { message: e.to_string() })?;
    if !entry.file_type().is_file() {
      continue;
    }

    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let logical = relative
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/");

    files.push((logical, entry.path().to_path_buf()));
  }

  files.sort_by(|a, b| a.0.cmp(&b.0));
  Ok(files)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  fn project(json: &str) -> (TempDir, ProjectCollector) {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "assets/ui/button.txt", "button");
    write(temp.path(), "assets/ui/panel.txt", "panel");
    write(temp.path(), "assets/shared/atlas.txt", "atlas");
    write(temp.path(), "patchbuild.json", json);
    let collector = ProjectCollector::load(&temp.path().join("patchbuild.json")).unwrap();
    (temp, collector)
  }

  #[test]
  fn directory_selectors_expand_sorted() {
    let (_temp, collector) = project(
      r#"{ "source_root": "assets", "rules": [{ "artifact": "ui", "sources": ["ui/"] }] }"#,
    );
    let rules = collector.collect(&TargetPlatform::new("ios")).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].sources, vec!["ui/button.txt", "ui/panel.txt"]);
    assert_eq!(collector.source_count(), 3);
  }

  #[test]
  fn unmatched_selector_is_kept_for_the_resolver() {
    let (_temp, collector) = project(
      r#"{ "source_root": "assets", "rules": [{ "artifact": "ui", "sources": ["missing/thing.txt"] }] }"#,
    );
    let rules = collector.collect(&TargetPlatform::new("ios")).unwrap();
    assert_eq!(rules[0].sources, vec!["missing/thing.txt"]);
  }

  #[test]
  fn platform_filter_and_metadata() {
    let (_temp, collector) = project(
      r#"{
        "source_root": "assets",
        "rules": [
          { "artifact": "shared", "sources": ["shared"] },
          { "artifact": "ui", "sources": ["ui/button.txt"], "platforms": ["android"] }
        ],
        "references": { "ui/button.txt": ["shared/atlas.txt"] },
        "type_metadata": { "ui/button.txt": "v2" }
      }"#,
    );

    assert_eq!(collector.collect(&TargetPlatform::new("ios")).unwrap().len(), 1);
    assert_eq!(collector.collect(&TargetPlatform::new("android")).unwrap().len(), 2);

    let button = collector.source("ui/button.txt").unwrap();
    assert_eq!(button.references, vec!["shared/atlas.txt"]);
    assert_eq!(button.type_hash.as_deref(), Some("v2"));
    assert_eq!(button.hash.0.len(), 64);
  }

  #[test]
  fn settings_override_defaults() {
    let settings = ProjectSettings {
      compression: Some(CompressOption::Gzip),
      append_hash: Some(true),
      ..Default::default()
    };
    let params = settings.apply(BuildParameters::new("/out", "ios", 1));
    assert_eq!(params.compression, CompressOption::Gzip);
    assert!(params.append_hash);
    assert_eq!(params.hash_algorithm, HashAlgorithm::Sha256);
  }

  #[test]
  fn bad_project_file_is_parse_error() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "patchbuild.json", "{ rules: ");
    let err = ProjectCollector::load(&temp.path().join("patchbuild.json")).unwrap_err();
    assert!(matches!(err, CollectError::Parse { .. }));
  }
}
