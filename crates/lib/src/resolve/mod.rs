//! Artifact resolution.
//!
//! Turns the collector's inclusion rules into the list of artifacts to build,
//! each with its sources, content digests and direct dependencies. An artifact
//! depends on another when one of its sources references a source the other
//! artifact owns.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::collect::{Collector, InclusionRule, SourceInfo};
use crate::consts::{BUILD_REPORT_FILE, PATCH_MANIFEST_FILE};
use crate::manifest::Variant;
use crate::util::hash::{ContentHash, hash_parts};

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("rule for '{rule}' selects '{path}', which does not exist")]
  MissingSource { rule: String, path: String },

  #[error("source '{path}' is claimed by both '{first}' and '{second}'")]
  SourceConflict {
    path: String,
    first: String,
    second: String,
  },

  #[error("inclusion rule has an invalid artifact name '{0}'")]
  InvalidName(String),

  #[error("artifact name '{0}' is produced by both a plain rule and a variant rule")]
  AmbiguousName(String),
}

/// A source as it ended up in an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
  pub path: String,
  pub location: PathBuf,
  pub hash: ContentHash,
  pub type_hash: Option<String>,
  /// Pulled in through a reference rather than selected by a rule.
  pub implicit: bool,
}

impl ResolvedSource {
  fn new(info: SourceInfo, implicit: bool) -> Self {
    Self {
      path: info.path,
      location: info.location,
      hash: info.hash,
      type_hash: info.type_hash,
      implicit,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
  /// Variant-qualified name, unique within a build.
  pub name: String,
  pub variant: Option<String>,
  /// Selected sources in rule order, then implicit sources in discovery order.
  pub sources: Vec<ResolvedSource>,
  /// Digest over all sources, sorted by path.
  pub source_hash: ContentHash,
  /// Digest over the type metadata of the sources that carry any.
  pub type_hash: Option<ContentHash>,
  /// Direct dependencies, sorted and deduplicated.
  pub dependencies: Vec<String>,
}

/// The resolver's output, published for every later stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedArtifacts {
  /// Artifacts in first-appearance order of their rules.
  pub artifacts: Vec<ResolvedArtifact>,
  /// Sorted, deduplicated.
  pub variants: Vec<Variant>,
}

impl ResolvedArtifacts {
  pub fn get(&self, name: &str) -> Option<&ResolvedArtifact> {
    self.artifacts.iter().find(|artifact| artifact.name == name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.get(name).is_some()
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.artifacts.iter().map(|artifact| artifact.name.as_str())
  }

  pub fn len(&self) -> usize {
    self.artifacts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.artifacts.is_empty()
  }
}

struct Pending {
  name: String,
  variant: Option<String>,
  sources: Vec<SourceInfo>,
}

/// Resolve `rules` against the sources `collector` knows about.
pub fn resolve(rules: &[InclusionRule], collector: &dyn Collector) -> Result<ResolvedArtifacts, ResolveError> {
  let mut pending: Vec<Pending> = Vec::new();
  let mut index: HashMap<String, usize> = HashMap::new();
  let mut owners: HashMap<String, String> = HashMap::new();
  let mut variants = BTreeSet::new();

  for rule in rules {
    let name = rule.artifact_name();
    if rule.artifact.is_empty() || rule.variant.as_deref().is_some_and(str::is_empty) || !is_valid_name(&name) {
      return Err(ResolveError::InvalidName(name));
    }
    if let Some(&slot) = index.get(&name)
      && pending[slot].variant != rule.variant
    {
      return Err(ResolveError::AmbiguousName(name));
    }

    let slot = *index.entry(name.clone()).or_insert_with(|| {
      pending.push(Pending {
        name: name.clone(),
        variant: rule.variant.clone(),
        sources: Vec::new(),
      });
      pending.len() - 1
    });

    if let Some(tag) = &rule.variant {
      variants.insert(Variant::new(rule.artifact.clone(), tag.clone()));
    }

    for path in &rule.sources {
      let info = collector.source(path).ok_or_else(|| ResolveError::MissingSource {
        rule: name.clone(),
        path: path.clone(),
      })?;

      match owners.get(path) {
        Some(owner) if *owner != name => {
          return Err(ResolveError::SourceConflict {
            path: path.clone(),
            first: owner.clone(),
            second: name.clone(),
          });
        }
        Some(_) => continue,
        None => {
          owners.insert(path.clone(), name.clone());
          pending[slot].sources.push(info);
        }
      }
    }
  }

  let artifacts: Vec<ResolvedArtifact> = pending
    .into_iter()
    .map(|entry| link(entry, &owners, collector))
    .collect();

  info!(artifacts = artifacts.len(), variants = variants.len(), "resolved artifacts");

  Ok(ResolvedArtifacts {
    artifacts,
    variants: variants.into_iter().collect(),
  })
}

/// Artifact names become file names in the output and package directories,
/// so they must be a single plain path component that cannot shadow the files
/// a package directory already holds.
fn is_valid_name(name: &str) -> bool {
  if name.contains(['/', '\\']) || name == PATCH_MANIFEST_FILE || name == BUILD_REPORT_FILE {
    return false;
  }
  let mut components = Path::new(name).components();
  matches!(
    (components.next(), components.next()),
    (Some(Component::Normal(c)), None) if c == OsStr::new(name)
  )
}

/// Follow references of one artifact's sources to find its dependencies and
/// implicit sources.
fn link(entry: Pending, owners: &HashMap<String, String>, collector: &dyn Collector) -> ResolvedArtifact {
  let mut seen: HashSet<String> = entry.sources.iter().map(|s| s.path.clone()).collect();
  let mut queue: VecDeque<SourceInfo> = entry.sources.iter().cloned().collect();
  let mut sources: Vec<ResolvedSource> = entry.sources.into_iter().map(|info| ResolvedSource::new(info, false)).collect();
  let mut dependencies = BTreeSet::new();

  while let Some(source) = queue.pop_front() {
    for reference in &source.references {
      match owners.get(reference) {
        Some(owner) if *owner == entry.name => {}
        Some(owner) => {
          dependencies.insert(owner.clone());
        }
        None => {
          if seen.contains(reference) {
            continue;
          }
          match collector.source(reference) {
            Some(info) => {
              debug!(artifact = %entry.name, source = %reference, "adding implicit source");
              seen.insert(reference.clone());
              sources.push(ResolvedSource::new(info.clone(), true));
              queue.push_back(info);
            }
            None => {
              debug!(artifact = %entry.name, from = %source.path, reference = %reference, "ignoring unknown reference");
            }
          }
        }
      }
    }
  }

  let (source_hash, type_hash) = digest_sources(&sources);

  ResolvedArtifact {
    name: entry.name,
    variant: entry.variant,
    sources,
    source_hash,
    type_hash,
    dependencies: dependencies.into_iter().collect(),
  }
}

fn digest_sources(sources: &[ResolvedSource]) -> (ContentHash, Option<ContentHash>) {
  let mut sorted: Vec<&ResolvedSource> = sources.iter().collect();
  sorted.sort_by(|a, b| a.path.cmp(&b.path));

  let source_hash = hash_parts(sorted.iter().map(|s| format!("{}:{}", s.path, s.hash)));

  let typed: Vec<String> = sorted
    .iter()
    .filter_map(|s| s.type_hash.as_ref().map(|t| format!("{}:{}", s.path, t)))
    .collect();
  let type_hash = (!typed.is_empty()).then(|| hash_parts(typed));

  (source_hash, type_hash)
}
