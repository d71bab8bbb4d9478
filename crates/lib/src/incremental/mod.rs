//! Incremental rebuild decisions.
//!
//! Each artifact gets a fingerprint over everything that shapes its bytes: its
//! sources, optionally its type metadata, the options that change the
//! compiler's output and the fingerprints of its dependencies. An artifact is
//! reused only when the most recent earlier manifest recorded the same
//! fingerprint and its output file still holds the bytes that manifest
//! describes.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::graph::{ArtifactGraph, GraphError};
use crate::manifest::{ArtifactRecord, PatchManifest};
use crate::params::BuildOptions;
use crate::resolve::{ResolvedArtifact, ResolvedArtifacts};
use crate::util::hash::{ContentHash, HashAlgorithm, hash_file, hash_parts};

const FINGERPRINT_SCHEMA: &str = "patchbuild-fingerprint-v1";

/// The manifest incremental decisions are made against: the highest version
/// below the current one, or the empty manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorManifest {
  pub manifest: PatchManifest,
}

impl PriorManifest {
  pub fn new(manifest: PatchManifest) -> Self {
    Self { manifest }
  }

  /// `None` when there was no earlier build.
  pub fn version(&self) -> Option<u32> {
    (self.manifest.version != 0).then_some(self.manifest.version)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebuildReason {
  Forced,
  NoPriorRecord,
  FingerprintChanged,
  MissingOutput,
  /// The output file no longer matches the prior record's size or hash.
  StaleOutput,
}

impl RebuildReason {
  pub fn as_str(self) -> &'static str {
    match self {
      RebuildReason::Forced => "forced",
      RebuildReason::NoPriorRecord => "no prior record",
      RebuildReason::FingerprintChanged => "fingerprint changed",
      RebuildReason::MissingOutput => "missing output",
      RebuildReason::StaleOutput => "stale output",
    }
  }
}

impl fmt::Display for RebuildReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
  Rebuild(RebuildReason),
  Reuse,
}

impl Decision {
  pub fn is_rebuild(self) -> bool {
    matches!(self, Decision::Rebuild(_))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDecision {
  pub name: String,
  pub fingerprint: ContentHash,
  pub decision: Decision,
}

/// Per-artifact decisions in dependency-first order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncrementalPlan {
  pub decisions: Vec<ArtifactDecision>,
}

impl IncrementalPlan {
  pub fn get(&self, name: &str) -> Option<&ArtifactDecision> {
    self.decisions.iter().find(|d| d.name == name)
  }

  pub fn is_rebuild(&self, name: &str) -> bool {
    self.get(name).is_some_and(|d| d.decision.is_rebuild())
  }

  pub fn fingerprint(&self, name: &str) -> Option<&ContentHash> {
    self.get(name).map(|d| &d.fingerprint)
  }

  /// Names that must be compiled.
  pub fn rebuild_set(&self) -> BTreeSet<String> {
    self
      .decisions
      .iter()
      .filter(|d| d.decision.is_rebuild())
      .map(|d| d.name.clone())
      .collect()
  }

  /// Rebuilt names in dependency-first order.
  pub fn rebuilt(&self) -> Vec<String> {
    self.names_where(|d| d.is_rebuild())
  }

  /// Reused names in dependency-first order.
  pub fn reused(&self) -> Vec<String> {
    self.names_where(|d| !d.is_rebuild())
  }

  /// Evaluation order.
  pub fn order(&self) -> impl Iterator<Item = &str> {
    self.decisions.iter().map(|d| d.name.as_str())
  }

  fn names_where(&self, keep: impl Fn(Decision) -> bool) -> Vec<String> {
    self
      .decisions
      .iter()
      .filter(|d| keep(d.decision))
      .map(|d| d.name.clone())
      .collect()
  }
}

/// Inputs to [`plan`].
pub struct PlanInputs<'a> {
  pub resolved: &'a ResolvedArtifacts,
  pub prior: &'a PatchManifest,
  pub options: BuildOptions,
  pub hash_algorithm: HashAlgorithm,
  /// Working output directory; artifact `n` lives at `<output_dir>/n`.
  pub output_dir: &'a Path,
}

/// Decide rebuild or reuse for every resolved artifact.
pub fn plan(inputs: PlanInputs<'_>) -> Result<IncrementalPlan, GraphError> {
  let order = ArtifactGraph::new(inputs.resolved)?.dependency_order()?;
  let mut fingerprints: HashMap<&str, ContentHash> = HashMap::with_capacity(order.len());
  let mut decisions = Vec::with_capacity(order.len());

  for name in &order {
    let Some(artifact) = inputs.resolved.get(name) else {
      continue;
    };

    let fingerprint = fingerprint(artifact, &fingerprints, &inputs)?;
    let decision = decide(artifact, &fingerprint, &inputs);

    debug!(artifact = %name, fingerprint = %fingerprint, decision = ?decision, "incremental decision");

    fingerprints.insert(artifact.name.as_str(), fingerprint.clone());
    decisions.push(ArtifactDecision {
      name: artifact.name.clone(),
      fingerprint,
      decision,
    });
  }

  let plan = IncrementalPlan { decisions };
  info!(
    rebuild = plan.rebuild_set().len(),
    reuse = plan.reused().len(),
    prior_version = inputs.prior.version,
    "planned incremental build"
  );
  Ok(plan)
}

fn fingerprint(
  artifact: &ResolvedArtifact,
  known: &HashMap<&str, ContentHash>,
  inputs: &PlanInputs<'_>,
) -> Result<ContentHash, GraphError> {
  let mut parts = vec![
    FINGERPRINT_SCHEMA.to_string(),
    format!("source:{}", artifact.source_hash),
  ];

  if inputs.options.tracks_type_metadata()
    && let Some(type_hash) = &artifact.type_hash
  {
    parts.push(format!("type:{}", type_hash));
  }

  parts.push(format!("compression:{}", inputs.options.compression));
  parts.push(format!("type-metadata:{}", !inputs.options.disable_type_metadata));
  parts.push(format!("hash:{}", inputs.hash_algorithm));

  for dependency in &artifact.dependencies {
    let dep_fingerprint = known
      .get(dependency.as_str())
      .ok_or_else(|| GraphError::UnknownDependency {
        artifact: artifact.name.clone(),
        dependency: dependency.clone(),
      })?;
    parts.push(format!("dep:{}:{}", dependency, dep_fingerprint));
  }

  Ok(hash_parts(parts))
}

fn decide(artifact: &ResolvedArtifact, fingerprint: &ContentHash, inputs: &PlanInputs<'_>) -> Decision {
  if inputs.options.force_rebuild {
    return Decision::Rebuild(RebuildReason::Forced);
  }

  let Some(record) = inputs.prior.get(&artifact.name) else {
    return Decision::Rebuild(RebuildReason::NoPriorRecord);
  };

  if record.fingerprint != *fingerprint {
    return Decision::Rebuild(RebuildReason::FingerprintChanged);
  }

  let output = inputs.output_dir.join(&artifact.name);
  if !output.is_file() {
    return Decision::Rebuild(RebuildReason::MissingOutput);
  }

  if !output_matches(&output, record, inputs.prior.hash_algorithm) {
    return Decision::Rebuild(RebuildReason::StaleOutput);
  }

  Decision::Reuse
}

/// Whether the file at `path` is the one `record` describes.
///
/// The working output is shared by every version, so a later build may have
/// replaced the file the prior record hashed.
fn output_matches(path: &Path, record: &ArtifactRecord, algorithm: HashAlgorithm) -> bool {
  let size = match path.metadata() {
    Ok(metadata) => metadata.len(),
    Err(e) => {
      warn!(artifact = %record.name, error = %e, "cannot stat output");
      return false;
    }
  };
  if size != record.size {
    debug!(artifact = %record.name, size, expected = record.size, "output size differs from prior record");
    return false;
  }

  match hash_file(path, algorithm) {
    Ok((hash, _)) if hash == record.hash => true,
    Ok((hash, _)) => {
      debug!(artifact = %record.name, hash = %hash, expected = %record.hash, "output hash differs from prior record");
      false
    }
    Err(e) => {
      warn!(artifact = %record.name, error = %e, "cannot hash output");
      false
    }
  }
}
