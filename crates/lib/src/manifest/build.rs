//! Assembly of the manifest for the current build version.

use tracing::debug;

use crate::compile::BuildOutput;
use crate::incremental::IncrementalPlan;
use crate::resolve::ResolvedArtifacts;
use crate::util::hash::HashAlgorithm;

use super::types::{ArtifactRecord, ManifestError, PatchManifest};

/// Inputs to [`build_manifest`].
pub struct ManifestInputs<'a> {
  pub version: u32,
  pub hash_algorithm: HashAlgorithm,
  pub append_hash: bool,
  pub resolved: &'a ResolvedArtifacts,
  pub plan: &'a IncrementalPlan,
  pub output: &'a BuildOutput,
  /// Manifest the incremental plan was computed against.
  pub prior: &'a PatchManifest,
}

/// Build the manifest for the current version.
///
/// Records follow resolution order. Rebuilt artifacts take hash and size from
/// the compile output, reused artifacts from the prior manifest. A record keeps
/// the prior record's `version` when its hash did not change.
pub fn build_manifest(inputs: ManifestInputs<'_>) -> Result<PatchManifest, ManifestError> {
  let mut manifest = PatchManifest::new(inputs.version, inputs.hash_algorithm);

  for artifact in &inputs.resolved.artifacts {
    let previous = inputs.prior.get(&artifact.name);

    let (hash, size) = if inputs.plan.is_rebuild(&artifact.name) {
      let digest = inputs
        .output
        .get(&artifact.name)
        .ok_or_else(|| ManifestError::MissingDigest(artifact.name.clone()))?;
      (digest.hash.clone(), digest.size)
    } else {
      let record = previous.ok_or_else(|| ManifestError::MissingDigest(artifact.name.clone()))?;
      (record.hash.clone(), record.size)
    };

    let fingerprint = inputs
      .plan
      .fingerprint(&artifact.name)
      .cloned()
      .ok_or_else(|| ManifestError::MissingDigest(artifact.name.clone()))?;

    let version = match previous {
      Some(record) if record.hash == hash && inputs.prior.hash_algorithm == inputs.hash_algorithm => record.version,
      _ => inputs.version,
    };

    debug!(artifact = %artifact.name, hash = %hash, version, "recording artifact");

    manifest.artifacts.push(ArtifactRecord {
      file_name: ArtifactRecord::distributed_name(&artifact.name, &hash, inputs.append_hash),
      name: artifact.name.clone(),
      hash,
      size,
      dependencies: artifact.dependencies.clone(),
      fingerprint,
      version,
    });
  }

  manifest.variants = inputs.resolved.variants.clone();
  manifest.validate()?;

  Ok(manifest)
}
