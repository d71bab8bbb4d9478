//! The fixed build stages.
//!
//! Stages communicate only through the [`BuildContext`]: each one reads what
//! earlier stages published and publishes its own result.

use std::fmt;
use std::fs;

use chrono::Local;
use tracing::{info, warn};

use crate::collect::Collector;
use crate::compile::{ArtifactCompiler, BuildOutput, CompileRequest, compile_artifacts, prune_stale_outputs};
use crate::context::BuildContext;
use crate::diff::{ChangeSet, compute_changes, load_predecessor};
use crate::encrypt::{Encryptor, encrypt_outputs};
use crate::graph::ArtifactGraph;
use crate::incremental::{IncrementalPlan, PlanInputs, PriorManifest, plan};
use crate::layout;
use crate::manifest::{ManifestContext, ManifestInputs, ManifestStore, build_manifest};
use crate::params::{self, BuildOptionsContext, BuildParameters, BuildParametersContext};
use crate::report::{render_report, write_report};
use crate::resolve::{ResolvedArtifacts, resolve};
use crate::util::fs::remove_dir_if_exists;

use super::types::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
  Prepare,
  Resolve,
  CheckCycle,
  PlanIncremental,
  Build,
  Encrypt,
  CreateManifest,
  DiffManifest,
  CreateReport,
  CopyUpdates,
}

impl Stage {
  /// Every stage, in execution order.
  pub const ALL: [Stage; 10] = [
    Stage::Prepare,
    Stage::Resolve,
    Stage::CheckCycle,
    Stage::PlanIncremental,
    Stage::Build,
    Stage::Encrypt,
    Stage::CreateManifest,
    Stage::DiffManifest,
    Stage::CreateReport,
    Stage::CopyUpdates,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Stage::Prepare => "prepare",
      Stage::Resolve => "resolve",
      Stage::CheckCycle => "check-cycle",
      Stage::PlanIncremental => "plan-incremental",
      Stage::Build => "build",
      Stage::Encrypt => "encrypt",
      Stage::CreateManifest => "create-manifest",
      Stage::DiffManifest => "diff-manifest",
      Stage::CreateReport => "create-report",
      Stage::CopyUpdates => "copy-updates",
    }
  }

  pub(crate) fn run(self, ctx: &mut BuildContext, tools: &Tools<'_>) -> Result<(), BuildError> {
    match self {
      Stage::Prepare => prepare(ctx, tools.parameters),
      Stage::Resolve => resolve_artifacts(ctx, tools.collector),
      Stage::CheckCycle => check_cycle(ctx),
      Stage::PlanIncremental => plan_incremental(ctx),
      Stage::Build => build(ctx, tools.compiler),
      Stage::Encrypt => encrypt(ctx, tools.encryptor),
      Stage::CreateManifest => create_manifest(ctx),
      Stage::DiffManifest => diff_manifest(ctx),
      Stage::CreateReport => create_report(ctx),
      Stage::CopyUpdates => copy_updates(ctx),
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Collaborators the stages call out to.
pub(crate) struct Tools<'a> {
  pub parameters: &'a BuildParameters,
  pub collector: &'a dyn Collector,
  pub compiler: &'a dyn ArtifactCompiler,
  pub encryptor: &'a dyn Encryptor,
}

fn store(params: &BuildParametersContext) -> ManifestStore {
  ManifestStore::new(params.platform_dir())
}

fn prepare(ctx: &mut BuildContext, parameters: &BuildParameters) -> Result<(), BuildError> {
  params::validate(parameters)?;
  let params = BuildParametersContext::new(parameters.clone());

  if parameters.force_rebuild {
    info!(dir = ?params.output_dir, "force rebuild, clearing output directory");
    remove_dir_if_exists(&params.output_dir).map_err(|e| BuildError::io(&params.output_dir, e))?;
  }

  for dir in [&params.output_dir, &params.package_dir] {
    fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
  }

  let store = store(&params);
  let version = params.version();
  if store.exists(version) {
    warn!(version, path = ?store.path(version), "manifest for this version exists and will be overwritten");
  }
  if let Some(latest) = store.versions()?.into_iter().max()
    && latest > version
  {
    warn!(version, latest, "building a version below the latest existing one");
  }

  ctx.set(BuildOptionsContext(parameters.options()));
  ctx.set(params);
  Ok(())
}

fn resolve_artifacts(ctx: &mut BuildContext, collector: &dyn Collector) -> Result<(), BuildError> {
  let params = ctx.get::<BuildParametersContext>()?;
  let rules = collector.collect(&params.parameters.platform)?;
  let resolved = resolve(&rules, collector)?;
  ctx.set(resolved);
  Ok(())
}

fn check_cycle(ctx: &mut BuildContext) -> Result<(), BuildError> {
  let resolved = ctx.get::<ResolvedArtifacts>()?;
  ArtifactGraph::new(resolved)?.check_acyclic()?;
  Ok(())
}

fn plan_incremental(ctx: &mut BuildContext) -> Result<(), BuildError> {
  let params = ctx.get::<BuildParametersContext>()?;
  let options = ctx.get::<BuildOptionsContext>()?.0;
  let resolved = ctx.get::<ResolvedArtifacts>()?;

  let prior = store(params).latest_before(params.version())?;
  let plan = plan(PlanInputs {
    resolved,
    prior: &prior,
    options,
    hash_algorithm: params.parameters.hash_algorithm,
    output_dir: &params.output_dir,
  })?;

  ctx.set(PriorManifest::new(prior));
  ctx.set(plan);
  Ok(())
}

fn build(ctx: &mut BuildContext, compiler: &dyn ArtifactCompiler) -> Result<(), BuildError> {
  let params = ctx.get::<BuildParametersContext>()?;
  let options = ctx.get::<BuildOptionsContext>()?.0;
  let resolved = ctx.get::<ResolvedArtifacts>()?;
  let rebuild = ctx.get::<IncrementalPlan>()?.rebuild_set();

  let request = CompileRequest {
    output_dir: &params.output_dir,
    platform: &params.parameters.platform,
    artifacts: resolved,
    rebuild: &rebuild,
    options,
  };
  let output = compile_artifacts(compiler, &request, params.parameters.hash_algorithm)?;
  prune_stale_outputs(&params.output_dir, resolved)?;

  ctx.set(output);
  Ok(())
}

fn encrypt(ctx: &mut BuildContext, encryptor: &dyn Encryptor) -> Result<(), BuildError> {
  let algorithm = ctx.get::<BuildParametersContext>()?.parameters.hash_algorithm;
  let output = ctx.get_mut::<BuildOutput>()?;
  encrypt_outputs(encryptor, output, algorithm)?;
  Ok(())
}

fn create_manifest(ctx: &mut BuildContext) -> Result<(), BuildError> {
  let params = ctx.get::<BuildParametersContext>()?;
  let manifest = build_manifest(ManifestInputs {
    version: params.version(),
    hash_algorithm: params.parameters.hash_algorithm,
    append_hash: params.parameters.append_hash,
    resolved: ctx.get::<ResolvedArtifacts>()?,
    plan: ctx.get::<IncrementalPlan>()?,
    output: ctx.get::<BuildOutput>()?,
    prior: &ctx.get::<PriorManifest>()?.manifest,
  })?;

  let path = store(params).save(&manifest)?;
  info!(version = manifest.version, artifacts = manifest.artifacts.len(), path = ?path, "wrote manifest");

  ctx.set(ManifestContext { manifest, path });
  Ok(())
}

fn diff_manifest(ctx: &mut BuildContext) -> Result<(), BuildError> {
  let params = ctx.get::<BuildParametersContext>()?;
  let current = &ctx.get::<ManifestContext>()?.manifest;

  let prior = load_predecessor(&store(params), params.version())?;
  let changes = compute_changes(current, &prior);
  info!(
    added = changes.added.len(),
    modified = changes.modified.len(),
    removed = changes.removed.len(),
    "computed change set"
  );

  ctx.set(changes);
  Ok(())
}

fn create_report(ctx: &mut BuildContext) -> Result<(), BuildError> {
  let params = ctx.get::<BuildParametersContext>()?;
  let manifest = &ctx.get::<ManifestContext>()?.manifest;

  let path = layout::report_path(&params.package_dir);
  let report = render_report(&params.parameters, manifest, Local::now());
  write_report(&path, &report).map_err(|e| BuildError::io(&path, e))?;
  Ok(())
}

fn copy_updates(ctx: &mut BuildContext) -> Result<(), BuildError> {
  let params = ctx.get::<BuildParametersContext>()?;
  let manifest = &ctx.get::<ManifestContext>()?.manifest;
  let changes = ctx.get::<ChangeSet>()?;

  let copied = crate::deploy::copy_updates(changes, manifest, &params.output_dir, &params.package_dir)
    .map_err(|e| BuildError::io(e.to, e.source))?;
  info!(files = copied.len(), dir = ?params.package_dir, "staged updates");
  Ok(())
}
