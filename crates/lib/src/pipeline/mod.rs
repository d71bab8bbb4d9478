//! Build pipeline runner.
//!
//! A run executes every [`Stage`] in order against a fresh [`BuildContext`]
//! and stops at the first failure. Nothing is rolled back: a failed run may
//! leave compiled files in the output directory, but it never writes a
//! manifest unless compile and encryption succeeded.

mod stage;
mod types;

use std::time::Instant;

use tracing::{debug, error, info};

use crate::collect::Collector;
use crate::compile::ArtifactCompiler;
use crate::context::{BuildContext, ContextError};
use crate::diff::ChangeSet;
use crate::encrypt::{Encryptor, NoEncryption};
use crate::incremental::IncrementalPlan;
use crate::manifest::ManifestContext;
use crate::params::{BuildParameters, BuildParametersContext};

pub use stage::Stage;
pub use types::*;

use stage::Tools;

/// Entry point for running builds.
///
/// ```no_run
/// use patchbuild_lib::collect::ProjectCollector;
/// use patchbuild_lib::compile::ArchiveCompiler;
/// use patchbuild_lib::params::BuildParameters;
/// use patchbuild_lib::pipeline::PatchBuilder;
///
/// let collector = ProjectCollector::load("patchbuild.json".as_ref())?;
/// let summary = PatchBuilder::new(collector, ArchiveCompiler::new())
///   .run(BuildParameters::new("dist", "android", 1))?;
/// println!("{} artifacts changed", summary.changes.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PatchBuilder<'a> {
  collector: Box<dyn Collector + 'a>,
  compiler: Box<dyn ArtifactCompiler + 'a>,
  encryptor: Box<dyn Encryptor + 'a>,
}

impl<'a> PatchBuilder<'a> {
  pub fn new(collector: impl Collector + 'a, compiler: impl ArtifactCompiler + 'a) -> Self {
    Self {
      collector: Box::new(collector),
      compiler: Box::new(compiler),
      encryptor: Box::new(NoEncryption),
    }
  }

  pub fn with_encryptor(mut self, encryptor: impl Encryptor + 'a) -> Self {
    self.encryptor = Box::new(encryptor);
    self
  }

  /// Run every stage for `parameters` in a fresh context.
  pub fn run(&self, parameters: BuildParameters) -> Result<BuildSummary, PipelineError> {
    let mut ctx = BuildContext::new();
    self.run_in(&mut ctx, parameters)
  }

  /// Run every stage in `ctx`, which is cleared first.
  ///
  /// On success the context still holds everything the stages published.
  pub fn run_in(&self, ctx: &mut BuildContext, parameters: BuildParameters) -> Result<BuildSummary, PipelineError> {
    let started = Instant::now();
    ctx.clear();

    info!(
      platform = %parameters.platform,
      version = parameters.version,
      force = parameters.force_rebuild,
      "starting build"
    );

    let tools = Tools {
      parameters: &parameters,
      collector: self.collector.as_ref(),
      compiler: self.compiler.as_ref(),
      encryptor: self.encryptor.as_ref(),
    };

    for stage in Stage::ALL {
      let stage_started = Instant::now();
      debug!(stage = %stage, "running stage");

      if let Err(source) = stage.run(ctx, &tools) {
        error!(stage = %stage, error = %source, "stage failed");
        return Err(PipelineError::Stage { stage, source });
      }

      debug!(stage = %stage, elapsed = ?stage_started.elapsed(), "stage finished");
    }

    let summary = summarize(ctx, started).map_err(PipelineError::Incomplete)?;

    info!(
      version = summary.version,
      rebuilt = summary.rebuilt.len(),
      reused = summary.reused.len(),
      changed = summary.changes.len(),
      elapsed = ?summary.elapsed,
      "build complete"
    );
    Ok(summary)
  }
}

fn summarize(ctx: &BuildContext, started: Instant) -> Result<BuildSummary, ContextError> {
  let params = ctx.get::<BuildParametersContext>()?;
  let plan = ctx.get::<IncrementalPlan>()?;
  let manifest = ctx.get::<ManifestContext>()?;

  Ok(BuildSummary {
    version: params.version(),
    package_dir: params.package_dir.clone(),
    manifest_path: manifest.path.clone(),
    manifest: manifest.manifest.clone(),
    rebuilt: plan.rebuilt(),
    reused: plan.reused(),
    changes: ctx.get::<ChangeSet>()?.clone(),
    elapsed: started.elapsed(),
  })
}
