use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::collect::CollectError;
use crate::compile::CompilerError;
use crate::context::ContextError;
use crate::diff::ChangeSet;
use crate::encrypt::EncryptError;
use crate::graph::GraphError;
use crate::manifest::{ManifestError, PatchManifest};
use crate::resolve::ResolveError;

use super::stage::Stage;

/// Any failure of a single stage.
#[derive(Debug, Error)]
pub enum BuildError {
  #[error(transparent)]
  Context(#[from] ContextError),

  #[error("collect failed: {0}")]
  Collect(#[from] CollectError),

  #[error("resolution failed: {0}")]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Graph(#[from] GraphError),

  #[error(transparent)]
  Compile(#[from] CompilerError),

  #[error(transparent)]
  Encrypt(#[from] EncryptError),

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("invalid build parameters: {0}")]
  InvalidParameters(String),

  #[error("io error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

impl BuildError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    BuildError::Io {
      path: path.into(),
      source,
    }
  }
}

/// Why a run stopped.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// The first stage failure of a run.
  #[error("stage {stage} failed: {source}")]
  Stage {
    stage: Stage,
    #[source]
    source: BuildError,
  },

  /// Every stage succeeded but one of them left out a result the summary needs.
  #[error("build finished with incomplete results: {0}")]
  Incomplete(#[source] ContextError),
}

impl PipelineError {
  /// The stage that failed, if a stage failed.
  pub fn stage(&self) -> Option<Stage> {
    match self {
      PipelineError::Stage { stage, .. } => Some(*stage),
      PipelineError::Incomplete(_) => None,
    }
  }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct BuildSummary {
  pub version: u32,
  pub package_dir: PathBuf,
  pub manifest_path: PathBuf,
  pub manifest: PatchManifest,
  /// Rebuilt artifacts, dependencies first.
  pub rebuilt: Vec<String>,
  pub reused: Vec<String>,
  pub changes: ChangeSet,
  pub elapsed: Duration,
}
