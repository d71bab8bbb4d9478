//! Artifact compiler seam.
//!
//! The compiler turns an artifact's sources into one distributable file in the
//! working output directory. This module calls it for the rebuild set, checks
//! that it produced exactly what was asked for, and hashes the results.

mod archive;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::params::{BuildOptions, TargetPlatform};
use crate::resolve::ResolvedArtifacts;
use crate::util::hash::{ContentHash, HashAlgorithm, HashError, hash_file};

pub use archive::{ArchiveCompiler, LINKS_ENTRY, TYPE_METADATA_ENTRY};

#[derive(Debug, Error)]
pub enum CompilerError {
  /// The compiler itself reported a failure.
  #[error("compiler failed: {message}")]
  Failed { message: String },

  #[error("compiler produced no output for '{artifact}'")]
  MissingOutput { artifact: String },

  #[error("compiler produced output for '{artifact}', which was not requested")]
  Unexpected { artifact: String },

  #[error("compiler wrote '{artifact}' to {}, expected {}", path.display(), expected.display())]
  Misplaced {
    artifact: String,
    path: PathBuf,
    expected: PathBuf,
  },

  #[error("io error at {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error(transparent)]
  Hash(#[from] HashError),
}

/// What the compiler is asked to build.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
  pub output_dir: &'a Path,
  pub platform: &'a TargetPlatform,
  /// Every resolved artifact, so dependencies can be consulted.
  pub artifacts: &'a ResolvedArtifacts,
  /// Names to build.
  pub rebuild: &'a BTreeSet<String>,
  pub options: BuildOptions,
}

impl CompileRequest<'_> {
  /// Where the output for artifact `name` is expected.
  pub fn output_path(&self, name: &str) -> PathBuf {
    self.output_dir.join(name)
  }
}

/// One file the compiler produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
  pub name: String,
  pub path: PathBuf,
}

/// External tool that packages sources into artifacts.
pub trait ArtifactCompiler {
  fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<CompiledArtifact>, CompilerError>;
}

impl<T: ArtifactCompiler + ?Sized> ArtifactCompiler for &T {
  fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<CompiledArtifact>, CompilerError> {
    (**self).compile(request)
  }
}

/// Hash and size of one produced file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDigest {
  pub path: PathBuf,
  pub hash: ContentHash,
  pub size: u64,
}

/// Digests of everything rebuilt in this run, keyed by artifact name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
  pub artifacts: BTreeMap<String, ArtifactDigest>,
}

impl BuildOutput {
  pub fn get(&self, name: &str) -> Option<&ArtifactDigest> {
    self.artifacts.get(name)
  }

  pub fn len(&self) -> usize {
    self.artifacts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.artifacts.is_empty()
  }
}

/// Run `compiler` for the request's rebuild set and hash what it produced.
///
/// Does not call the compiler when nothing needs rebuilding.
pub fn compile_artifacts(
  compiler: &dyn ArtifactCompiler,
  request: &CompileRequest<'_>,
  algorithm: HashAlgorithm,
) -> Result<BuildOutput, CompilerError> {
  if request.rebuild.is_empty() {
    info!("nothing to rebuild, skipping compiler");
    return Ok(BuildOutput::default());
  }

  info!(artifacts = request.rebuild.len(), platform = %request.platform, "compiling artifacts");
  let produced = compiler.compile(request)?;

  let mut by_name: BTreeMap<String, PathBuf> = BTreeMap::new();
  for artifact in produced {
    if !request.rebuild.contains(&artifact.name) {
      return Err(CompilerError::Unexpected { artifact: artifact.name });
    }
    let expected = request.output_path(&artifact.name);
    if artifact.path != expected {
      return Err(CompilerError::Misplaced {
        artifact: artifact.name,
        path: artifact.path,
        expected,
      });
    }
    by_name.insert(artifact.name, artifact.path);
  }

  if let Some(missing) = request.rebuild.iter().find(|name| !by_name.contains_key(*name)) {
    return Err(CompilerError::MissingOutput {
      artifact: missing.clone(),
    });
  }

  let digests = by_name
    .into_par_iter()
    .map(|(name, path)| -> Result<_, CompilerError> {
      if !path.is_file() {
        return Err(CompilerError::MissingOutput { artifact: name });
      }
      let (hash, size) = hash_file(&path, algorithm)?;
      Ok((name, ArtifactDigest { path, hash, size }))
    })
    .collect::<Result<Vec<_>, _>>()?;

  for (name, digest) in &digests {
    debug!(artifact = %name, hash = %digest.hash, size = digest.size, "hashed artifact");
  }

  Ok(BuildOutput {
    artifacts: digests.into_iter().collect(),
  })
}

/// Remove files from `output_dir` that belong to no resolved artifact.
///
/// Returns the removed file names, sorted.
pub fn prune_stale_outputs(output_dir: &Path, resolved: &ResolvedArtifacts) -> Result<Vec<String>, CompilerError> {
  let io_err = |source| CompilerError::Io {
    path: output_dir.to_path_buf(),
    source,
  };

  let entries = match fs::read_dir(output_dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(io_err(e)),
  };

  let mut removed = Vec::new();
  for entry in entries {
    let entry = entry.map_err(io_err)?;
    if !entry.file_type().map_err(io_err)?.is_file() {
      continue;
    }
    let name = entry.file_name().to_string_lossy().into_owned();
    if resolved.contains(&name) {
      continue;
    }
    fs::remove_file(entry.path()).map_err(|e| CompilerError::Io {
      path: entry.path(),
      source: e,
    })?;
    info!(file = %name, "pruned stale output");
    removed.push(name);
  }

  removed.sort();
  Ok(removed)
}
