//! Deterministic tar archive compiler.
//!
//! Each artifact becomes one tar stream of its sources, sorted by logical
//! path, with fixed mode, owner and mtime so that identical inputs always
//! produce identical bytes. Gzip compression is applied on request.
//!
//! An artifact with dependencies also records a link digest per dependency,
//! covering the dependency's sources and, recursively, its own dependencies.
//! Changing an upstream artifact therefore changes the bytes of everything
//! that links against it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{Builder, Header, HeaderMode};
use tracing::debug;

use crate::params::CompressOption;
use crate::resolve::{ResolvedArtifact, ResolvedArtifacts};
use crate::util::fs::write_atomic;
use crate::util::hash::{ContentHash, hash_parts};

use super::{ArtifactCompiler, CompileRequest, CompiledArtifact, CompilerError};

/// Archive entry listing the type metadata of the packed sources.
pub const TYPE_METADATA_ENTRY: &str = ".typemeta";

/// Archive entry listing the link digest of each dependency.
pub const LINKS_ENTRY: &str = ".links";

/// Packs artifact sources into tar archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveCompiler;

impl ArchiveCompiler {
  pub fn new() -> Self {
    Self
  }

  fn archive(
    &self,
    artifact: &ResolvedArtifact,
    request: &CompileRequest<'_>,
    links: &mut LinkDigests<'_>,
  ) -> Result<Vec<u8>, CompilerError> {
    let mut builder = Builder::new(Vec::new());
    builder.mode(HeaderMode::Deterministic);

    let mut sources: Vec<_> = artifact.sources.iter().collect();
    sources.sort_by(|a, b| a.path.cmp(&b.path));

    for source in &sources {
      let data = fs::read(&source.location).map_err(|e| CompilerError::Io {
        path: source.location.clone(),
        source: e,
      })?;
      append(&mut builder, &source.path, &data)?;
    }

    if !request.options.disable_type_metadata {
      let metadata: String = sources
        .iter()
        .filter_map(|s| s.type_hash.as_ref().map(|t| format!("{}:{}\n", s.path, t)))
        .collect();
      if !metadata.is_empty() {
        append(&mut builder, TYPE_METADATA_ENTRY, metadata.as_bytes())?;
      }
    }

    if !artifact.dependencies.is_empty() {
      let mut entry = String::new();
      for dependency in &artifact.dependencies {
        entry.push_str(&format!("{}:{}\n", dependency, links.digest(dependency)?));
      }
      append(&mut builder, LINKS_ENTRY, entry.as_bytes())?;
    }

    let tar = builder.into_inner().map_err(|e| failed(&artifact.name, e))?;

    match request.options.compression {
      CompressOption::Uncompressed => Ok(tar),
      CompressOption::Gzip => {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar).map_err(|e| failed(&artifact.name, e))?;
        encoder.finish().map_err(|e| failed(&artifact.name, e))
      }
    }
  }
}

impl ArtifactCompiler for ArchiveCompiler {
  fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<CompiledArtifact>, CompilerError> {
    fs::create_dir_all(request.output_dir).map_err(|e| CompilerError::Io {
      path: request.output_dir.to_path_buf(),
      source: e,
    })?;

    let mut links = LinkDigests::new(request.artifacts);
    let mut produced = Vec::with_capacity(request.rebuild.len());
    for name in request.rebuild {
      let artifact = request.artifacts.get(name).ok_or_else(|| CompilerError::Failed {
        message: format!("artifact '{}' is not in the resolved list", name),
      })?;

      let bytes = self.archive(artifact, request, &mut links)?;
      let path = request.output_path(name);
      write_atomic(&path, &bytes).map_err(|e| CompilerError::Io {
        path: path.clone(),
        source: e,
      })?;

      debug!(artifact = %name, bytes = bytes.len(), path = ?path, "wrote archive");
      produced.push(CompiledArtifact {
        name: name.clone(),
        path,
      });
    }

    Ok(produced)
  }
}

/// Memoized link digests over the resolved artifacts.
struct LinkDigests<'a> {
  artifacts: &'a ResolvedArtifacts,
  known: HashMap<String, ContentHash>,
  visiting: HashSet<String>,
}

impl<'a> LinkDigests<'a> {
  fn new(artifacts: &'a ResolvedArtifacts) -> Self {
    Self {
      artifacts,
      known: HashMap::new(),
      visiting: HashSet::new(),
    }
  }

  fn digest(&mut self, name: &str) -> Result<ContentHash, CompilerError> {
    if let Some(digest) = self.known.get(name) {
      return Ok(digest.clone());
    }
    if !self.visiting.insert(name.to_string()) {
      return Err(CompilerError::Failed {
        message: format!("dependency cycle through '{}'", name),
      });
    }

    let artifacts = self.artifacts;
    let artifact = artifacts.get(name).ok_or_else(|| CompilerError::Failed {
      message: format!("unknown dependency '{}'", name),
    })?;

    let mut parts = vec![artifact.source_hash.to_string()];
    for dependency in &artifact.dependencies {
      parts.push(format!("{}:{}", dependency, self.digest(dependency)?));
    }
    let digest = hash_parts(parts);

    self.visiting.remove(name);
    self.known.insert(name.to_string(), digest.clone());
    Ok(digest)
  }
}

fn append(builder: &mut Builder<Vec<u8>>, path: &str, data: &[u8]) -> Result<(), CompilerError> {
  let mut header = Header::new_gnu();
  header.set_size(data.len() as u64);
  header.set_mode(0o644);
  header.set_mtime(0);
  header.set_uid(0);
  header.set_gid(0);
  builder
    .append_data(&mut header, Path::new(path), data)
    .map_err(|e| failed(path, e))
}

fn failed(what: &str, e: std::io::Error) -> CompilerError {
  CompilerError::Failed {
    message: format!("failed to archive {}: {}", what, e),
  }
}
