//! Shared helpers for library integration tests.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use patchbuild_lib::collect::{InclusionRule, StaticCollector};
use patchbuild_lib::compile::{ArchiveCompiler, ArtifactCompiler, CompileRequest, CompiledArtifact, CompilerError};
use patchbuild_lib::params::BuildParameters;
use tempfile::TempDir;

/// A scratch project: sources on disk plus an output root.
pub struct TestProject {
  pub temp: TempDir,
}

impl TestProject {
  pub fn new() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  pub fn source_dir(&self) -> PathBuf {
    self.temp.path().join("src")
  }

  pub fn output_root(&self) -> PathBuf {
    self.temp.path().join("dist")
  }

  pub fn platform_dir(&self) -> PathBuf {
    self.output_root().join("ios")
  }

  pub fn package_dir(&self, version: u32) -> PathBuf {
    self.platform_dir().join(version.to_string())
  }

  pub fn write_source(&self, logical: &str, content: &str) {
    let path = self.source_dir().join(logical);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  /// Collector over the sources currently on disk.
  pub fn collector(&self, rules: &[InclusionRule], references: &[(&str, &[&str])]) -> StaticCollector {
    let mut collector = StaticCollector::new();
    for rule in rules {
      for source in &rule.sources {
        let location = self.source_dir().join(source);
        let content = fs::read(&location).unwrap();
        collector = collector.add_source(source, location, &content);
      }
      collector = collector.rule(rule.clone());
    }
    for (from, to) in references {
      collector = collector.references(from, to.iter().copied());
    }
    collector
  }

  pub fn params(&self, version: u32) -> BuildParameters {
    BuildParameters::new(self.output_root(), "ios", version)
  }
}

/// Archive compiler that records every rebuild set it is asked for.
#[derive(Default)]
pub struct RecordingCompiler {
  pub calls: RefCell<Vec<BTreeSet<String>>>,
}

impl RecordingCompiler {
  pub fn call_count(&self) -> usize {
    self.calls.borrow().len()
  }

  pub fn last_rebuild(&self) -> Vec<String> {
    self
      .calls
      .borrow()
      .last()
      .map(|set| set.iter().cloned().collect())
      .unwrap_or_default()
  }
}

impl ArtifactCompiler for RecordingCompiler {
  fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<CompiledArtifact>, CompilerError> {
    self.calls.borrow_mut().push(request.rebuild.clone());
    ArchiveCompiler::new().compile(request)
  }
}

pub fn read_names(path: &Path) -> Vec<String> {
  let mut names: Vec<String> = fs::read_dir(path)
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  names.sort();
  names
}
