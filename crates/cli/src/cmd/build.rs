//! Implementation of the `patchbuild build` command.
//!
//! Loads the project file, runs every pipeline stage for one version and
//! prints what was rebuilt and what a client has to download.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use patchbuild_lib::collect::ProjectCollector;
use patchbuild_lib::compile::ArchiveCompiler;
use patchbuild_lib::params::{BuildParameters, CompressOption};
use patchbuild_lib::pipeline::{BuildSummary, PatchBuilder};
use patchbuild_lib::util::hash::HashAlgorithm;

use crate::Target;
use crate::output::{
  format_bytes, format_elapsed, print_change, print_info, print_json, print_stat, print_success, print_warning,
  symbols, truncate_hash,
};

pub struct BuildArgs {
  pub project: PathBuf,
  pub target: Target,
  pub version: u32,
  pub hash: Option<HashAlgorithm>,
  pub compress: Option<CompressOption>,
  pub force: bool,
  pub append_hash: bool,
  pub disable_type_metadata: bool,
  pub track_type_metadata: bool,
  pub verbose: bool,
  pub json: bool,
}

impl BuildArgs {
  /// Built-in defaults, then the project settings, then the command line flags.
  fn parameters(&self, collector: &ProjectCollector) -> BuildParameters {
    let defaults = BuildParameters::new(&self.target.output, self.target.platform.as_str(), self.version);
    let mut params = collector.settings().apply(defaults);

    if let Some(algorithm) = self.hash {
      params.hash_algorithm = algorithm;
    }
    if let Some(compression) = self.compress {
      params.compression = compression;
    }
    if self.force {
      params.force_rebuild = true;
    }
    if self.append_hash {
      params.append_hash = true;
    }
    if self.disable_type_metadata {
      params.disable_type_metadata = true;
    }
    if self.track_type_metadata {
      params.ignore_type_metadata_changes = false;
    }
    params
  }
}

pub fn cmd_build(args: BuildArgs) -> Result<()> {
  let collector = ProjectCollector::load(&args.project)
    .with_context(|| format!("Failed to load project {}", args.project.display()))?;
  info!(project = %args.project.display(), sources = collector.source_count(), "project loaded");

  let params = args.parameters(&collector);
  let summary = PatchBuilder::new(collector, ArchiveCompiler::new())
    .run(params)
    .with_context(|| format!("Build of version {} failed", args.version))?;

  if args.json {
    let output = serde_json::json!({
      "version": summary.version,
      "package_dir": summary.package_dir,
      "manifest_path": summary.manifest_path,
      "rebuilt": summary.rebuilt,
      "reused": summary.reused,
      "changes": summary.changes,
      "elapsed_ms": summary.elapsed.as_millis() as u64,
    });
    print_json(&output)?;
  } else {
    print_summary(&args.target, &summary, args.verbose);
  }

  Ok(())
}

fn print_summary(target: &Target, summary: &BuildSummary, verbose: bool) {
  print_success(&format!(
    "Built version {} for {} in {}",
    summary.version,
    target.platform,
    format_elapsed(summary.elapsed)
  ));
  print_stat("Artifacts", &summary.manifest.artifacts.len().to_string());
  print_stat("Rebuilt", &summary.rebuilt.len().to_string());
  print_stat("Reused", &summary.reused.len().to_string());
  print_stat("Package", &summary.package_dir.display().to_string());
  println!();

  let changes = &summary.changes;
  if changes.is_empty() {
    print_info("No artifacts changed since the previous version.");
  } else {
    let size: u64 = changes.records(&summary.manifest).map(|r| r.size).sum();
    print_info(&format!("{} artifact(s) to distribute ({})", changes.len(), format_bytes(size)));
    for record in changes.records(&summary.manifest) {
      let symbol = if changes.added.contains(&record.name) {
        symbols::ADD
      } else {
        symbols::MODIFY
      };
      let detail = if verbose {
        format!("{} {}", record.file_name, truncate_hash(record.hash.as_str()))
      } else {
        String::new()
      };
      print_change(symbol, &record.name, &detail);
    }
  }

  if !changes.removed.is_empty() {
    print_warning(&format!(
      "{} artifact(s) no longer built: {}",
      changes.removed.len(),
      changes.removed.join(", ")
    ));
  }
}
