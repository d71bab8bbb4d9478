//! Human-readable build report written next to each manifest.

use std::io;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::manifest::PatchManifest;
use crate::params::BuildParameters;
use crate::util::fs::write_atomic;

/// Render the report for `manifest`, built with `params` at `built_at`.
pub fn render_report(params: &BuildParameters, manifest: &PatchManifest, built_at: DateTime<Local>) -> String {
  let mut lines = vec![
    format!("Platform: {}", params.platform),
    format!("Version: {}", manifest.version),
    format!("Built at: {}", built_at.format("%Y-%m-%d %H:%M:%S %z")),
    String::new(),
    "-- Options --".to_string(),
    format!("Hash algorithm: {}", params.hash_algorithm),
    format!("Compression: {}", params.compression),
    format!("Force rebuild: {}", params.force_rebuild),
    format!("Append hash: {}", params.append_hash),
    format!("Disable type metadata: {}", params.disable_type_metadata),
    format!("Ignore type metadata changes: {}", params.ignore_type_metadata_changes),
    String::new(),
    format!("-- Artifacts ({}, {} bytes) --", manifest.artifacts.len(), manifest.total_size()),
  ];
  lines.extend(
    manifest
      .artifacts
      .iter()
      .map(|record| format!("{} {} {}", record.file_name, record.size, record.hash)),
  );

  lines.push(String::new());
  lines.push("-- Updated in this version --".to_string());
  lines.extend(manifest.changed_in(manifest.version).map(|record| record.name.clone()));

  lines.push(String::new());
  lines.push("-- Variants --".to_string());
  lines.extend(manifest.variants.iter().map(|variant| variant.to_string()));

  let mut out = lines.join("\n");
  out.push('\n');
  out
}

pub fn write_report(path: &Path, content: &str) -> io::Result<()> {
  write_atomic(path, content.as_bytes())
}
