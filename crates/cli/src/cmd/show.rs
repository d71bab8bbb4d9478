//! Show command implementation.
//!
//! Prints the manifest of one built version, the latest by default.

use anyhow::{Context, Result};

use patchbuild_lib::manifest::PatchManifest;

use super::{open_store, require_version};
use crate::Target;
use crate::output::{format_bytes, print_info, print_json, print_stat, print_success, symbols, truncate_hash};

pub fn cmd_show(target: &Target, version: Option<u32>, verbose: bool, json: bool) -> Result<()> {
  let store = open_store(target);

  let version = match version {
    Some(version) => version,
    None => {
      let versions = store.versions().context("Failed to list built versions")?;
      match versions.last() {
        Some(latest) => *latest,
        None => {
          print_info(&format!(
            "No versions built for {}. Run 'patchbuild build' to create one.",
            target.platform
          ));
          return Ok(());
        }
      }
    }
  };

  require_version(&store, version)?;
  let manifest = store
    .load(version)
    .with_context(|| format!("Failed to load manifest for version {}", version))?;

  if json {
    print_json(&manifest)?;
  } else {
    print_manifest(&manifest, verbose);
  }

  Ok(())
}

fn print_manifest(manifest: &PatchManifest, verbose: bool) {
  print_success(&format!("Version {}", manifest.version));
  print_stat("Hash", manifest.hash_algorithm.as_str());
  print_stat("Artifacts", &manifest.artifacts.len().to_string());
  print_stat("Total size", &format_bytes(manifest.total_size()));
  print_stat(
    "Updated here",
    &manifest.changed_in(manifest.version).count().to_string(),
  );

  if manifest.artifacts.is_empty() {
    return;
  }

  println!();
  println!("Artifacts:");
  for record in &manifest.artifacts {
    println!(
      "  {} {} v{} {} {}",
      symbols::INFO,
      record.file_name,
      record.version,
      truncate_hash(record.hash.as_str()),
      format_bytes(record.size)
    );
    if verbose && !record.dependencies.is_empty() {
      println!("      depends on {}", record.dependencies.join(", "));
    }
  }

  if verbose && !manifest.variants.is_empty() {
    println!();
    println!("Variants:");
    for variant in &manifest.variants {
      println!("  {} {}", symbols::INFO, variant.id());
    }
  }
}
