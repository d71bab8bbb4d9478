//! Diff command implementation.
//!
//! Compares the manifests of two built versions and lists the artifacts a
//! client on the older version has to download.

use anyhow::{Context, Result, bail};
use owo_colors::{OwoColorize, Stream};

use patchbuild_lib::diff::{ChangeSet, compute_changes};
use patchbuild_lib::manifest::PatchManifest;

use super::{open_store, require_version};
use crate::Target;
use crate::output::{format_bytes, print_change, print_info, print_json, symbols, truncate_hash};

pub fn cmd_diff(target: &Target, from: u32, to: u32, verbose: bool, json: bool) -> Result<()> {
  if from >= to {
    bail!("--from ({}) must be lower than --to ({})", from, to);
  }

  let store = open_store(target);
  require_version(&store, from)?;
  require_version(&store, to)?;

  let older = store
    .load(from)
    .with_context(|| format!("Failed to load manifest for version {}", from))?;
  let newer = store
    .load(to)
    .with_context(|| format!("Failed to load manifest for version {}", to))?;

  let changes = compute_changes(&newer, &older);

  if json {
    let output = serde_json::json!({
      "from": from,
      "to": to,
      "changes": changes,
    });
    print_json(&output)?;
  } else {
    print_human_diff(from, to, &newer, &changes, verbose);
  }

  Ok(())
}

fn print_human_diff(from: u32, to: u32, newer: &PatchManifest, changes: &ChangeSet, verbose: bool) {
  println!(
    "Comparing {} {} {}",
    from,
    symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    to
  );
  println!();

  if changes.is_empty() && changes.removed.is_empty() {
    println!("No changes.");
    return;
  }

  for record in changes.records(newer) {
    let symbol = if changes.added.contains(&record.name) {
      symbols::ADD
    } else {
      symbols::MODIFY
    };
    let detail = if verbose {
      format!("({}, {})", truncate_hash(record.hash.as_str()), format_bytes(record.size))
    } else {
      String::new()
    };
    print_change(symbol, &record.name, &detail);
  }
  for name in &changes.removed {
    print_change(symbols::REMOVE, name, "");
  }

  println!();
  let size: u64 = changes.records(newer).map(|r| r.size).sum();
  print_info(&format!(
    "{} added, {} modified, {} removed ({} to download)",
    changes.added.len(),
    changes.modified.len(),
    changes.removed.len(),
    format_bytes(size)
  ));
}
