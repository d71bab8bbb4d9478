//! Patch manifest types, storage and assembly.
//!
//! A manifest records every artifact of one build version. It is written once
//! by the CreateManifest stage and read back by later builds to decide what to
//! rebuild and what to redistribute.

mod build;
mod storage;
mod types;

use std::path::PathBuf;

pub use build::{ManifestInputs, build_manifest};
pub use storage::{ManifestStore, load_manifest_file};
pub use types::*;

/// The manifest written by this run and where it was written.
#[derive(Debug, Clone)]
pub struct ManifestContext {
  pub manifest: PatchManifest,
  pub path: PathBuf,
}
