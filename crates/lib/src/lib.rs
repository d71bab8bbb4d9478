//! patchbuild-lib: incremental, versioned artifact builds for patch distribution
//!
//! This crate provides the build pipeline behind `patchbuild`:
//! - `collect`: inclusion rules and source metadata from a project
//! - `resolve` and `graph`: the artifact list, its dependencies and cycle checks
//! - `incremental`: rebuild or reuse decisions from fingerprints
//! - `compile` and `encrypt`: producing and post-processing artifact files
//! - `manifest` and `diff`: the versioned patch manifest and what changed
//! - `pipeline`: the stage runner tying it all together

pub mod collect;
pub mod compile;
pub mod consts;
pub mod context;
pub mod deploy;
pub mod diff;
pub mod encrypt;
pub mod graph;
pub mod incremental;
pub mod layout;
pub mod manifest;
pub mod params;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod util;
