//! CLI integration tests.
//!
//! These drive the `patchbuild` binary across several versions of a project
//! and check what lands on disk.

mod common;

mod build_tests;
mod inspect_tests;
