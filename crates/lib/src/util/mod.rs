//! Shared utilities.
//!
//! Common utilities used across the crate: hashing and atomic file writes.

pub mod fs;
pub mod hash;
