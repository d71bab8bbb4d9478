//! Sources of inclusion rules and source metadata.
//!
//! A [`Collector`] answers two questions for the resolver: which rules apply to
//! a platform, and what is known about a given source path.

mod memory;
mod project;
mod types;

pub use memory::StaticCollector;
pub use project::{ProjectCollector, ProjectConfig, ProjectSettings, RuleConfig};
pub use types::*;
