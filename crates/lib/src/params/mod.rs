//! Build parameters and the derived per-run parameter context.

mod types;

use std::path::{Component, Path, PathBuf};

pub use types::*;

use crate::layout;
use crate::pipeline::BuildError;

/// Parameters plus the directories derived from them, published by the
/// Prepare stage.
#[derive(Debug, Clone)]
pub struct BuildParametersContext {
  pub parameters: BuildParameters,
  /// Working output directory shared by all versions of a platform.
  pub output_dir: PathBuf,
  /// Directory receiving this version's manifest, report and changed files.
  pub package_dir: PathBuf,
}

impl BuildParametersContext {
  pub fn new(parameters: BuildParameters) -> Self {
    let output_dir = layout::output_dir(&parameters.output_root, &parameters.platform);
    let package_dir = layout::package_dir(&parameters.output_root, &parameters.platform, parameters.version);
    Self {
      parameters,
      output_dir,
      package_dir,
    }
  }

  pub fn version(&self) -> u32 {
    self.parameters.version
  }

  pub fn platform_dir(&self) -> PathBuf {
    layout::platform_dir(&self.parameters.output_root, &self.parameters.platform)
  }
}

/// Build options published as their own context kind.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptionsContext(pub BuildOptions);

/// Reject parameters that cannot produce a valid layout.
pub fn validate(parameters: &BuildParameters) -> Result<(), BuildError> {
  if parameters.version == 0 {
    return Err(BuildError::InvalidParameters(
      "build version 0 is reserved for the empty manifest".to_string(),
    ));
  }

  let platform = parameters.platform.as_str();
  if platform.is_empty() {
    return Err(BuildError::InvalidParameters("target platform must not be empty".to_string()));
  }

  let mut components = Path::new(platform).components();
  let single_normal = matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none();
  if !single_normal || platform.parse::<u32>().is_ok() || platform == crate::consts::OUTPUT_DIR_NAME {
    return Err(BuildError::InvalidParameters(format!(
      "target platform '{}' must be a single, non-numeric directory name",
      platform
    )));
  }

  if parameters.output_root.as_os_str().is_empty() {
    return Err(BuildError::InvalidParameters("output root must not be empty".to_string()));
  }

  Ok(())
}
