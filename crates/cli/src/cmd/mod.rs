mod build;
mod diff;
mod show;

pub use build::{BuildArgs, cmd_build};
pub use diff::cmd_diff;
pub use show::cmd_show;

use anyhow::{Result, bail};

use patchbuild_lib::layout;
use patchbuild_lib::manifest::ManifestStore;
use patchbuild_lib::params::TargetPlatform;

use crate::Target;

/// Manifest store of the platform `target` names.
fn open_store(target: &Target) -> ManifestStore {
  let platform = TargetPlatform::new(target.platform.as_str());
  ManifestStore::new(layout::platform_dir(&target.output, &platform))
}

/// Fail unless a manifest for `version` was built.
fn require_version(store: &ManifestStore, version: u32) -> Result<()> {
  if !store.exists(version) {
    bail!(
      "no manifest for version {} in {}",
      version,
      store.platform_dir().display()
    );
  }
  Ok(())
}
