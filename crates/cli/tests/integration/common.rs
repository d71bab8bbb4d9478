//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Project with two artifacts: `base` from `base.txt` and `top` from
/// `top.txt`, where `top.txt` references `base.txt`.
pub const TWO_ARTIFACT_PROJECT: &str = r#"{
  "source_root": "assets",
  "rules": [
    { "artifact": "base", "sources": ["base.txt"] },
    { "artifact": "top", "sources": ["top.txt"] }
  ],
  "references": { "top.txt": ["base.txt"] }
}"#;

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the project file, its
/// sources and the output root.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Environment with `project` as `patchbuild.json`.
  pub fn with_project(project: &str) -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("patchbuild.json"), project).unwrap();
    Self { temp }
  }

  /// The two-artifact project with its sources written.
  pub fn two_artifacts() -> Self {
    let env = Self::with_project(TWO_ARTIFACT_PROJECT);
    env.write_source("base.txt", "base v1");
    env.write_source("top.txt", "top v1");
    env
  }

  /// Write a source file below `assets/`.
  pub fn write_source(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join("assets").join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Output root used by [`TestEnv::build`].
  pub fn output_path(&self) -> PathBuf {
    let p = self.temp.path().join("dist");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Package directory of `version` on `ios`.
  pub fn package_dir(&self, version: u32) -> PathBuf {
    self.output_path().join("ios").join(version.to_string())
  }

  /// `patchbuild` running in the environment directory.
  pub fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("patchbuild");
    cmd.current_dir(self.temp.path());
    cmd
  }

  /// `patchbuild build` for `version` on `ios`, with extra flags.
  pub fn build(&self, version: u32, extra: &[&str]) -> Command {
    let mut cmd = self.cmd();
    cmd
      .arg("build")
      .arg("--output")
      .arg(self.output_path())
      .args(["--platform", "ios", "--version", &version.to_string()])
      .args(extra);
    cmd
  }

  /// Sorted file names in the package directory of `version`.
  pub fn package_files(&self, version: u32) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(self.package_dir(version))
      .unwrap()
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    names.sort();
    names
  }

  /// Parse the JSON `stdout` of a finished command.
  pub fn json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
  }
}
