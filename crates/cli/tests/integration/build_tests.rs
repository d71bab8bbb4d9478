//! Multi-version builds through the CLI.

use predicates::prelude::*;

use super::common::{TWO_ARTIFACT_PROJECT, TestEnv};

fn names(value: &serde_json::Value) -> Vec<String> {
  value
    .as_array()
    .unwrap()
    .iter()
    .map(|v| v.as_str().unwrap().to_string())
    .collect()
}

#[test]
fn first_build_ships_everything() {
  let env = TestEnv::two_artifacts();

  let output = env.build(1, &["--json"]).output().unwrap();
  assert!(output.status.success());
  let json = TestEnv::json(&output);

  assert_eq!(json["version"], 1);
  assert_eq!(names(&json["rebuilt"]), vec!["base", "top"]);
  assert_eq!(names(&json["changes"]["added"]), vec!["base", "top"]);
  assert_eq!(
    env.package_files(1),
    vec!["base", "build_report.txt", "patch_manifest.json", "top"]
  );
}

#[test]
fn unchanged_sources_ship_nothing() {
  let env = TestEnv::two_artifacts();
  env.build(1, &[]).assert().success();

  let output = env.build(2, &["--json"]).output().unwrap();
  assert!(output.status.success());
  let json = TestEnv::json(&output);

  assert!(names(&json["rebuilt"]).is_empty());
  assert_eq!(names(&json["reused"]), vec!["base", "top"]);
  assert_eq!(env.package_files(2), vec!["build_report.txt", "patch_manifest.json"]);
}

#[test]
fn upstream_change_ships_dependents() {
  let env = TestEnv::two_artifacts();
  env.build(1, &[]).assert().success();
  env.build(2, &[]).assert().success();

  env.write_source("base.txt", "base v3");
  let output = env.build(3, &["--json"]).output().unwrap();
  assert!(output.status.success());
  let json = TestEnv::json(&output);

  assert_eq!(names(&json["rebuilt"]), vec!["base", "top"]);
  assert_eq!(names(&json["changes"]["modified"]), vec!["base", "top"]);
  assert_eq!(json["changes"]["prior_version"], 2);
}

#[test]
fn leaf_change_ships_only_the_leaf() {
  let env = TestEnv::two_artifacts();
  env.build(1, &[]).assert().success();

  env.write_source("top.txt", "top v2");
  let output = env.build(2, &["--json"]).output().unwrap();
  let json = TestEnv::json(&output);

  assert_eq!(names(&json["rebuilt"]), vec!["top"]);
  assert_eq!(names(&json["changes"]["modified"]), vec!["top"]);
  assert_eq!(env.package_files(2), vec!["build_report.txt", "patch_manifest.json", "top"]);
}

#[test]
fn append_hash_renames_distributed_files() {
  let env = TestEnv::two_artifacts();
  env.build(1, &["--append-hash"]).assert().success();

  let files = env.package_files(1);
  assert!(files.iter().any(|f| f.starts_with("base_")));
  assert!(files.iter().any(|f| f.starts_with("top_")));
  assert!(!files.contains(&"base".to_string()));
}

#[test]
fn project_settings_apply_and_flags_override_them() {
  let project = TWO_ARTIFACT_PROJECT.replacen(
    "\"source_root\"",
    "\"settings\": { \"compression\": \"gzip\", \"hash_algorithm\": \"sha512\" },\n  \"source_root\"",
    1,
  );
  let env = TestEnv::with_project(&project);
  env.write_source("base.txt", "base");
  env.write_source("top.txt", "top");

  env.build(1, &["--hash", "sha256"]).assert().success();

  let report = std::fs::read_to_string(env.package_dir(1).join("build_report.txt")).unwrap();
  assert!(report.contains("Compression: gzip"));
  assert!(report.contains("Hash algorithm: sha256"));
}

#[test]
fn cyclic_project_fails_at_cycle_check() {
  let env = TestEnv::with_project(
    r#"{
      "source_root": "assets",
      "rules": [
        { "artifact": "a", "sources": ["a.txt"] },
        { "artifact": "b", "sources": ["b.txt"] }
      ],
      "references": { "a.txt": ["b.txt"], "b.txt": ["a.txt"] }
    }"#,
  );
  env.write_source("a.txt", "a");
  env.write_source("b.txt", "b");

  env
    .build(1, &[])
    .assert()
    .failure()
    .stderr(predicate::str::contains("stage check-cycle failed"));
  assert!(!env.package_dir(1).join("patch_manifest.json").exists());
}

#[test]
fn missing_source_is_reported() {
  let env = TestEnv::with_project(
    r#"{ "source_root": "assets", "rules": [ { "artifact": "a", "sources": ["gone.txt"] } ] }"#,
  );
  env.write_source("other.txt", "x");

  env
    .build(1, &[])
    .assert()
    .failure()
    .stderr(predicate::str::contains("gone.txt"));
}
