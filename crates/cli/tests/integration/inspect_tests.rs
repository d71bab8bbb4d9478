//! `show` and `diff` against built versions.

use predicates::prelude::*;

use super::common::TestEnv;

fn built_three_versions() -> TestEnv {
  let env = TestEnv::two_artifacts();
  env.build(1, &[]).assert().success();
  env.build(2, &[]).assert().success();
  env.write_source("top.txt", "top v3");
  env.build(3, &[]).assert().success();
  env
}

#[test]
fn show_defaults_to_latest_version() {
  let env = built_three_versions();
  let output_root = env.output_path();

  env
    .cmd()
    .arg("show")
    .arg("--output")
    .arg(&output_root)
    .args(["--platform", "ios"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Version 3"))
    .stdout(predicate::str::contains("Updated here: 1"));
}

#[test]
fn show_json_is_the_manifest() {
  let env = built_three_versions();
  let output_root = env.output_path();

  let output = env
    .cmd()
    .arg("show")
    .arg("--output")
    .arg(&output_root)
    .args(["--platform", "ios", "--version", "2", "--json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json = TestEnv::json(&output);
  assert_eq!(json["version"], 2);
  let artifacts = json["artifacts"].as_array().unwrap();
  assert_eq!(artifacts.len(), 2);
  assert!(artifacts.iter().all(|a| a["version"] == 1));
}

#[test]
fn diff_spans_several_versions() {
  let env = built_three_versions();
  let output_root = env.output_path();

  let output = env
    .cmd()
    .arg("diff")
    .arg("--output")
    .arg(&output_root)
    .args(["--platform", "ios", "--from", "1", "--to", "3", "--json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json = TestEnv::json(&output);
  assert_eq!(json["changes"]["modified"], serde_json::json!(["top"]));
  assert_eq!(json["changes"]["added"], serde_json::json!([]));
}

#[test]
fn diff_human_output_marks_changes() {
  let env = built_three_versions();
  let output_root = env.output_path();

  env
    .cmd()
    .arg("diff")
    .arg("--output")
    .arg(&output_root)
    .args(["--platform", "ios", "--from", "2", "--to", "3"])
    .assert()
    .success()
    .stdout(predicate::str::contains("~ top"))
    .stdout(predicate::str::contains("0 added, 1 modified, 0 removed"));
}
