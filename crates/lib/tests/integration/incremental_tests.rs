//! Rebuild decisions across consecutive builds.

use std::fs;

use patchbuild_lib::collect::InclusionRule;
use patchbuild_lib::params::CompressOption;
use patchbuild_lib::pipeline::PatchBuilder;
use patchbuild_lib::util::hash::{HashAlgorithm, hash_file};

use super::common::{RecordingCompiler, TestProject};

/// C depends on B, B depends on A.
fn chain() -> (TestProject, Vec<InclusionRule>) {
  let project = TestProject::new();
  project.write_source("a/base.txt", "base");
  project.write_source("b/mid.txt", "mid");
  project.write_source("c/top.txt", "top");
  let rules = vec![
    InclusionRule::new("A", ["a/base.txt"]),
    InclusionRule::new("B", ["b/mid.txt"]),
    InclusionRule::new("C", ["c/top.txt"]),
  ];
  (project, rules)
}

const REFS: &[(&str, &[&str])] = &[("b/mid.txt", &["a/base.txt"]), ("c/top.txt", &["b/mid.txt"])];

#[test]
fn identical_inputs_reuse_everything() {
  let (project, rules) = chain();
  let compiler = RecordingCompiler::default();

  for version in 1..=3 {
    PatchBuilder::new(project.collector(&rules, REFS), &compiler)
      .run(project.params(version))
      .unwrap();
  }
  assert_eq!(compiler.call_count(), 1);
}

#[test]
fn upstream_change_rebuilds_the_whole_chain() {
  let (project, rules) = chain();
  let compiler = RecordingCompiler::default();
  PatchBuilder::new(project.collector(&rules, REFS), &compiler)
    .run(project.params(1))
    .unwrap();

  project.write_source("a/base.txt", "base v2");
  let v2 = PatchBuilder::new(project.collector(&rules, REFS), &compiler)
    .run(project.params(2))
    .unwrap();

  assert_eq!(v2.rebuilt, vec!["A", "B", "C"]);
  assert_eq!(v2.changes.modified, vec!["A", "B", "C"]);
}

#[test]
fn leaf_change_rebuilds_only_the_leaf() {
  let (project, rules) = chain();
  let compiler = RecordingCompiler::default();
  PatchBuilder::new(project.collector(&rules, REFS), &compiler)
    .run(project.params(1))
    .unwrap();

  project.write_source("c/top.txt", "top v2");
  let v2 = PatchBuilder::new(project.collector(&rules, REFS), &compiler)
    .run(project.params(2))
    .unwrap();

  assert_eq!(v2.rebuilt, vec!["C"]);
  assert_eq!(v2.reused, vec!["A", "B"]);
  assert_eq!(v2.changes.modified, vec!["C"]);
}

#[test]
fn deleted_output_is_rebuilt() {
  let (project, rules) = chain();
  let compiler = RecordingCompiler::default();
  PatchBuilder::new(project.collector(&rules, REFS), &compiler)
    .run(project.params(1))
    .unwrap();

  fs::remove_file(project.platform_dir().join("output").join("B")).unwrap();
  let v2 = PatchBuilder::new(project.collector(&rules, REFS), &compiler)
    .run(project.params(2))
    .unwrap();

  assert_eq!(compiler.last_rebuild(), vec!["B"]);
  assert!(v2.changes.is_empty());
}

#[test]
fn compression_change_rebuilds_and_ships_everything() {
  let (project, rules) = chain();
  PatchBuilder::new(project.collector(&rules, REFS), RecordingCompiler::default())
    .run(project.params(1))
    .unwrap();

  let v2 = PatchBuilder::new(project.collector(&rules, REFS), RecordingCompiler::default())
    .run(project.params(2).with_compression(CompressOption::Gzip))
    .unwrap();

  assert_eq!(v2.rebuilt.len(), 3);
  assert_eq!(v2.changes.len(), 3);
}

#[test]
fn type_metadata_changes_are_ignored_by_default() {
  let (project, rules) = chain();
  let compiler = RecordingCompiler::default();

  let collector = project.collector(&rules, REFS).type_hash("a/base.txt", "T1");
  PatchBuilder::new(collector, &compiler).run(project.params(1)).unwrap();

  let collector = project.collector(&rules, REFS).type_hash("a/base.txt", "T2");
  let v2 = PatchBuilder::new(collector, &compiler).run(project.params(2)).unwrap();
  assert!(v2.rebuilt.is_empty());

  let collector = project.collector(&rules, REFS).type_hash("a/base.txt", "T3");
  let v3 = PatchBuilder::new(collector, &compiler)
    .run(project.params(3).with_type_metadata(false, false))
    .unwrap();
  assert_eq!(v3.rebuilt, vec!["A", "B", "C"]);
}

#[test]
fn building_below_latest_rebuilds_outputs_a_later_version_replaced() {
  let project = TestProject::new();
  let rules = vec![InclusionRule::new("A", ["a.txt"])];
  let compiler = RecordingCompiler::default();

  project.write_source("a.txt", "x");
  PatchBuilder::new(project.collector(&rules, &[]), &compiler)
    .run(project.params(1))
    .unwrap();
  project.write_source("a.txt", "y");
  PatchBuilder::new(project.collector(&rules, &[]), &compiler)
    .run(project.params(5))
    .unwrap();

  project.write_source("a.txt", "x");
  let v3 = PatchBuilder::new(project.collector(&rules, &[]), &compiler)
    .run(project.params(3))
    .unwrap();

  assert_eq!(v3.rebuilt, vec!["A"]);
  let (shipped, size) = hash_file(&project.package_dir(3).join("A"), HashAlgorithm::Sha256).unwrap();
  let record = v3.manifest.get("A").unwrap();
  assert_eq!(record.hash, shipped);
  assert_eq!(record.size, size);
}
