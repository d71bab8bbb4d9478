//! End-to-end pipeline runs against a scratch project.

use std::fs;

use patchbuild_lib::collect::InclusionRule;
use patchbuild_lib::context::BuildContext;
use patchbuild_lib::diff::ChangeSet;
use patchbuild_lib::manifest::{ManifestStore, PatchManifest};
use patchbuild_lib::pipeline::{BuildError, PatchBuilder, PipelineError, Stage};

use super::common::{RecordingCompiler, TestProject, read_names};

fn rules() -> Vec<InclusionRule> {
  vec![InclusionRule::new("A", ["a.txt"]), InclusionRule::new("B", ["b.txt"])]
}

const REFS: &[(&str, &[&str])] = &[("b.txt", &["a.txt"])];

fn project() -> TestProject {
  let project = TestProject::new();
  project.write_source("a.txt", "alpha");
  project.write_source("b.txt", "bravo");
  project
}

#[test]
fn versions_one_two_three() {
  let project = project();
  let compiler = RecordingCompiler::default();

  // v1: everything is new
  let v1 = PatchBuilder::new(project.collector(&rules(), REFS), &compiler)
    .run(project.params(1))
    .unwrap();
  assert_eq!(v1.rebuilt, vec!["A", "B"]);
  assert_eq!(v1.changes.added, vec!["A", "B"]);
  assert_eq!(v1.changes.prior_version, None);
  assert_eq!(v1.manifest.get("A").unwrap().dependencies, Vec::<String>::new());
  assert_eq!(v1.manifest.get("B").unwrap().dependencies, vec!["A"]);
  assert_eq!(
    read_names(&project.package_dir(1)),
    vec!["A", "B", "build_report.txt", "patch_manifest.json"]
  );

  // v2: nothing changed
  let v2 = PatchBuilder::new(project.collector(&rules(), REFS), &compiler)
    .run(project.params(2))
    .unwrap();
  assert!(v2.rebuilt.is_empty());
  assert_eq!(v2.reused, vec!["A", "B"]);
  assert!(v2.changes.is_empty());
  assert_eq!(compiler.call_count(), 1);
  assert_eq!(v2.manifest.get("A").unwrap().hash, v1.manifest.get("A").unwrap().hash);
  assert_eq!(v2.manifest.get("A").unwrap().version, 1);
  assert_eq!(
    read_names(&project.package_dir(2)),
    vec!["build_report.txt", "patch_manifest.json"]
  );

  // v3: A's source changed, B follows through its dependency
  project.write_source("a.txt", "alpha, edited");
  let v3 = PatchBuilder::new(project.collector(&rules(), REFS), &compiler)
    .run(project.params(3))
    .unwrap();
  assert_eq!(v3.rebuilt, vec!["A", "B"]);
  assert_eq!(v3.changes.modified, vec!["A", "B"]);
  assert_eq!(v3.changes.prior_version, Some(2));
  assert_ne!(v3.manifest.get("A").unwrap().hash, v2.manifest.get("A").unwrap().hash);
  assert!(v3.manifest.changed_in(3).all(|r| r.version == 3));

  let report = fs::read_to_string(project.package_dir(3).join("build_report.txt")).unwrap();
  assert!(report.contains("Version: 3"));
}

#[test]
fn written_manifest_matches_summary() {
  let project = project();
  let summary = PatchBuilder::new(project.collector(&rules(), REFS), RecordingCompiler::default())
    .run(project.params(1))
    .unwrap();

  let stored = ManifestStore::new(project.platform_dir()).load(1).unwrap();
  assert_eq!(stored, summary.manifest);
  assert_eq!(summary.manifest_path, project.package_dir(1).join("patch_manifest.json"));
}

#[test]
fn force_rebuild_rebuilds_everything_but_ships_nothing_new() {
  let project = project();
  let compiler = RecordingCompiler::default();
  PatchBuilder::new(project.collector(&rules(), REFS), &compiler)
    .run(project.params(1))
    .unwrap();

  let forced = PatchBuilder::new(project.collector(&rules(), REFS), &compiler)
    .run(project.params(2).with_force_rebuild(true))
    .unwrap();

  assert_eq!(forced.rebuilt, vec!["A", "B"]);
  assert_eq!(compiler.last_rebuild(), vec!["A", "B"]);
  assert!(forced.changes.is_empty());
}

#[test]
fn cycle_stops_before_compiling() {
  let project = project();
  let compiler = RecordingCompiler::default();
  let refs: &[(&str, &[&str])] = &[("a.txt", &["b.txt"]), ("b.txt", &["a.txt"])];

  let err = PatchBuilder::new(project.collector(&rules(), refs), &compiler)
    .run(project.params(1))
    .unwrap_err();

  assert!(matches!(
    err,
    PipelineError::Stage {
      stage: Stage::CheckCycle,
      source: BuildError::Graph(_)
    }
  ));
  assert!(err.to_string().contains("A -> B -> A"));
  assert_eq!(compiler.call_count(), 0);
  assert!(!project.package_dir(1).join("patch_manifest.json").exists());
}

#[test]
fn missing_source_fails_resolution() {
  let project = project();
  let collector = project.collector(&rules(), REFS).rule(InclusionRule::new("C", ["ghost.txt"]));

  let err = PatchBuilder::new(collector, RecordingCompiler::default())
    .run(project.params(1))
    .unwrap_err();
  assert_eq!(err.stage(), Some(Stage::Resolve));
  assert!(err.to_string().contains("ghost.txt"));
}

#[test]
fn artifact_named_like_the_manifest_is_rejected() {
  let project = project();
  let rules = vec![
    InclusionRule::new("A", ["a.txt"]),
    InclusionRule::new("patch_manifest.json", ["b.txt"]),
  ];

  let err = PatchBuilder::new(project.collector(&rules, &[]), RecordingCompiler::default())
    .run(project.params(1))
    .unwrap_err();
  assert!(matches!(
    err,
    PipelineError::Stage {
      stage: Stage::Resolve,
      source: BuildError::Resolve(_)
    }
  ));
  assert!(!project.package_dir(1).join("patch_manifest.json").exists());
}

#[test]
fn corrupt_prior_manifest_is_fatal() {
  let project = project();
  fs::create_dir_all(project.package_dir(1)).unwrap();
  fs::write(project.package_dir(1).join("patch_manifest.json"), "{ not json").unwrap();

  let err = PatchBuilder::new(project.collector(&rules(), REFS), RecordingCompiler::default())
    .run(project.params(2))
    .unwrap_err();
  assert!(matches!(
    err,
    PipelineError::Stage {
      stage: Stage::PlanIncremental,
      source: BuildError::Manifest(_)
    }
  ));
}

#[test]
fn version_zero_is_rejected() {
  let project = project();
  let err = PatchBuilder::new(project.collector(&rules(), REFS), RecordingCompiler::default())
    .run(project.params(0))
    .unwrap_err();
  assert!(matches!(
    err,
    PipelineError::Stage {
      stage: Stage::Prepare,
      source: BuildError::InvalidParameters(_)
    }
  ));
}

#[test]
fn removed_artifact_is_pruned_and_reported() {
  let project = project();
  PatchBuilder::new(project.collector(&rules(), REFS), RecordingCompiler::default())
    .run(project.params(1))
    .unwrap();

  let only_a = vec![InclusionRule::new("A", ["a.txt"])];
  let v2 = PatchBuilder::new(project.collector(&only_a, &[]), RecordingCompiler::default())
    .run(project.params(2))
    .unwrap();

  assert_eq!(v2.changes.removed, vec!["B"]);
  assert!(v2.changes.is_empty());
  assert_eq!(read_names(&project.platform_dir().join("output")), vec!["A"]);
}

#[test]
fn append_hash_names_staged_files() {
  let project = project();
  let summary = PatchBuilder::new(project.collector(&rules(), REFS), RecordingCompiler::default())
    .run(project.params(1).with_append_hash(true))
    .unwrap();

  let a = summary.manifest.get("A").unwrap();
  assert_eq!(a.file_name, format!("A_{}", a.hash));
  assert!(project.package_dir(1).join(&a.file_name).is_file());
}

#[test]
fn gap_in_versions_diffs_against_missing_predecessor() {
  let project = project();
  PatchBuilder::new(project.collector(&rules(), REFS), RecordingCompiler::default())
    .run(project.params(1))
    .unwrap();

  let v5 = PatchBuilder::new(project.collector(&rules(), REFS), RecordingCompiler::default())
    .run(project.params(5))
    .unwrap();

  // incremental state comes from v1, the diff from the (absent) v4
  assert!(v5.rebuilt.is_empty());
  assert_eq!(v5.changes.prior_version, None);
  assert_eq!(v5.changes.added, vec!["A", "B"]);
}

#[test]
fn run_in_keeps_published_context() {
  let project = project();
  let mut ctx = BuildContext::new();
  ctx.set(ChangeSet {
    added: vec!["stale".to_string()],
    ..Default::default()
  });

  PatchBuilder::new(project.collector(&rules(), REFS), RecordingCompiler::default())
    .run_in(&mut ctx, project.params(1))
    .unwrap();

  let changes = ctx.get::<ChangeSet>().unwrap();
  assert_eq!(changes.added, vec!["A", "B"]);
  assert_eq!(ctx.kinds().len(), 8);
}

#[test]
fn empty_project_writes_empty_manifest() {
  let project = project();
  let summary = PatchBuilder::new(project.collector(&[], &[]), RecordingCompiler::default())
    .run(project.params(1))
    .unwrap();

  assert_eq!(summary.manifest, PatchManifest::new(1, Default::default()));
  assert!(summary.changes.is_empty());
}
