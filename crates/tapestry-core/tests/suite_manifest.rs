//! Integration tests for multi-module suites and manifest-driven smoke runs.

use std::path::Path;

use serde_json::json;
use tapestry_core::{HarnessConfig, Orchestrator, Suite, SuiteManifest};

fn write_bundle(dir: &Path, file: &str, name: &str) {
    let body = json!({
        "name": name,
        "version": "0.1.0",
        "dnas": [{ "name": name, "zomes": [name], "entry_types": ["post"] }]
    });
    std::fs::create_dir_all(dir.join("workdir")).unwrap();
    std::fs::write(dir.join("workdir").join(file), body.to_string()).unwrap();
}

fn module(name: &str, passing: usize, failing: usize) -> Orchestrator {
    let mut orchestrator = Orchestrator::named(name, HarnessConfig::default());
    for i in 0..passing {
        orchestrator.register_scenario(format!("{name} passes {i}"), |_n, t, done| async move {
            t.pass("fine");
            done.done();
        });
    }
    for i in 0..failing {
        orchestrator.register_scenario(format!("{name} fails {i}"), |_n, _t, done| async move {
            done.fail("broken");
        });
    }
    orchestrator
}

/// Test: numbering continues across modules and each module is headed
#[tokio::test]
async fn test_suite_numbers_across_modules() {
    let report = Suite::new()
        .module(module("session3", 2, 0))
        .module(module("tragedy_commons", 1, 0))
        .run()
        .await;

    assert_eq!(report.count, 3);
    assert!(report.ok);
    assert_eq!(report.exit_code(), 0);

    let tap = report.to_tap();
    assert!(tap.starts_with("TAP version 13\n# session3\n"));
    assert!(tap.contains("\n# tragedy_commons\n"));
    assert!(tap.contains("ok 3 - tragedy_commons passes 0 # time="));
    assert!(tap.ends_with("\n1..3\n"));
}

/// Test: one failing module makes the whole suite fail
#[tokio::test]
async fn test_suite_failure_propagates() {
    let report = Suite::new()
        .module(module("good", 1, 0))
        .module(module("bad", 0, 1))
        .run()
        .await;

    assert_eq!(report.pass, 1);
    assert_eq!(report.fail, 1);
    assert!(!report.ok);
    assert_eq!(report.exit_code(), 1);
    assert!(report.runs[0].ok);
    assert!(!report.runs[1].ok);
}

/// Test: an empty suite reports an empty plan
#[tokio::test]
async fn test_empty_suite() {
    let suite = Suite::new();
    assert!(suite.is_empty());
    let report = suite.run().await;
    assert!(report.ok);
    assert_eq!(report.to_tap(), "TAP version 13\n1..0\n");
}

/// Test: smoke run installs every agent declared by a manifest
#[tokio::test]
async fn test_manifest_smoke_passes() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), "posts.happ", "posts");
    write_bundle(dir.path(), "books.happ", "books");

    let manifest_path = dir.path().join("suite.toml");
    std::fs::write(
        &manifest_path,
        r#"
name = "library"
agents = [
    [["workdir/posts.happ"], ["workdir/books.happ"]],
    [["workdir/posts.happ", "workdir/books.happ"]],
]
"#,
    )
    .unwrap();

    let manifest = SuiteManifest::load(&manifest_path).unwrap();
    let plan = manifest.plan().unwrap();
    assert_eq!(plan.missing, 0);

    let report = manifest.smoke_orchestrator().unwrap().run().await;
    assert!(report.ok, "{}", report.to_tap());
    assert_eq!(report.name, "library");
    // agent count plus one check per agent
    assert_eq!(report.outcomes[0].assertion_count(), 3);
}

/// Test: smoke run fails with the missing path in the reason
#[tokio::test]
async fn test_manifest_smoke_missing_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = SuiteManifest::from_toml_str(
        "name = \"broken\"\nagents = [[[\"workdir/nope.happ\"]]]\n",
        dir.path(),
    )
    .unwrap();

    assert_eq!(manifest.plan().unwrap().missing, 1);

    let report = manifest.smoke_orchestrator().unwrap().run().await;
    assert!(!report.ok);
    let reason = report.outcomes[0].failure.as_deref().unwrap();
    assert!(reason.contains("nope.happ"), "got: {reason}");
}
