//! Entry point: runs every demo suite the way a test runner would.

use std::path::Path;

use tapestry_core::{HarnessConfig, Orchestrator, SuiteManifest};
use tapestry_suites::{session3, suite, tragedy_commons};
use tapestry_tap::{DiffReporter, Style};

/// Test: both suites pass and the TAP stream reports exit 0
#[tokio::test]
async fn test_all_suites_pass() {
    let report = suite(HarnessConfig::default()).run().await;
    let tap = report.to_tap();
    assert!(report.ok, "{tap}");
    assert_eq!(report.runs.len(), 2);
    assert_eq!(report.count, 7);

    let mut reporter = DiffReporter::new(Vec::new(), Style::plain());
    let results = reporter.run(tap.as_bytes()).unwrap();
    assert_eq!(results.count, 7);
    assert_eq!(reporter.exit_code(0), 0);
}

/// Test: modules appear in registration order in the TAP document
#[tokio::test]
async fn test_module_order() {
    let tap = suite(HarnessConfig::default()).run().await.to_tap();
    let session3_at = tap.find("# session3").unwrap();
    let tragedy_at = tap.find("# tragedy_commons").unwrap();
    assert!(session3_at < tragedy_at);
    assert!(tap.contains("ok 4 - game code anchor is shared"));
}

/// Test: the same suites pass when scenarios run concurrently
#[tokio::test]
async fn test_all_suites_pass_in_parallel() {
    let report = suite(HarnessConfig::default().parallel()).run().await;
    assert!(report.ok, "{}", report.to_tap());
}

/// Test: registering a suite twice runs every scenario twice
#[tokio::test]
async fn test_registrar_is_additive() {
    let mut orchestrator = Orchestrator::named("twice", HarnessConfig::default());
    orchestrator.register(&tragedy_commons::register);
    orchestrator.register(&tragedy_commons::register);
    orchestrator.register(&session3::register);
    assert_eq!(orchestrator.len(), 11);

    let report = orchestrator.run().await;
    assert!(report.ok, "{}", report.to_tap());
    assert_eq!(report.pass, 11);
}

/// Test: the crate's manifest resolves to the fixture bundles
#[tokio::test]
async fn test_manifest_smoke() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("suite.toml");
    let manifest = SuiteManifest::load(&path).unwrap();
    assert_eq!(manifest.plan().unwrap().missing, 0);

    let report = manifest.smoke_orchestrator().unwrap().run().await;
    assert!(report.ok, "{}", report.to_tap());
}
