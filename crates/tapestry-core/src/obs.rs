//! Structured observability hooks for scenario runs.
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`); failures
//! at `warn!`. Scenario work runs inside [`scenario_span`] so everything a
//! scenario logs carries its name.

use tracing::{info, warn};

/// Span wrapping one scenario's execution.
pub fn scenario_span(scenario: &str) -> tracing::Span {
    tracing::info_span!("tapestry.scenario", scenario = %scenario)
}

pub fn emit_run_started(run_id: &str, orchestrator: &str, scenarios: usize) {
    info!(event = "run.started", run_id = %run_id, orchestrator = %orchestrator, scenarios = scenarios);
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, pass: usize, fail: usize, ok: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        pass = pass,
        fail = fail,
        ok = ok,
    );
}

pub fn emit_scenario_started(scenario: &str) {
    info!(event = "scenario.started", scenario = %scenario);
}

pub fn emit_scenario_finished(scenario: &str, duration_ms: u64, players: usize, passed: bool) {
    info!(
        event = "scenario.finished",
        scenario = %scenario,
        duration_ms = duration_ms,
        players = players,
        passed = passed,
    );
}

pub fn emit_scenario_failure(scenario: &str, reason: &str) {
    warn!(event = "scenario.failed", scenario = %scenario, reason = %reason);
}

pub fn emit_network_spawned(scenario: &str, seed: &str, spawned: usize, total: usize) {
    info!(
        event = "network.spawned",
        scenario = %scenario,
        seed = %seed,
        spawned = spawned,
        total_players = total,
    );
}

pub fn emit_bundle_installed(agent: &str, bundle: &str, digest: &str) {
    info!(
        event = "bundle.installed",
        agent = %agent,
        bundle = %bundle,
        digest = %&digest[..12.min(digest.len())],
    );
}
