//! Global atomic counters for harness observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event, which the orchestrator does after every run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    scenarios_run: AtomicU64,
    assertions_passed: AtomicU64,
    assertions_failed: AtomicU64,
    bundles_installed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            scenarios_run: AtomicU64::new(0),
            assertions_passed: AtomicU64::new(0),
            assertions_failed: AtomicU64::new(0),
            bundles_installed: AtomicU64::new(0),
        }
    }

    pub fn inc_scenarios_run(&self) {
        self.scenarios_run.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "scenarios_run", "counter incremented");
    }

    pub fn inc_assertions_passed(&self) {
        self.assertions_passed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_assertions_failed(&self) {
        self.assertions_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "assertions_failed", "counter incremented");
    }

    pub fn inc_bundles_installed(&self) {
        self.bundles_installed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "bundles_installed", "counter incremented");
    }

    /// Emit all current counter values as one `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            scenarios_run = self.scenarios_run(),
            assertions_passed = self.assertions_passed(),
            assertions_failed = self.assertions_failed(),
            bundles_installed = self.bundles_installed(),
        );
    }

    pub fn scenarios_run(&self) -> u64 {
        self.scenarios_run.load(Ordering::Relaxed)
    }

    pub fn assertions_passed(&self) -> u64 {
        self.assertions_passed.load(Ordering::Relaxed)
    }

    pub fn assertions_failed(&self) -> u64 {
        self.assertions_failed.load(Ordering::Relaxed)
    }

    pub fn bundles_installed(&self) -> u64 {
        self.bundles_installed.load(Ordering::Relaxed)
    }
}
