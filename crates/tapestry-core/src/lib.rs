//! Tapestry Core
//!
//! Declarative scenario harness for multi-agent test networks:
//! - locate compiled bundles relative to a test module
//! - describe which agents install which bundles
//! - register named scenarios and run them against fresh networks
//! - collect pass/fail results and emit TAP

pub mod artifact;
pub mod bundle;
pub mod config;
pub mod error;
pub mod install;
pub mod ledger;
pub mod manifest;
pub mod metrics;
pub mod network;
pub mod obs;
pub mod orchestrator;
pub mod scenario;
pub mod suite;
pub mod tap;
pub mod telemetry;

pub use artifact::{ArtifactLocator, ArtifactPath};
pub use bundle::{Bundle, BundleManifest, DnaManifest};
pub use config::{ExecutionMode, HarnessConfig, NetworkConfig, Transport};
pub use error::{HarnessError, Result};
pub use install::{AgentSlot, AppGroup, InstallDescriptor};
pub use ledger::{AgentKey, EntryHash, LedgerEntry, Link, SharedLedger};
pub use manifest::{InstallPlan, PlannedAgent, PlannedArtifact, SuiteManifest};
pub use metrics::METRICS;
pub use network::{InstalledApp, Network, Player};
pub use orchestrator::{Orchestrator, RunReport, ScenarioOutcome};
pub use scenario::{
    Assertion, Completion, Diagnostic, Registrar, ScenarioFn, ScenarioRegistration, Signal, Tape,
    TapeLine,
};
pub use suite::{Suite, SuiteReport};
pub use tap::TapWriter;
pub use telemetry::init_tracing;

/// Tapestry version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
