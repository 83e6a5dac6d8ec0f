//! Scenario orchestration and run results.

use std::any::Any;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{ExecutionMode, HarnessConfig};
use crate::metrics::METRICS;
use crate::network::Network;
use crate::obs;
use crate::scenario::{Completion, Registrar, ScenarioRegistration, Signal, Tape, TapeLine};
use crate::tap::TapWriter;

/// Result of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    /// Assertions and comments in recording order.
    pub lines: Vec<TapeLine>,
    /// Why the scenario failed apart from assertions: a failure signal,
    /// a panic, a timeout or a dropped completion.
    pub failure: Option<String>,
    pub duration_ms: u64,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.failure.is_none() && self.failed_assertions() == 0
    }

    pub fn assertion_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, TapeLine::Assert(_)))
            .count()
    }

    pub fn failed_assertions(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, TapeLine::Assert(a) if !a.ok))
            .count()
    }
}

/// Aggregate result of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<ScenarioOutcome>,
    pub count: usize,
    pub pass: usize,
    pub fail: usize,
    pub ok: bool,
    pub duration_ms: u64,
}

impl RunReport {
    fn new(
        run_id: String,
        name: String,
        started_at: DateTime<Utc>,
        outcomes: Vec<ScenarioOutcome>,
        duration_ms: u64,
    ) -> Self {
        let count = outcomes.len();
        let pass = outcomes.iter().filter(|o| o.passed()).count();
        let fail = count - pass;
        Self {
            run_id,
            name,
            started_at,
            outcomes,
            count,
            pass,
            fail,
            ok: fail == 0,
            duration_ms,
        }
    }

    /// Standalone TAP document for this run.
    pub fn to_tap(&self) -> String {
        let mut writer = TapWriter::new();
        writer.comment(&self.name);
        for outcome in &self.outcomes {
            writer.scenario(outcome);
        }
        writer.finish()
    }

    /// `0` when every scenario passed, else `1`.
    pub fn exit_code(&self) -> i32 {
        if self.ok {
            0
        } else {
            1
        }
    }
}

/// Collects scenarios and runs each against a fresh network.
pub struct Orchestrator {
    name: String,
    config: HarnessConfig,
    scenarios: Vec<ScenarioRegistration>,
}

impl Orchestrator {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            name: "scenarios".to_string(),
            config,
            scenarios: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>, config: HarnessConfig) -> Self {
        Self {
            name: name.into(),
            ..Self::new(config)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Attach a scenario. Names need not be unique; nothing is replaced.
    pub fn register_scenario<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(Network, Tape, Completion) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.scenarios.push(ScenarioRegistration::new(name, f));
        self
    }

    /// Run a registrar against this orchestrator.
    pub fn register<R: Registrar + ?Sized>(&mut self, registrar: &R) -> &mut Self {
        registrar.register(self);
        self
    }

    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Run every registered scenario, consuming the registrations.
    ///
    /// Outcomes are reported in registration order in both execution modes.
    pub async fn run(self) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();
        let timeout = self.config.timeout();

        obs::emit_run_started(&run_id, &self.name, self.scenarios.len());

        let outcomes = match self.config.mode {
            ExecutionMode::Sequential => {
                let mut outcomes = Vec::with_capacity(self.scenarios.len());
                for registration in self.scenarios {
                    outcomes.push(run_scenario(registration, timeout).await);
                }
                outcomes
            }
            ExecutionMode::Parallel => {
                join_all(
                    self.scenarios
                        .into_iter()
                        .map(|registration| run_scenario(registration, timeout)),
                )
                .await
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let report = RunReport::new(run_id, self.name, started_at, outcomes, duration_ms);
        obs::emit_run_finished(
            &report.run_id,
            report.duration_ms,
            report.pass,
            report.fail,
            report.ok,
        );
        METRICS.flush();
        report
    }
}

async fn run_scenario(registration: ScenarioRegistration, timeout: Option<Duration>) -> ScenarioOutcome {
    let span = obs::scenario_span(&registration.name);
    execute(registration, timeout).instrument(span).await
}

async fn execute(registration: ScenarioRegistration, timeout: Option<Duration>) -> ScenarioOutcome {
    let start = Instant::now();
    let ScenarioRegistration { name, func } = registration;
    obs::emit_scenario_started(&name);
    METRICS.inc_scenarios_run();

    let network = Network::new(name.clone());
    let tape = Tape::new();
    let (completion, signal_rx) = Completion::pair();
    let mut handle = tokio::spawn(func(network.clone(), tape.clone(), completion));
    // One deadline covers both the signal and, after a dropped completion,
    // the task itself.
    let deadline = timeout.map(|limit| tokio::time::Instant::now() + limit);

    let waited = match deadline {
        Some(at) => tokio::time::timeout_at(at, signal_rx).await,
        None => Ok(signal_rx.await),
    };

    let failure = match waited {
        Ok(Ok(Signal::Done)) => {
            handle.abort();
            None
        }
        Ok(Ok(Signal::Failed(reason))) => {
            handle.abort();
            Some(reason)
        }
        Ok(Err(_)) => {
            let joined = match deadline {
                Some(at) => tokio::time::timeout_at(at, &mut handle).await.ok(),
                None => Some((&mut handle).await),
            };
            match joined {
                Some(Err(join_err)) if join_err.is_panic() => Some(format!(
                    "scenario panicked: {}",
                    panic_message(join_err.into_panic())
                )),
                Some(_) => Some("completion never signalled".to_string()),
                None => {
                    handle.abort();
                    Some(format!(
                        "completion never signalled; task still running after {}s",
                        timeout.map(|d| d.as_secs()).unwrap_or_default()
                    ))
                }
            }
        }
        Err(_) => {
            handle.abort();
            Some(format!(
                "timed out after {}s waiting for completion",
                timeout.map(|d| d.as_secs()).unwrap_or_default()
            ))
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let players = network.all_players().len();
    drop(network);

    let outcome = ScenarioOutcome {
        name,
        lines: tape.lines(),
        failure,
        duration_ms,
    };
    if let Some(reason) = &outcome.failure {
        obs::emit_scenario_failure(&outcome.name, reason);
    }
    obs::emit_scenario_finished(&outcome.name, duration_ms, players, outcome.passed());
    outcome
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
