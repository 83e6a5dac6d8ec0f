//! Test entry point: one orchestrator per module, run in order.

use serde::{Deserialize, Serialize};

use crate::orchestrator::{Orchestrator, RunReport};
use crate::tap::TapWriter;

/// Ordered collection of orchestrators.
#[derive(Default)]
pub struct Suite {
    modules: Vec<Orchestrator>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, orchestrator: Orchestrator) -> Self {
        self.modules.push(orchestrator);
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Run each module sequentially in insertion order. Scheduling inside a
    /// module follows that orchestrator's own config.
    pub async fn run(self) -> SuiteReport {
        let mut runs = Vec::with_capacity(self.modules.len());
        for orchestrator in self.modules {
            runs.push(orchestrator.run().await);
        }
        SuiteReport::new(runs)
    }
}

/// Results of every module in a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub runs: Vec<RunReport>,
    pub count: usize,
    pub pass: usize,
    pub fail: usize,
    pub ok: bool,
}

impl SuiteReport {
    fn new(runs: Vec<RunReport>) -> Self {
        let count = runs.iter().map(|r| r.count).sum();
        let pass = runs.iter().map(|r| r.pass).sum();
        let fail = runs.iter().map(|r| r.fail).sum();
        Self {
            runs,
            count,
            pass,
            fail,
            ok: fail == 0,
        }
    }

    /// One TAP document; each module opens with a comment naming it and
    /// scenario numbering runs across modules.
    pub fn to_tap(&self) -> String {
        let mut writer = TapWriter::new();
        for run in &self.runs {
            writer.comment(&run.name);
            for outcome in &run.outcomes {
                writer.scenario(outcome);
            }
        }
        writer.finish()
    }

    pub fn exit_code(&self) -> i32 {
        if self.ok {
            0
        } else {
            1
        }
    }
}
