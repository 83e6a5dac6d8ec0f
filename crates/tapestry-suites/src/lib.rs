//! Demo suites for the Tapestry harness.
//!
//! Each suite is a registrar: a function that attaches named scenarios to
//! an orchestrator. [`suite`] is the entry point that builds one
//! orchestrator per suite, in the order they are run.

pub mod fixture;
pub mod session3;
pub mod tragedy_commons;

use tapestry_core::{HarnessConfig, Orchestrator, Suite};

/// Every demo suite, one module per suite.
pub fn suite(config: HarnessConfig) -> Suite {
    let mut exercises = Orchestrator::named("session3", config.clone());
    exercises.register(&session3::register);

    let mut game = Orchestrator::named("tragedy_commons", config);
    game.register(&tragedy_commons::register);

    Suite::new().module(exercises).module(game)
}
