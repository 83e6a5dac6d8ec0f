//! TAP 13 parsing and a diff-style reporter.
//!
//! [`TapParser`] turns a TAP stream into [`TapEvent`]s. [`DiffReporter`]
//! renders those events for a terminal and tracks whether the run failed,
//! from which [`exit_code`] derives the process status.

pub mod diff;
pub mod error;
pub mod parser;
pub mod reporter;
pub mod style;

pub use error::{Result, TapError};
pub use parser::{parse, Directive, FinalResults, Plan, TapEvent, TapParser, TestPoint};
pub use reporter::{exit_code, DiffReporter};
pub use style::Style;
