//! Scenario registration, assertions and the completion signal.

use std::fmt::{self, Debug, Display};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::metrics::METRICS;
use crate::network::Network;
use crate::orchestrator::Orchestrator;

/// Expected/actual detail attached to a failed assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub operator: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub ok: bool,
    pub name: String,
    pub diagnostic: Option<Diagnostic>,
}

/// One line of scenario output, in the order it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TapeLine {
    Assert(Assertion),
    Comment { text: String },
}

/// Assertion recorder shared by a scenario and any tasks it spawns.
#[derive(Debug, Clone, Default)]
pub struct Tape {
    lines: Arc<Mutex<Vec<TapeLine>>>,
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `cond` under `name`; returns `cond`.
    pub fn ok(&self, cond: bool, name: impl Into<String>) -> bool {
        let diagnostic = (!cond).then(|| Diagnostic {
            operator: "ok".to_string(),
            expected: "true".to_string(),
            actual: "false".to_string(),
        });
        self.record(cond, name.into(), diagnostic)
    }

    pub fn not_ok(&self, cond: bool, name: impl Into<String>) -> bool {
        let diagnostic = cond.then(|| Diagnostic {
            operator: "notOk".to_string(),
            expected: "false".to_string(),
            actual: "true".to_string(),
        });
        self.record(!cond, name.into(), diagnostic)
    }

    /// Compare with `==`; the diagnostic carries both `Debug` renderings.
    pub fn equal<T>(&self, actual: T, expected: T, name: impl Into<String>) -> bool
    where
        T: PartialEq + Debug,
    {
        let ok = actual == expected;
        let diagnostic = (!ok).then(|| Diagnostic {
            operator: "equal".to_string(),
            expected: format!("{expected:#?}"),
            actual: format!("{actual:#?}"),
        });
        self.record(ok, name.into(), diagnostic)
    }

    pub fn pass(&self, name: impl Into<String>) {
        self.record(true, name.into(), None);
    }

    pub fn fail(&self, name: impl Into<String>) {
        self.record(
            false,
            name.into(),
            Some(Diagnostic {
                operator: "fail".to_string(),
                expected: String::new(),
                actual: String::new(),
            }),
        );
    }

    pub fn comment(&self, text: impl Into<String>) {
        self.lock().push(TapeLine::Comment { text: text.into() });
    }

    pub fn lines(&self) -> Vec<TapeLine> {
        self.lock().clone()
    }

    pub fn assertions(&self) -> Vec<Assertion> {
        self.lock()
            .iter()
            .filter_map(|line| match line {
                TapeLine::Assert(a) => Some(a.clone()),
                TapeLine::Comment { .. } => None,
            })
            .collect()
    }

    pub fn failed_count(&self) -> usize {
        self.assertions().iter().filter(|a| !a.ok).count()
    }

    fn record(&self, ok: bool, name: String, diagnostic: Option<Diagnostic>) -> bool {
        if ok {
            METRICS.inc_assertions_passed();
        } else {
            METRICS.inc_assertions_failed();
        }
        self.lock().push(TapeLine::Assert(Assertion {
            ok,
            name,
            diagnostic,
        }));
        ok
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TapeLine>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What a scenario reported through its [`Completion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Signal {
    Done,
    Failed(String),
}

/// One-shot completion signal handed to every scenario.
///
/// Signalling consumes the value, so a scenario can signal at most once.
/// Dropping it without signalling fails the scenario.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Signal>,
}

impl Completion {
    pub(crate) fn pair() -> (Self, oneshot::Receiver<Signal>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn done(self) {
        self.send(Signal::Done);
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.send(Signal::Failed(reason.into()));
    }

    /// Signal from a result: `Ok` is done, `Err` fails with its message.
    pub fn finish<E: Display>(self, result: std::result::Result<(), E>) {
        match result {
            Ok(()) => self.done(),
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn send(self, signal: Signal) {
        // The receiver is gone only once the orchestrator gave up waiting.
        if self.tx.send(signal).is_err() {
            tracing::debug!("completion signalled after the scenario was abandoned");
        }
    }
}

/// Boxed scenario body.
pub type ScenarioFn = Arc<dyn Fn(Network, Tape, Completion) -> BoxFuture<'static, ()> + Send + Sync>;

/// A named scenario waiting to be run.
#[derive(Clone)]
pub struct ScenarioRegistration {
    pub name: String,
    pub(crate) func: ScenarioFn,
}

impl ScenarioRegistration {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Network, Tape, Completion) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(move |network, tape, done| Box::pin(f(network, tape, done))),
        }
    }
}

impl fmt::Debug for ScenarioRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioRegistration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Attaches a module's scenarios to an orchestrator.
///
/// Registration is additive; registering twice attaches both sets.
pub trait Registrar {
    fn register(&self, orchestrator: &mut Orchestrator);
}

impl<F> Registrar for F
where
    F: Fn(&mut Orchestrator),
{
    fn register(&self, orchestrator: &mut Orchestrator) {
        self(orchestrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tape_records_in_order() {
        let tape = Tape::new();
        assert!(tape.ok(true, "first"));
        tape.comment("between");
        assert!(!tape.equal(1, 2, "second"));
        tape.pass("third");

        let lines = tape.lines();
        assert_eq!(lines.len(), 4);
        assert!(matches!(&lines[1], TapeLine::Comment { text } if text == "between"));
        let asserts = tape.assertions();
        assert_eq!(asserts.len(), 3);
        assert_eq!(tape.failed_count(), 1);
        let diag = asserts[1].diagnostic.as_ref().unwrap();
        assert_eq!(diag.expected, "2");
        assert_eq!(diag.actual, "1");
    }

    #[test]
    fn test_tape_clones_share_state() {
        let tape = Tape::new();
        let other = tape.clone();
        other.fail("from clone");
        assert_eq!(tape.failed_count(), 1);
    }

    #[test]
    fn test_not_ok() {
        let tape = Tape::new();
        assert!(tape.not_ok(false, "falsy"));
        assert!(!tape.not_ok(true, "truthy"));
        assert_eq!(tape.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_completion_delivers_signal() {
        let (done, rx) = Completion::pair();
        done.fail("boom");
        assert_eq!(rx.await.unwrap(), Signal::Failed("boom".to_string()));
    }

    #[tokio::test]
    async fn test_completion_finish_from_result() {
        let (done, rx) = Completion::pair();
        done.finish::<String>(Ok(()));
        assert_eq!(rx.await.unwrap(), Signal::Done);

        let (done, rx) = Completion::pair();
        done.finish(Err("bad"));
        assert_eq!(rx.await.unwrap(), Signal::Failed("bad".to_string()));
    }

    #[tokio::test]
    async fn test_dropped_completion_closes_channel() {
        let (done, rx) = Completion::pair();
        drop(done);
        assert!(rx.await.is_err());
    }
}
