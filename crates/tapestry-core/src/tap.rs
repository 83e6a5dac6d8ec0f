//! TAP 13 emission.
//!
//! Each scenario is written as an indented subtest followed by a single
//! top-level assert summarising it, the way node-tap nests subtests:
//!
//! ```text
//! TAP version 13
//! # session3
//! # Subtest: alice creates a post
//!     ok 1 - post hash returned
//!     1..1
//! ok 1 - alice creates a post # time=3ms
//! 1..1
//! ```

use serde::Serialize;

use crate::orchestrator::ScenarioOutcome;
use crate::scenario::{Assertion, TapeLine};

const INDENT: &str = "    ";

/// Incrementally builds one TAP document.
#[derive(Debug)]
pub struct TapWriter {
    out: String,
    next_id: usize,
}

impl Default for TapWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TapWriter {
    pub fn new() -> Self {
        Self {
            out: "TAP version 13\n".to_string(),
            next_id: 1,
        }
    }

    /// Top-level comment. Multi-line text becomes one comment per line.
    pub fn comment(&mut self, text: &str) {
        for line in text.lines() {
            self.out.push_str("# ");
            self.out.push_str(line);
            self.out.push('\n');
        }
    }

    /// Write a scenario as a subtest plus its summary assert.
    pub fn scenario(&mut self, outcome: &ScenarioOutcome) {
        self.out.push_str(&format!("# Subtest: {}\n", single_line(&outcome.name)));

        let mut child_id = 1;
        for line in &outcome.lines {
            match line {
                TapeLine::Assert(assertion) => {
                    write_assert(&mut self.out, INDENT, child_id, assertion);
                    child_id += 1;
                }
                TapeLine::Comment { text } => {
                    for l in text.lines() {
                        self.out.push_str(&format!("{INDENT}# {l}\n"));
                    }
                }
            }
        }
        if let Some(reason) = &outcome.failure {
            write_assert(
                &mut self.out,
                INDENT,
                child_id,
                &Assertion {
                    ok: false,
                    name: reason.clone(),
                    diagnostic: None,
                },
            );
            child_id += 1;
        }
        self.out.push_str(&format!("{INDENT}1..{}\n", child_id - 1));

        let status = if outcome.passed() { "ok" } else { "not ok" };
        self.out.push_str(&format!(
            "{status} {} - {} # time={}ms\n",
            self.next_id,
            single_line(&outcome.name),
            outcome.duration_ms
        ));
        if let Some(reason) = &outcome.failure {
            write_yaml(&mut self.out, "  ", &FailureDiag { reason });
        }
        self.next_id += 1;
    }

    /// Close the document with its plan.
    pub fn finish(mut self) -> String {
        self.out.push_str(&format!("1..{}\n", self.next_id - 1));
        self.out
    }
}

fn write_assert(out: &mut String, indent: &str, id: usize, assertion: &Assertion) {
    let status = if assertion.ok { "ok" } else { "not ok" };
    out.push_str(&format!(
        "{indent}{status} {id} - {}\n",
        single_line(&assertion.name)
    ));
    if let Some(diag) = &assertion.diagnostic {
        let yaml_indent = format!("{indent}  ");
        write_yaml(out, &yaml_indent, diag);
    }
}

#[derive(Serialize)]
struct FailureDiag<'a> {
    reason: &'a str,
}

/// Indented `---` .. `...` block around the YAML rendering of `diag`.
fn write_yaml<T: Serialize>(out: &mut String, indent: &str, diag: &T) {
    let body = match serde_yaml::to_string(diag) {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize TAP diagnostics");
            return;
        }
    };
    out.push_str(&format!("{indent}---\n"));
    for line in body.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!("{indent}{line}\n"));
        }
    }
    out.push_str(&format!("{indent}...\n"));
}

/// Names must stay on one line and must not open a directive.
fn single_line(text: &str) -> String {
    text.replace(['\n', '\r'], " ").replace('#', "\\#")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Diagnostic;

    fn passing(name: &str) -> ScenarioOutcome {
        ScenarioOutcome {
            name: name.to_string(),
            lines: vec![TapeLine::Assert(Assertion {
                ok: true,
                name: "works".to_string(),
                diagnostic: None,
            })],
            failure: None,
            duration_ms: 2,
        }
    }

    #[test]
    fn test_empty_document() {
        let tap = TapWriter::new().finish();
        assert_eq!(tap, "TAP version 13\n1..0\n");
    }

    #[test]
    fn test_passing_scenario_layout() {
        let mut writer = TapWriter::new();
        writer.scenario(&passing("alpha"));
        let tap = writer.finish();
        assert_eq!(
            tap,
            "TAP version 13\n# Subtest: alpha\n    ok 1 - works\n    1..1\nok 1 - alpha # time=2ms\n1..1\n"
        );
    }

    #[test]
    fn test_failure_reason_becomes_child_assert_and_diag() {
        let outcome = ScenarioOutcome {
            failure: Some("completion never signalled".to_string()),
            ..passing("beta")
        };
        let mut writer = TapWriter::new();
        writer.scenario(&outcome);
        let tap = writer.finish();
        assert!(tap.contains("    not ok 2 - completion never signalled\n"));
        assert!(tap.contains("    1..2\n"));
        assert!(tap.contains("not ok 1 - beta"));
        assert!(tap.contains("  reason: completion never signalled\n"));
    }

    #[test]
    fn test_diagnostic_block_is_yaml() {
        let expected = "[\n    \"a\\\"b\",\n]".to_string();
        let outcome = ScenarioOutcome {
            lines: vec![TapeLine::Assert(Assertion {
                ok: false,
                name: "lists".to_string(),
                diagnostic: Some(Diagnostic {
                    operator: "equal".to_string(),
                    expected: expected.clone(),
                    actual: "key: value # tail".to_string(),
                }),
            })],
            ..passing("gamma")
        };
        let mut writer = TapWriter::new();
        writer.scenario(&outcome);
        let tap = writer.finish();

        let block: Vec<&str> = tap
            .lines()
            .skip_while(|l| *l != "      ---")
            .skip(1)
            .take_while(|l| *l != "      ...")
            .map(|l| l.strip_prefix("      ").unwrap_or(l))
            .collect();
        let diag: Diagnostic = serde_yaml::from_str(&block.join("\n")).unwrap();
        assert_eq!(diag.operator, "equal");
        assert_eq!(diag.expected, expected);
        assert_eq!(diag.actual, "key: value # tail");
    }

    #[test]
    fn test_names_are_sanitised() {
        let mut writer = TapWriter::new();
        writer.scenario(&passing("two\nlines # not a directive"));
        let tap = writer.finish();
        assert!(tap.contains("ok 1 - two lines \\# not a directive # time=2ms"));
    }
}
