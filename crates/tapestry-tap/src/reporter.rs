//! Human-oriented rendering of a TAP stream.
//!
//! Comments become section headers, subtests are listed with their
//! asserts nested underneath, failing asserts show a line diff of their
//! `expected` and `actual` diagnostics, and a summary closes the report.
//! The reporter remembers whether anything failed so the caller can derive
//! a process exit status.

use std::io::{BufRead, Write};
use std::time::Instant;

use crate::diff::{line_diff, DiffLine};
use crate::error::{Result, TapError};
use crate::parser::{FinalResults, TapEvent, TapParser, TestPoint};
use crate::style::Style;

const PASS_MARK: &str = "✔";
const FAIL_MARK: &str = "✖";
const TODO_MARK: &str = "○";

/// Diagnostic keys rendered specially rather than listed.
const DIFF_KEYS: [&str; 3] = ["operator", "expected", "actual"];

pub struct DiffReporter<W: Write> {
    out: W,
    style: Style,
    failed: bool,
    started: Instant,
    last_child: Option<String>,
    results: Option<FinalResults>,
}

impl<W: Write> DiffReporter<W> {
    pub fn new(out: W, style: Style) -> Self {
        Self {
            out,
            style,
            failed: false,
            started: Instant::now(),
            last_child: None,
            results: None,
        }
    }

    /// Parse `input` line by line, rendering events as they arrive.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<&FinalResults> {
        let mut parser = TapParser::new();
        for line in input.lines() {
            let line = line.map_err(TapError::Read)?;
            for event in parser.feed(&line) {
                self.handle(&event)?;
            }
        }
        for event in parser.finish() {
            self.handle(&event)?;
        }
        self.out.flush().map_err(TapError::Write)?;
        self.results
            .as_ref()
            .ok_or_else(|| TapError::Read(std::io::Error::other("stream produced no results")))
    }

    /// Render one top-level event.
    pub fn handle(&mut self, event: &TapEvent) -> Result<()> {
        self.render(event, 0)
    }

    /// True once any assert failed, the stream bailed out, a subtest was
    /// not ok, or the final results were not ok.
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn results(&self) -> Option<&FinalResults> {
        self.results.as_ref()
    }

    pub fn exit_code(&self, parent_status: i32) -> i32 {
        exit_code(self.failed, parent_status)
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, event: &TapEvent, depth: usize) -> Result<()> {
        match event {
            TapEvent::Version { .. } | TapEvent::Plan { .. } => Ok(()),
            TapEvent::Comment { text } => {
                if depth == 0 {
                    self.blank()?;
                    let header = self.style.bold(text);
                    self.line(depth, &header)?;
                    self.blank()
                } else {
                    let text = self.style.dim(text);
                    self.line(depth, &text)
                }
            }
            TapEvent::Child {
                name,
                events,
                results,
            } => {
                // A subtest can fail without a failing assert, e.g. no plan.
                if !results.ok {
                    self.failed = true;
                }
                let mark = if results.ok {
                    self.style.green(PASS_MARK)
                } else {
                    self.style.red(FAIL_MARK)
                };
                if !name.is_empty() {
                    self.line(depth, &format!("{mark} {name}"))?;
                }
                for child_event in events {
                    self.render(child_event, depth + 1)?;
                }
                if depth == 0 {
                    self.last_child = Some(name.clone());
                }
                Ok(())
            }
            TapEvent::Assert(point) => {
                if point.is_failure() {
                    self.failed = true;
                }
                // The summary assert after a subtest repeats the subtest.
                let summary = depth == 0 && self.last_child.take().is_some_and(|n| n == point.name);
                if summary && point.ok {
                    return Ok(());
                }
                self.assert(point, depth, summary)
            }
            TapEvent::Extra { line } => {
                let line = self.style.dim(line);
                self.line(depth, &line)
            }
            TapEvent::Bailout { reason } => {
                self.failed = true;
                let text = self.style.bold(&self.style.red(&format!("Bail out! {reason}")));
                self.line(depth, &text)
            }
            TapEvent::Complete(results) => {
                if !results.ok {
                    self.failed = true;
                }
                self.summary(results)?;
                self.results = Some(results.clone());
                Ok(())
            }
        }
    }

    fn assert(&mut self, point: &TestPoint, depth: usize, summary: bool) -> Result<()> {
        if point.is_todo() {
            let text = self.style.yellow(&format!("{TODO_MARK} {} # TODO", point.name));
            return self.line(depth, &text);
        }
        if point.ok {
            let mark = self.style.green(PASS_MARK);
            let name = self.style.dim(&point.name);
            let skip = if point.is_skip() {
                format!(" {}", self.style.yellow("# SKIP"))
            } else {
                String::new()
            };
            return self.line(depth, &format!("{mark} {name}{skip}"));
        }

        if !summary {
            let text = self.style.red(&format!("{FAIL_MARK} {}", point.name));
            self.line(depth, &text)?;
        }
        self.diagnostics(point, depth + 1)
    }

    fn diagnostics(&mut self, point: &TestPoint, depth: usize) -> Result<()> {
        if let (Some(expected), Some(actual)) = (point.expected(), point.actual()) {
            if let Some(operator) = point.diag.get("operator") {
                let text = self.style.dim(&format!("operator: {operator}"));
                self.line(depth, &text)?;
            }
            let legend = format!(
                "{} {}",
                self.style.green("- expected"),
                self.style.red("+ actual")
            );
            self.line(depth, &legend)?;
            self.blank()?;
            for diff_line in line_diff(expected, actual) {
                let text = match diff_line {
                    DiffLine::Same(l) => self.style.dim(&format!("  {l}")),
                    DiffLine::Expected(l) => self.style.green(&format!("- {l}")),
                    DiffLine::Actual(l) => self.style.red(&format!("+ {l}")),
                };
                self.line(depth, &text)?;
            }
            self.blank()?;
        }
        for (key, value) in &point.diag {
            if DIFF_KEYS.contains(&key.as_str()) {
                continue;
            }
            for (i, l) in value.lines().enumerate() {
                let text = if i == 0 {
                    format!("{key}: {l}")
                } else {
                    format!("  {l}")
                };
                let text = self.style.dim(&text);
                self.line(depth, &text)?;
            }
        }
        Ok(())
    }

    fn summary(&mut self, results: &FinalResults) -> Result<()> {
        let elapsed_ms = self.started.elapsed().as_millis();
        self.blank()?;

        let passed = self.style.green(&format!("passed: {}", results.pass));
        let failed = if results.fail > 0 {
            self.style.red(&format!("failed: {}", results.fail))
        } else {
            format!("failed: {}", results.fail)
        };
        let mut counts = format!("{passed}  {failed}");
        if results.todo > 0 {
            counts.push_str(&format!("  todo: {}", results.todo));
        }
        if results.skip > 0 {
            counts.push_str(&format!("  skipped: {}", results.skip));
        }
        let totals = self.style.dim(&format!("of {} tests  ({elapsed_ms}ms)", results.count));
        self.line(0, &format!("{counts}  {totals}"))?;

        if results.bailout.is_none() && !results.plan_satisfied() {
            let text = match results.plan {
                Some(plan) => format!(
                    "plan mismatch: expected {} tests, saw {}",
                    plan.expected_count(),
                    results.count
                ),
                None => "no plan found".to_string(),
            };
            let text = self.style.red(&text);
            self.line(0, &text)?;
        }

        if !results.failures.is_empty() {
            self.blank()?;
            let header = self.style.bold("Failed tests:");
            self.line(0, &header)?;
            for failure in &results.failures {
                let text = self.style.red(&format!("{FAIL_MARK} {}", failure.name));
                self.line(1, &text)?;
            }
        }
        tracing::debug!(
            pass = results.pass,
            fail = results.fail,
            count = results.count,
            elapsed_ms = elapsed_ms as u64,
            "report rendered"
        );
        Ok(())
    }

    fn line(&mut self, depth: usize, text: &str) -> Result<()> {
        let indent = "  ".repeat(depth + 1);
        writeln!(self.out, "{indent}{text}").map_err(TapError::Write)
    }

    fn blank(&mut self) -> Result<()> {
        writeln!(self.out).map_err(TapError::Write)
    }
}

/// 1 when the report saw a failure or the parent process already failed.
pub fn exit_code(failed: bool, parent_status: i32) -> i32 {
    if failed || parent_status != 0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(input: &str) -> (String, bool) {
        let mut reporter = DiffReporter::new(Vec::new(), Style::plain());
        reporter.run(input.as_bytes()).unwrap();
        let failed = reporter.failed();
        (String::from_utf8(reporter.into_inner()).unwrap(), failed)
    }

    #[test]
    fn test_exit_code_rules() {
        assert_eq!(exit_code(false, 0), 0);
        assert_eq!(exit_code(true, 0), 1);
        assert_eq!(exit_code(false, 1), 1);
    }

    #[test]
    fn test_passing_stream() {
        let (out, failed) = render("TAP version 13\n# session3\nok 1 - works\n1..1\n");
        assert!(!failed);
        assert!(out.contains("  session3\n"));
        assert!(out.contains("✔ works"));
        assert!(out.contains("passed: 1  failed: 0  of 1 tests"));
    }

    #[test]
    fn test_failure_shows_diff() {
        let input = "\
not ok 1 - names match
  ---
  operator: equal
  expected: alice
  actual: bob
  ...
1..1
";
        let (out, failed) = render(input);
        assert!(failed);
        assert!(out.contains("✖ names match"));
        assert!(out.contains("- alice"));
        assert!(out.contains("+ bob"));
        assert!(out.contains("Failed tests:"));
    }

    #[test]
    fn test_summary_assert_after_child_not_repeated() {
        let input = "\
# Subtest: scenario
    ok 1 - inner
    1..1
ok 1 - scenario # time=1ms
1..1
";
        let (out, _) = render(input);
        assert_eq!(out.matches("scenario").count(), 1, "{out}");
        assert!(out.contains("    ✔ inner"));
    }

    #[test]
    fn test_todo_does_not_fail() {
        let (out, failed) = render("not ok 1 - later # TODO\n1..1\n");
        assert!(!failed);
        assert!(out.contains("○ later # TODO"));
    }

    #[test]
    fn test_missing_plan_fails() {
        let (out, failed) = render("ok 1 - lonely\n");
        assert!(failed);
        assert!(out.contains("no plan found"));
    }

    #[test]
    fn test_child_without_plan_fails_report() {
        let input = "\
# Subtest: unplanned
    ok 1 - inner
ok 1 - unplanned # time=1ms
1..1
";
        let (out, failed) = render(input);
        assert!(failed, "{out}");
        assert!(out.contains("✖ unplanned"));
    }
}
