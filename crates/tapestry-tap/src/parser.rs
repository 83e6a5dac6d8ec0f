//! Line-oriented TAP 13 parser.
//!
//! Lines go in one at a time and come out as [`TapEvent`]s. An assert is
//! held back until the next line so a following YAML block can attach to
//! it. Subtests are lines indented by four spaces, optionally opened by a
//! `# Subtest: name` comment, and are parsed by a nested parser.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum Directive {
    Todo(String),
    Skip(String),
}

/// One `ok` / `not ok` line with its diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPoint {
    pub ok: bool,
    pub id: Option<usize>,
    pub name: String,
    pub directive: Option<Directive>,
    pub time_ms: Option<f64>,
    pub diag: BTreeMap<String, String>,
}

impl TestPoint {
    pub fn is_todo(&self) -> bool {
        matches!(self.directive, Some(Directive::Todo(_)))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.directive, Some(Directive::Skip(_)))
    }

    /// Failed and not excused by a TODO directive.
    pub fn is_failure(&self) -> bool {
        !self.ok && !self.is_todo()
    }

    pub fn expected(&self) -> Option<&str> {
        self.diag.get("expected").map(String::as_str)
    }

    pub fn actual(&self) -> Option<&str> {
        self.diag.get("actual").map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub start: usize,
    pub end: usize,
}

impl Plan {
    pub fn expected_count(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }
}

/// Totals for one document or subtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinalResults {
    pub ok: bool,
    pub count: usize,
    pub pass: usize,
    pub fail: usize,
    pub todo: usize,
    pub skip: usize,
    pub plan: Option<Plan>,
    pub failures: Vec<TestPoint>,
    pub bailout: Option<String>,
}

impl FinalResults {
    /// Plan present and matching the number of asserts seen.
    pub fn plan_satisfied(&self) -> bool {
        self.plan.is_some_and(|p| p.expected_count() == self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TapEvent {
    Version { version: u32 },
    Plan { plan: Plan, comment: Option<String> },
    Assert(TestPoint),
    Comment { text: String },
    Child {
        name: String,
        events: Vec<TapEvent>,
        results: FinalResults,
    },
    Extra { line: String },
    Bailout { reason: String },
    Complete(FinalResults),
}

#[derive(Debug, Default)]
struct Tally {
    count: usize,
    pass: usize,
    fail: usize,
    todo: usize,
    skip: usize,
    plan: Option<Plan>,
    failures: Vec<TestPoint>,
    bailout: Option<String>,
}

impl Tally {
    fn record(&mut self, point: &TestPoint) {
        self.count += 1;
        if point.ok {
            self.pass += 1;
        }
        if point.is_todo() {
            self.todo += 1;
        }
        if point.is_skip() {
            self.skip += 1;
        }
        if point.is_failure() {
            self.fail += 1;
            self.failures.push(point.clone());
        }
    }

    fn finish(self) -> FinalResults {
        let mut results = FinalResults {
            ok: false,
            count: self.count,
            pass: self.pass,
            fail: self.fail,
            todo: self.todo,
            skip: self.skip,
            plan: self.plan,
            failures: self.failures,
            bailout: self.bailout,
        };
        results.ok = results.fail == 0 && results.bailout.is_none() && results.plan_satisfied();
        results
    }
}

#[derive(Debug)]
struct YamlBlock {
    indent: String,
    lines: Vec<String>,
}

#[derive(Debug)]
struct ChildState {
    name: String,
    parser: TapParser,
    events: Vec<TapEvent>,
    /// Comment text of the `# Subtest:` line that opened this child.
    header: Option<String>,
    fed: bool,
}

/// Streaming TAP parser. Feed lines, then call [`TapParser::finish`].
#[derive(Debug, Default)]
pub struct TapParser {
    tally: Tally,
    pending: Option<TestPoint>,
    yaml: Option<YamlBlock>,
    child: Option<Box<ChildState>>,
    bailed: bool,
}

impl TapParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line (with or without its trailing newline).
    pub fn feed(&mut self, line: &str) -> Vec<TapEvent> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut out = Vec::new();
        if self.bailed {
            return out;
        }

        if let Some(yaml) = self.yaml.as_mut() {
            if line.trim_end() == format!("{}...", yaml.indent) {
                self.close_yaml();
                self.flush_pending(&mut out);
                return out;
            }
            if let Some(rest) = line.strip_prefix(yaml.indent.as_str()) {
                yaml.lines.push(rest.to_string());
                return out;
            }
            if line.trim().is_empty() {
                yaml.lines.push(String::new());
                return out;
            }
            // Unterminated block: keep what was read and carry on.
            self.close_yaml();
        }

        if self.pending.is_some() {
            if let Some(indent) = yaml_open(line) {
                self.yaml = Some(YamlBlock {
                    indent: indent.to_string(),
                    lines: Vec::new(),
                });
                return out;
            }
        }

        if let Some(rest) = line.strip_prefix(INDENT) {
            self.flush_pending(&mut out);
            let child = self
                .child
                .get_or_insert_with(|| Box::new(ChildState::named(String::new())));
            child.fed = true;
            let events = child.parser.feed(rest);
            child.events.extend(events);
            return out;
        }

        self.flush_pending(&mut out);

        if let Some(caps) = subtest_re().captures(line) {
            self.close_child(&mut out);
            let name = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
            let mut child = ChildState::named(name);
            child.header = line.strip_prefix("# ").map(str::to_string);
            self.child = Some(Box::new(child));
            return out;
        }

        self.close_child(&mut out);
        if self.bailed {
            return out;
        }

        if let Some(caps) = version_re().captures(line) {
            if let Ok(version) = caps[1].parse() {
                out.push(TapEvent::Version { version });
                return out;
            }
        }

        if let Some(caps) = plan_re().captures(line) {
            if let (Ok(start), Ok(end)) = (caps[1].parse(), caps[2].parse()) {
                let plan = Plan { start, end };
                self.tally.plan = Some(plan);
                let comment = caps.get(3).map(|m| m.as_str().trim().to_string());
                out.push(TapEvent::Plan { plan, comment });
                return out;
            }
        }

        if let Some(point) = parse_assert(line) {
            self.pending = Some(point);
            return out;
        }

        if let Some(caps) = bailout_re().captures(line) {
            let reason = caps[1].trim().to_string();
            self.tally.bailout = Some(reason.clone());
            self.bailed = true;
            out.push(TapEvent::Bailout { reason });
            return out;
        }

        if let Some(text) = line.strip_prefix('#') {
            out.push(TapEvent::Comment {
                text: text.strip_prefix(' ').unwrap_or(text).to_string(),
            });
            return out;
        }

        if !line.trim().is_empty() {
            out.push(TapEvent::Extra {
                line: line.to_string(),
            });
        }
        out
    }

    /// Flush anything still buffered and emit the final results.
    pub fn finish(mut self) -> Vec<TapEvent> {
        let mut out = Vec::new();
        if self.yaml.is_some() {
            self.close_yaml();
        }
        self.flush_pending(&mut out);
        self.close_child(&mut out);
        let results = self.tally.finish();
        tracing::debug!(
            count = results.count,
            pass = results.pass,
            fail = results.fail,
            ok = results.ok,
            "tap stream complete"
        );
        out.push(TapEvent::Complete(results));
        out
    }

    fn close_yaml(&mut self) {
        if let Some(block) = self.yaml.take() {
            if let Some(point) = self.pending.as_mut() {
                point.diag = parse_yaml(&block.lines);
            }
        }
    }

    fn flush_pending(&mut self, out: &mut Vec<TapEvent>) {
        if let Some(point) = self.pending.take() {
            self.tally.record(&point);
            out.push(TapEvent::Assert(point));
        }
    }

    fn close_child(&mut self, out: &mut Vec<TapEvent>) {
        let Some(child) = self.child.take() else {
            return;
        };
        let ChildState {
            name,
            parser,
            mut events,
            header,
            fed,
        } = *child;
        // A header with no indented lines under it was only a comment.
        if let (false, Some(text)) = (fed, header) {
            out.push(TapEvent::Comment { text });
            return;
        }
        events.extend(parser.finish());
        let results = match events.pop() {
            Some(TapEvent::Complete(results)) => results,
            Some(other) => {
                events.push(other);
                FinalResults::default()
            }
            None => FinalResults::default(),
        };
        if let Some(reason) = &results.bailout {
            self.tally.bailout = Some(reason.clone());
            self.bailed = true;
        }
        out.push(TapEvent::Child {
            name,
            events,
            results,
        });
    }
}

impl ChildState {
    fn named(name: String) -> Self {
        Self {
            name,
            parser: TapParser::new(),
            events: Vec::new(),
            header: None,
            fed: false,
        }
    }
}

/// Parse a complete document.
pub fn parse(input: &str) -> Vec<TapEvent> {
    let mut parser = TapParser::new();
    let mut events: Vec<TapEvent> = input.lines().flat_map(|line| parser.feed(line)).collect();
    events.extend(parser.finish());
    events
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^TAP version (\d+)\s*$").expect("static regex"))
}

fn plan_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)\.\.(\d+)\s*(?:#(.*))?$").expect("static regex")
    })
}

fn assert_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(not )?ok(?:\s+(\d+))?(?:\s+-)?(?:\s+(.*))?$").expect("static regex")
    })
}

fn subtest_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^# Subtest(?::\s*(.*))?$").expect("static regex"))
}

fn bailout_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Bail out!(.*)$").expect("static regex"))
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(todo|skip)\S*\s*(.*)$").expect("static regex"))
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^time=(\d+(?:\.\d+)?)(ms|s)$").expect("static regex"))
}

fn yaml_open(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.trim_end() == "---" && trimmed.len() < line.len() {
        Some(&line[..line.len() - trimmed.len()])
    } else {
        None
    }
}

fn parse_assert(line: &str) -> Option<TestPoint> {
    let caps = assert_re().captures(line)?;
    let ok = caps.get(1).is_none();
    let id = caps.get(2).and_then(|m| m.as_str().parse().ok());
    let description = caps.get(3).map_or("", |m| m.as_str());

    let mut point = TestPoint {
        ok,
        id,
        name: unescape(description.trim()),
        directive: None,
        time_ms: None,
        diag: BTreeMap::new(),
    };

    if let Some(hash) = unescaped_hash(description) {
        let name = unescape(description[..hash].trim());
        let tail = description[hash + 1..].trim();
        if let Some(caps) = directive_re().captures(tail) {
            let reason = caps[2].trim().to_string();
            point.directive = Some(if caps[1].eq_ignore_ascii_case("todo") {
                Directive::Todo(reason)
            } else {
                Directive::Skip(reason)
            });
            point.name = name;
        } else if let Some(caps) = time_re().captures(tail) {
            let value: f64 = caps[1].parse().unwrap_or_default();
            point.time_ms = Some(if &caps[2] == "s" { value * 1000.0 } else { value });
            point.name = name;
        }
    }
    Some(point)
}

fn unescaped_hash(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&i| bytes[i] == b'#' && (i == 0 || bytes[i - 1] != b'\\'))
}

fn unescape(text: &str) -> String {
    text.replace("\\#", "#").replace("\\\\", "\\")
}

/// Diagnostics as flat strings. Scalars keep their text, nested mappings
/// and sequences are re-serialized. A block that is not valid YAML is kept
/// whole under `raw`.
fn parse_yaml(lines: &[String]) -> BTreeMap<String, String> {
    let text = lines.join("\n");
    match serde_yaml::from_str::<BTreeMap<String, serde_yaml::Value>>(&text) {
        Ok(map) => map
            .into_iter()
            .map(|(key, value)| (key, yaml_text(value)))
            .collect(),
        Err(err) => {
            tracing::debug!(error = %err, "unparseable YAML diagnostics");
            BTreeMap::from([("raw".to_string(), text)])
        }
    }
}

fn yaml_text(value: serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::String(s) => s,
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
