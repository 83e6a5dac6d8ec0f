//! Tapestry-Env: pinned toolchain checks for test environments
//!
//! A suite usually depends on a specific build of its toolchain. A
//! [`ToolchainCheck`] runs the program, pulls the first version token out of
//! its output and compares it with the pinned version.

pub mod error;

pub use error::{EnvError, Result};

use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

fn default_args() -> Vec<String> {
    vec!["--version".to_string()]
}

/// A program and the version it must report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainCheck {
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    pub expected: String,
}

/// Result of a passing check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainReport {
    pub program: String,
    pub version: String,
    /// First line of the program output.
    pub banner: String,
}

impl ToolchainCheck {
    pub fn new(program: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: default_args(),
            expected: expected.into(),
        }
    }

    /// Replace the default `--version` arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Run the program and verify its reported version.
    pub fn run(&self) -> Result<ToolchainReport> {
        debug!(program = %self.program, args = ?self.args, "running toolchain check");
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EnvError::ProgramNotFound(self.program.clone()),
                _ => EnvError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EnvError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            // Some tools print their banner on stderr.
            text = String::from_utf8_lossy(&output.stderr).into_owned();
        }
        self.verify_output(&text)
    }

    /// Verify already-captured program output.
    pub fn verify_output(&self, output: &str) -> Result<ToolchainReport> {
        let version = extract_version(output).ok_or_else(|| EnvError::VersionUnparsed {
            program: self.program.clone(),
            output: output.trim().to_string(),
        })?;

        if normalize(&version) != normalize(&self.expected) {
            warn!(
                program = %self.program,
                expected = %self.expected,
                actual = %version,
                "toolchain version mismatch"
            );
            return Err(EnvError::VersionMismatch {
                program: self.program.clone(),
                expected: self.expected.clone(),
                actual: version,
            });
        }

        info!(program = %self.program, version = %version, "toolchain version ok");
        Ok(ToolchainReport {
            program: self.program.clone(),
            version,
            banner: output.lines().next().unwrap_or_default().trim().to_string(),
        })
    }
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"v?\d+(?:\.\d+)+(?:-[0-9A-Za-z.\-]+)?(?:\+[0-9A-Za-z.\-]+)?")
            .expect("static regex")
    })
}

/// First version-like token (`0.0.100`, `v1.2.3-beta.1`) in `text`.
pub fn extract_version(text: &str) -> Option<String> {
    version_re()
        .find(text)
        .map(|m| m.as_str().trim_start_matches('v').to_string())
}

fn normalize(version: &str) -> &str {
    version.trim().trim_start_matches('v')
}

/// Check whether a program can be started at all.
pub fn is_program_available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
