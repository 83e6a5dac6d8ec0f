//! Error types for tapestry-env

use thiserror::Error;

/// Errors raised while checking a toolchain
#[derive(Error, Debug)]
pub enum EnvError {
    /// Program could not be started
    #[error("{0} is not installed or not in PATH")]
    ProgramNotFound(String),

    /// Program ran but exited unsuccessfully
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// No version-like token in the program output
    #[error("could not find a version in output of {program}: {output}")]
    VersionUnparsed { program: String, output: String },

    /// Installed version differs from the pinned one
    #[error("{program} version mismatch: expected {expected}, found {actual}")]
    VersionMismatch {
        program: String,
        expected: String,
        actual: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EnvError>;
