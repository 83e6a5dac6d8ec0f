//! Error taxonomy for the harness.

use std::path::PathBuf;

/// Errors produced while wiring or running a test network.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("artifact not found: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("invalid bundle at {}: {reason}", path.display())]
    BundleInvalid { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("entry type {entry_type} is not defined by any app installed for agent {agent}")]
    UnknownEntryType { agent: String, entry_type: String },

    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("invalid suite manifest: {0}")]
    Manifest(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_missing_names_path() {
        let err = HarnessError::ArtifactMissing {
            path: PathBuf::from("/tmp/workdir/missing.happ"),
        };
        let msg = err.to_string();
        assert!(msg.contains("artifact not found"));
        assert!(msg.contains("missing.happ"));
    }

    #[test]
    fn test_unknown_entry_type_display() {
        let err = HarnessError::UnknownEntryType {
            agent: "abc123".to_string(),
            entry_type: "post".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("post"));
        assert!(msg.contains("abc123"));
    }
}
