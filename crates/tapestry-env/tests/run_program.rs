//! Runs real programs through ToolchainCheck.

use tapestry_env::{is_program_available, EnvError, ToolchainCheck};

const MISSING: &str = "tapestry-env-no-such-program";

#[test]
fn test_missing_program_not_found() {
    let err = ToolchainCheck::new(MISSING, "1.0.0").run().unwrap_err();
    assert!(matches!(err, EnvError::ProgramNotFound(ref p) if p == MISSING));
    assert!(!is_program_available(MISSING));
}

#[cfg(unix)]
#[test]
fn test_matching_version_passes() {
    let report = ToolchainCheck::new("sh", "0.0.100")
        .with_args(["-c", "echo holochain 0.0.100"])
        .run()
        .unwrap();
    assert_eq!(report.version, "0.0.100");
}

#[cfg(unix)]
#[test]
fn test_mismatched_version_fails() {
    let err = ToolchainCheck::new("sh", "0.0.100")
        .with_args(["-c", "echo holochain 0.0.99"])
        .run()
        .unwrap_err();
    assert!(matches!(err, EnvError::VersionMismatch { .. }));
}

#[cfg(unix)]
#[test]
fn test_failing_command_reports_stderr() {
    let err = ToolchainCheck::new("sh", "1.0.0")
        .with_args(["-c", "echo broken >&2; exit 3"])
        .run()
        .unwrap_err();
    match err {
        EnvError::CommandFailed { stderr, .. } => assert_eq!(stderr, "broken"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_banner_on_stderr() {
    let report = ToolchainCheck::new("sh", "3.2.1")
        .with_args(["-c", "echo tool 3.2.1 >&2"])
        .run()
        .unwrap();
    assert_eq!(report.banner, "tool 3.2.1");
}
