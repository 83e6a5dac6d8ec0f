//! Tapestry - scenario harness CLI
//!
//! ## Commands
//!
//! - `report`: Render a TAP stream and derive an exit status
//! - `check-env`: Verify the installed toolchain version
//! - `plan`: Show what a suite manifest would install
//! - `smoke`: Install a manifest's descriptor into a test network and report

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use tapestry_core::SuiteManifest;
use tapestry_env::ToolchainCheck;
use tapestry_tap::{DiffReporter, Style};

#[derive(Parser)]
#[command(name = "tapestry")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declarative scenario harness for multi-agent test networks", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a TAP stream as a colorized diff report
    Report {
        /// TAP file to read (default: stdin)
        file: Option<PathBuf>,

        /// Exit status of the process that produced the stream
        #[arg(long, default_value_t = 0, env = "TAPESTRY_PARENT_STATUS")]
        parent_status: i32,

        /// Disable ANSI colors
        #[arg(long)]
        no_color: bool,
    },

    /// Check that a toolchain program reports the pinned version
    CheckEnv {
        /// Program to run
        #[arg(long)]
        program: String,

        /// Version the program must report
        #[arg(long)]
        expected: String,

        /// Argument passed to the program (repeatable, default: --version)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the resolved installation plan of a suite manifest as JSON
    Plan {
        /// Path to the suite manifest (TOML)
        #[arg(short, long, default_value = "suite.toml")]
        manifest: PathBuf,
    },

    /// Install a manifest's descriptor into a fresh network and print TAP
    Smoke {
        /// Path to the suite manifest (TOML)
        #[arg(short, long, default_value = "suite.toml")]
        manifest: PathBuf,

        /// Render the result with the diff reporter instead of raw TAP
        #[arg(long)]
        pretty: bool,

        /// Disable ANSI colors (with --pretty)
        #[arg(long)]
        no_color: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tapestry_core::init_tracing(cli.json, level);

    let code = match cli.command {
        Commands::Report {
            file,
            parent_status,
            no_color,
        } => cmd_report(file.as_deref(), parent_status, Style::from_env(no_color))?,
        Commands::CheckEnv {
            program,
            expected,
            args,
        } => cmd_check_env(&program, &expected, args),
        Commands::Plan { manifest } => cmd_plan(&manifest)?,
        Commands::Smoke {
            manifest,
            pretty,
            no_color,
        } => cmd_smoke(&manifest, pretty, Style::from_env(no_color)).await?,
    };
    Ok(ExitCode::from(code))
}

/// Render a TAP file or stdin.
fn cmd_report(file: Option<&Path>, parent_status: i32, style: Style) -> Result<u8> {
    let stdout = std::io::stdout();
    match file {
        Some(path) => {
            let input = std::fs::File::open(path)
                .with_context(|| format!("Failed to open TAP file {}", path.display()))?;
            report_stream(BufReader::new(input), stdout.lock(), parent_status, style)
        }
        None => report_stream(std::io::stdin().lock(), stdout.lock(), parent_status, style),
    }
}

fn report_stream<R: BufRead, W: Write>(
    input: R,
    out: W,
    parent_status: i32,
    style: Style,
) -> Result<u8> {
    let mut reporter = DiffReporter::new(out, style);
    reporter.run(input).context("Failed to render TAP report")?;
    Ok(exit_status(reporter.exit_code(parent_status)))
}

fn cmd_check_env(program: &str, expected: &str, args: Vec<String>) -> u8 {
    let mut check = ToolchainCheck::new(program, expected);
    if !args.is_empty() {
        check = check.with_args(args);
    }
    match check.run() {
        Ok(report) => {
            println!("✓ {} {}", report.program, report.version);
            0
        }
        Err(err) => {
            eprintln!("✗ {err}");
            1
        }
    }
}

fn cmd_plan(manifest_path: &Path) -> Result<u8> {
    let json = plan_json(manifest_path)?;
    println!("{json}");
    Ok(0)
}

fn plan_json(manifest_path: &Path) -> Result<String> {
    let manifest = load_manifest(manifest_path)?;
    let plan = manifest.plan().context("Failed to resolve installation plan")?;
    if plan.missing > 0 {
        info!(suite = %plan.suite, missing = plan.missing, "plan references missing artifacts");
    }
    serde_json::to_string_pretty(&plan).context("Failed to serialize plan")
}

async fn cmd_smoke(manifest_path: &Path, pretty: bool, style: Style) -> Result<u8> {
    let (tap, code) = smoke_tap(manifest_path).await?;
    let stdout = std::io::stdout();
    if pretty {
        return report_stream(tap.as_bytes(), stdout.lock(), code, style);
    }
    let mut out = stdout.lock();
    out.write_all(tap.as_bytes())
        .context("Failed to write TAP output")?;
    Ok(exit_status(code))
}

async fn smoke_tap(manifest_path: &Path) -> Result<(String, i32)> {
    let manifest = load_manifest(manifest_path)?;
    let orchestrator = manifest
        .smoke_orchestrator()
        .context("Failed to build smoke scenario")?;
    let report = orchestrator.run().await;
    Ok((report.to_tap(), report.exit_code()))
}

fn load_manifest(path: &Path) -> Result<SuiteManifest> {
    SuiteManifest::load(path)
        .with_context(|| format!("Failed to load suite manifest {}", path.display()))
}

fn exit_status(code: i32) -> u8 {
    if code == 0 {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_suite(dir: &Path, with_bundle: bool) -> PathBuf {
        std::fs::create_dir_all(dir.join("workdir")).unwrap();
        if with_bundle {
            std::fs::write(
                dir.join("workdir/posts.happ"),
                r#"{"name":"posts","dnas":[{"name":"posts","zomes":["posts"],"entry_types":["post"]}]}"#,
            )
            .unwrap();
        }
        let manifest = dir.join("suite.toml");
        std::fs::write(
            &manifest,
            "name = \"posts\"\nagents = [[[\"workdir/posts.happ\"]], [[\"workdir/posts.happ\"]]]\n",
        )
        .unwrap();
        manifest
    }

    #[test]
    fn test_cli_parses_report_flags() {
        let cli = Cli::parse_from(["tapestry", "report", "run.tap", "--parent-status", "1", "--no-color"]);
        match cli.command {
            Commands::Report {
                file,
                parent_status,
                no_color,
            } => {
                assert_eq!(file, Some(PathBuf::from("run.tap")));
                assert_eq!(parent_status, 1);
                assert!(no_color);
            }
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn test_cli_collects_check_env_args() {
        let cli = Cli::parse_from([
            "tapestry",
            "--verbose",
            "check-env",
            "--program",
            "holochain",
            "--expected",
            "0.0.100",
            "--arg",
            "-V",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::CheckEnv { args, .. } => assert_eq!(args, vec!["-V"]),
            _ => panic!("expected check-env command"),
        }
    }

    #[test]
    fn test_report_stream_exit_codes() {
        let passing = "TAP version 13\nok 1 - fine\n1..1\n";
        let failing = "TAP version 13\nnot ok 1 - broken\n1..1\n";

        let code = report_stream(passing.as_bytes(), Vec::new(), 0, Style::plain()).unwrap();
        assert_eq!(code, 0);
        let code = report_stream(passing.as_bytes(), Vec::new(), 1, Style::plain()).unwrap();
        assert_eq!(code, 1);
        let code = report_stream(failing.as_bytes(), Vec::new(), 0, Style::plain()).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn test_check_env_missing_program() {
        assert_eq!(cmd_check_env("tapestry-cli-no-such-program", "1.0.0", vec![]), 1);
    }

    #[test]
    fn test_plan_json_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_suite(dir.path(), false);

        let json: serde_json::Value = serde_json::from_str(&plan_json(&manifest).unwrap()).unwrap();
        assert_eq!(json["suite"], "posts");
        assert_eq!(json["missing"], 2);
        assert_eq!(json["agents"][1]["groups"][0][0]["exists"], false);
    }

    #[tokio::test]
    async fn test_smoke_passes_with_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_suite(dir.path(), true);

        let (tap, code) = smoke_tap(&manifest).await.unwrap();
        assert_eq!(code, 0, "{tap}");
        assert!(tap.contains("ok 1 - install posts"));
    }

    #[tokio::test]
    async fn test_smoke_fails_without_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_suite(dir.path(), false);

        let (tap, code) = smoke_tap(&manifest).await.unwrap();
        assert_eq!(code, 1);
        assert!(tap.contains("not ok 1 - install posts"));
    }

    #[test]
    fn test_missing_manifest_has_context() {
        let err = plan_json(Path::new("/nonexistent/suite.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to load suite manifest"));
    }
}
