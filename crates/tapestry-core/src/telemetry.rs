//! Tracing setup for the CLI and for suites run as tests.
//!
//! Logs go to stderr: stdout is reserved for TAP.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// `RUST_LOG` when set and valid, else `level` for every target.
pub fn log_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber: JSON lines when `json`, human-readable
/// otherwise. Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    };

    let installed = tracing_subscriber::registry()
        .with(layer)
        .with(log_filter(level))
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
