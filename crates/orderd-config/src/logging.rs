//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for the daemon.
///
/// `RUST_LOG` wins over the configured level when set. Safe to call once;
/// later calls are ignored so tests can initialize freely.
pub fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
