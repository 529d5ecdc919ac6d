//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins over the configured level; `verbose` raises the
/// configured level to `debug`. Calling this twice is harmless.
pub fn init(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
