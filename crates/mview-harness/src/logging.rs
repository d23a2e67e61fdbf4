#![forbid(unsafe_code)]

//! Tracing subscriber setup for the harness binary.

use tracing_subscriber::EnvFilter;

use crate::config::{HarnessConfig, LogFormat};

/// Install a global subscriber. A second call is a no-op.
pub fn init(config: &HarnessConfig) {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true);
    let _ = match config.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}
