//! # Telemetry
//!
//! Installs the global `tracing` subscriber. `log` records, including the
//! actix access log, are forwarded into it.

use tracing_subscriber::EnvFilter;

/// Parses `directives`, falling back to `info` when they are invalid.
pub fn env_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("invalid log filter {directives:?}: {err}; using \"info\"");
        EnvFilter::new("info")
    })
}

/// Installs a formatting subscriber filtered by `directives`.
///
/// Calling this more than once keeps the first subscriber.
pub fn init(directives: &str) {
    if tracing_subscriber::fmt()
        .with_env_filter(env_filter(directives))
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
