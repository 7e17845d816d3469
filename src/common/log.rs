//! Logging setup on top of `tracing`.
//!
//! `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Safe to call more than once.
pub fn init(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Emit one structured event for a finished unit of work.
pub fn log_event(module: &str, event: &str, code: u32, dur_ms: i64) {
    tracing::info!(module, event, code, dur_ms);
}
