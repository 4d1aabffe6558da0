//! Tracing setup for the `ari` binary.
//!
//! Logs always go to stderr; stdout is reserved for screen output. The filter
//! comes from `ARI_LOG`, then `RUST_LOG`, then the level the caller asks for.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// App-specific filter variable, checked before `RUST_LOG`
pub const LOG_ENV: &str = "ARI_LOG";

/// Warnings and errors only
pub fn init() {
    init_with_level("warn")
}

/// Install the global subscriber with `default_level` as the fallback filter
///
/// A second call is a no-op.
pub fn init_with_level(default_level: &str) {
    let directives = filter_directives(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        default_level,
    );
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter {:?}: {}", directives, e);
        EnvFilter::new(default_level)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

/// First non-blank of `ARI_LOG`, `RUST_LOG`, the default
fn filter_directives(ari_log: Option<String>, rust_log: Option<String>, default_level: &str) -> String {
    [ari_log, rust_log]
        .into_iter()
        .flatten()
        .find(|d| !d.trim().is_empty())
        .unwrap_or_else(|| default_level.to_string())
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
