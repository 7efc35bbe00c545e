//! Logging setup utilities for the relay server.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// Logging is configured for the library crate, the binary, and the HTTP
/// trace layer. The level can be overridden using the `RUST_LOG`
/// environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "server")
/// * `default_level` - The default log level (e.g., "debug", "info", "warn")
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}={},{}={},tower_http={}",
                    env!("CARGO_PKG_NAME").replace("-", "_"),
                    default_log_level,
                    binary_name,
                    default_log_level,
                    default_log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
