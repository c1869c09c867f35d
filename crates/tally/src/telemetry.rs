//! Tracing initialization for the binary and embedding applications.

use tracing_subscriber::EnvFilter;

/// Install a formatted tracing subscriber filtered by `RUST_LOG`.
///
/// Defaults to `info` when `RUST_LOG` is unset. Logs go to stderr so that
/// query output on stdout stays machine-readable.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}
