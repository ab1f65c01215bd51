//! Structured logging via `tracing`.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Events go to stderr
/// so command output on stdout stays machine-readable.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
