//! Tracing/logging setup shared by binaries and integration tests.

use tracing_subscriber::EnvFilter;

/// Initialize process-wide tracing.
///
/// Output is compact human-readable lines (this is a client SDK; logs land
/// in a developer terminal). The filter comes from `RUST_LOG`, defaulting to
/// `info`. Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(true)
        .try_init();
}
