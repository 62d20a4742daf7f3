// Thin wrapper around `tracing` so the rest of the crate never depends on
// the subscriber crate directly, and so every binary initializes logging
// the same way.

use tracing_subscriber::EnvFilter;

pub use tracing::{debug, error, info, trace, warn};

#[cfg(debug_assertions)]
const DEFAULT_LEVEL: &str = "debug";
#[cfg(not(debug_assertions))]
const DEFAULT_LEVEL: &str = "info";

/// Installs a global `tracing` subscriber. `RUST_LOG` overrides `default_level`
/// when set. Safe to call more than once; later calls are no-ops.
///
/// Also bridges the plain `log` facade into `tracing`, so records emitted by
/// dependencies that only know about `log` (rather than `tracing`) still go
/// through the same subscriber instead of being silently dropped.
pub fn setup_logging(default_level: &str) {
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Convenience entry point using the build-profile default level.
pub fn setup_default_logging() {
    setup_logging(DEFAULT_LEVEL);
}
