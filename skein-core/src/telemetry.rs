//! Tracing bootstrap.
//!
//! The kernel reports every delivery, retry, dead-letter, and append as a
//! structured `tracing` event; this module only installs a subscriber for
//! binaries and test suites that want to see them.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber with `RUST_LOG`-style filtering.
///
/// Falls back to the given default directive when `RUST_LOG` is unset.
/// Idempotent: later calls (other tests in the same process) are no-ops.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
