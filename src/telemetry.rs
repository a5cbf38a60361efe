//! Log output for the binary
//!
//! Logs go to stderr so stdout carries nothing but the account CSV. The
//! level comes from `RUST_LOG` and defaults to `info`.

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber
///
/// Calling it more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
