//! Tracing setup for binaries embedding the retriever.

use tracing_subscriber::EnvFilter;

/// Initialize a formatted subscriber.
///
/// `RUST_LOG` takes precedence over `default_directive`. Calling this more
/// than once is harmless: later calls leave the first subscriber in place.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
