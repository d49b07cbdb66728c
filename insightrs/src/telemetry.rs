//! Tracing setup for hosts that do not install their own subscriber.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "insight=info";

/// Install a formatting subscriber filtered by `RUST_LOG`, or `insight=info`
/// when unset. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
}
