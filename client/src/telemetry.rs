//! Tracing subscriber bootstrap.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a JSON `fmt` subscriber filtered by `RUST_LOG`.
///
/// A subscriber that is already installed is kept; the failure is logged and
/// start-up continues.
pub fn init_tracing() {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }
}
