//! Client-side synchronisation core for a remote account ledger.
//!
//! The crate keeps a local new-entry draft, the remote account collection and
//! an in-memory cache between them consistent across create and read
//! operations.
//!
//! - [`domain`]: record model, envelope normalisation, collection cache,
//!   draft controller and the session boundary.
//! - [`outbound`]: the reqwest adapter for the ledger HTTP API.
//! - [`config`]: startup settings.
//! - [`telemetry`]: tracing bootstrap.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
