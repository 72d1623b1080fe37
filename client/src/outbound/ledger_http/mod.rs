//! Ledger service outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `LedgerGateway`
//! port for both the flat and the revisioned route tables.

mod http_gateway;

pub use http_gateway::{ApiShape, DEFAULT_REQUEST_TIMEOUT, HttpGatewayBuildError, HttpLedgerGateway};
