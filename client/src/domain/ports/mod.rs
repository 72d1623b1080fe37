//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod ledger_gateway;

#[cfg(test)]
pub use ledger_gateway::MockLedgerGateway;
pub use ledger_gateway::{
    CreateAck, DEFAULT_PAGE, DEFAULT_PER_PAGE, GatewayError, LedgerGateway, MAX_PER_PAGE,
    PageParams,
};
