//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! Adapters are thin translators between domain types and transport
//! representations. They contain no business logic.
//!
//! - **ledger_http**: reqwest-backed client for the remote ledger service

pub mod ledger_http;
