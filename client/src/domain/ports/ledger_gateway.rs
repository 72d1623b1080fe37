//! Driven port for talking to the remote ledger service.
//!
//! The gateway owns no state: each call is one independent request. Retry
//! policy belongs to the caller, so errors only report whether a retry could
//! help.

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;
use crate::domain::{AccountRecord, RawEnvelope};

/// Page requested when none is specified.
pub const DEFAULT_PAGE: u32 = 1;
/// Page size requested when none is specified.
pub const DEFAULT_PER_PAGE: u32 = 100;
/// Largest page size the ledger service honours.
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination parameters for a list request.
///
/// Normalised on construction the way the ledger service reads its query:
/// a `page` below 1 becomes 1 and a `per_page` outside `1..=100` falls back
/// to [`DEFAULT_PER_PAGE`].
///
/// # Examples
/// ```
/// use ledger_client::domain::ports::PageParams;
///
/// let params = PageParams::new(0, 500);
/// assert_eq!(params.page(), 1);
/// assert_eq!(params.per_page(), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageParams {
    page: u32,
    per_page: u32,
}

impl PageParams {
    /// Build normalised pagination parameters.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        let page_size = if (1..=MAX_PER_PAGE).contains(&per_page) {
            per_page
        } else {
            DEFAULT_PER_PAGE
        };
        Self {
            page: page.max(1),
            per_page: page_size,
        }
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    /// Number of records per page.
    #[must_use]
    pub const fn per_page(self) -> u32 {
        self.per_page
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_PER_PAGE)
    }
}

/// Acknowledgement returned by the ledger after a create.
///
/// Holds the response body when it was JSON. The value is kept for logging
/// and display only; nothing in the client interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateAck(pub Option<Value>);

define_port_error! {
    /// Errors surfaced while calling the ledger service.
    pub enum GatewayError {
        /// Network transport failed before a response arrived.
        Transport {
            /// Transport failure description.
            message: String,
        } => "ledger transport failed: {message}",
        /// The ledger answered with a non-success status.
        Status {
            /// HTTP status code returned by the ledger.
            status: u16,
            /// Compact preview of the response body.
            message: String,
        } => "ledger request failed with status {status}: {message}",
        /// The request exceeded its time budget.
        Timeout {
            /// Timeout description.
            message: String,
        } => "ledger request timed out: {message}",
        /// A success response carried a body that is not JSON.
        Decode {
            /// Decoder failure description.
            message: String,
        } => "ledger response decode failed: {message}",
    }
}

impl GatewayError {
    /// Return the HTTP status attached to this error, if a response arrived.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Timeout { .. } | Self::Decode { .. } => None,
        }
    }

    /// Return whether retrying this error is expected to help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode { .. } => false,
        }
    }
}

/// Port for listing and creating ledger entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Fetch one page of the account collection as an uninterpreted body.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use ledger_client::domain::ports::{LedgerGateway, PageParams};
    ///
    /// let body = gateway.list(&PageParams::default()).await?;
    /// let records = ledger_client::domain::normalize(body)?;
    /// ```
    async fn list(&self, params: &PageParams) -> Result<RawEnvelope, GatewayError>;

    /// Write one account record to the ledger.
    async fn create(&self, record: &AccountRecord) -> Result<CreateAck, GatewayError>;
}
