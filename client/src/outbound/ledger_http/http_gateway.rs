//! Reqwest-backed ledger gateway adapter.
//!
//! This adapter owns transport details only: route selection, timeouts, HTTP
//! error mapping and JSON decoding into raw envelopes. Envelope shapes are
//! interpreted by the domain.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::ports::{CreateAck, GatewayError, LedgerGateway, PageParams};
use crate::domain::{AccountRecord, RawEnvelope};

/// Request timeout applied when none is given.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Route table spoken by the ledger service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiShape {
    /// `GET /accounts` returning `{accounts}` and `POST /accounts`.
    Flat,
    /// `GET /documents?page&perPage` returning `{revisions}` and `PUT /document`.
    #[default]
    Revisioned,
}

impl ApiShape {
    const fn list_segment(self) -> &'static str {
        match self {
            Self::Flat => "accounts",
            Self::Revisioned => "documents",
        }
    }

    const fn create_route(self) -> (Method, &'static str) {
        match self {
            Self::Flat => (Method::POST, "accounts"),
            Self::Revisioned => (Method::PUT, "document"),
        }
    }
}

/// Errors raised while building an [`HttpLedgerGateway`].
#[derive(Debug, Error)]
pub enum HttpGatewayBuildError {
    /// The reqwest client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("base URL `{url}` cannot be extended with API paths")]
    UnsupportedBaseUrl {
        /// The rejected base URL.
        url: String,
    },
}

/// Ledger gateway performing HTTP requests against one base URL.
#[derive(Debug, Clone)]
pub struct HttpLedgerGateway {
    client: Client,
    shape: ApiShape,
    list_url: Url,
    create_method: Method,
    create_url: Url,
}

impl HttpLedgerGateway {
    /// Build a gateway with the default request timeout.
    /// ```rust,ignore
    /// let gateway = HttpLedgerGateway::new(base_url, ApiShape::Revisioned)?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the client cannot be built or the base URL
    /// cannot take path segments.
    pub fn new(base_url: Url, shape: ApiShape) -> Result<Self, HttpGatewayBuildError> {
        Self::with_timeout(base_url, shape, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build a gateway with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the client cannot be built or the base URL
    /// cannot take path segments.
    pub fn with_timeout(
        base_url: Url,
        shape: ApiShape,
        timeout: Duration,
    ) -> Result<Self, HttpGatewayBuildError> {
        let client = Client::builder().timeout(timeout).build()?;
        let (create_method, create_segment) = shape.create_route();
        Ok(Self {
            client,
            shape,
            list_url: endpoint(&base_url, shape.list_segment())?,
            create_method,
            create_url: endpoint(&base_url, create_segment)?,
        })
    }

    /// Route table in use.
    #[must_use]
    pub const fn shape(&self) -> ApiShape {
        self.shape
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn list(&self, params: &PageParams) -> Result<RawEnvelope, GatewayError> {
        let mut request = self
            .client
            .get(self.list_url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if self.shape == ApiShape::Revisioned {
            request = request.query(&[("page", params.page()), ("perPage", params.per_page())]);
        }
        let response = request.send().await.map_err(|error| {
            let mapped = map_transport_error(error);
            warn!(method = "GET", url = %self.list_url, error = %mapped, "ledger list failed");
            mapped
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(method = "GET", url = %self.list_url, status = status.as_u16(), "ledger list completed");
        if !status.is_success() {
            let error = map_status_error(status, body.as_ref());
            warn!(method = "GET", url = %self.list_url, error = %error, "ledger list rejected");
            return Err(error);
        }
        parse_envelope(body.as_ref())
    }

    async fn create(&self, record: &AccountRecord) -> Result<CreateAck, GatewayError> {
        let method = self.create_method.clone();
        let response = self
            .client
            .request(method.clone(), self.create_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(record)
            .send()
            .await
            .map_err(|error| {
                let mapped = map_transport_error(error);
                warn!(method = %method, url = %self.create_url, error = %mapped, "ledger create failed");
                mapped
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        debug!(method = %method, url = %self.create_url, status = status.as_u16(), "ledger create completed");
        if !status.is_success() {
            let error = map_status_error(status, body.as_ref());
            warn!(method = %method, url = %self.create_url, error = %error, "ledger create rejected");
            return Err(error);
        }
        Ok(parse_ack(body.as_ref()))
    }
}

fn endpoint(base: &Url, segment: &str) -> Result<Url, HttpGatewayBuildError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| HttpGatewayBuildError::UnsupportedBaseUrl {
            url: base.to_string(),
        })?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

fn parse_envelope(body: &[u8]) -> Result<RawEnvelope, GatewayError> {
    serde_json::from_slice::<Value>(body)
        .map(RawEnvelope::new)
        .map_err(|error| GatewayError::decode(format!("invalid ledger JSON payload: {error}")))
}

fn parse_ack(body: &[u8]) -> CreateAck {
    CreateAck(serde_json::from_slice::<Value>(body).ok())
}

fn map_transport_error(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() {
        GatewayError::timeout(error.to_string())
    } else {
        GatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> GatewayError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => GatewayError::timeout(message),
        _ => GatewayError::status(status.as_u16(), message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
