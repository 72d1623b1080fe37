//! Client configuration loaded via OrthoConfig.
//!
//! The ledger base URL is the only external setting. It is read once at
//! startup from `LEDGER_API_URL` (or `--api-url` on the command line).

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Environment variable holding the ledger base URL.
pub const API_URL_ENV: &str = "LEDGER_API_URL";

/// Errors raised while validating client settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientConfigError {
    /// No base URL was configured.
    #[error("ledger API URL is not configured; set {API_URL_ENV} or pass --api-url")]
    MissingApiUrl,
    /// The configured base URL is unusable.
    #[error("ledger API URL `{value}` is invalid: {message}")]
    InvalidApiUrl {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        message: String,
    },
}

/// Configuration values for the ledger client.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LEDGER")]
pub struct ClientSettings {
    /// Base URL of the ledger service, e.g. `http://localhost:8080`.
    pub api_url: Option<String>,
}

impl ClientSettings {
    /// Replace the base URL when `api_url` is provided.
    #[must_use]
    pub fn with_api_url_override(mut self, api_url: Option<String>) -> Self {
        if api_url.is_some() {
            self.api_url = api_url;
        }
        self
    }

    /// Return the validated base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::MissingApiUrl`] when unset or blank and
    /// [`ClientConfigError::InvalidApiUrl`] when the value does not parse or
    /// is not an `http`/`https` URL.
    pub fn api_url(&self) -> Result<Url, ClientConfigError> {
        let raw = self
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ClientConfigError::MissingApiUrl)?;
        let url = Url::parse(raw).map_err(|error| ClientConfigError::InvalidApiUrl {
            value: raw.to_owned(),
            message: error.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientConfigError::InvalidApiUrl {
                value: raw.to_owned(),
                message: format!("unsupported scheme `{}`", url.scheme()),
            });
        }
        Ok(url)
    }
}
