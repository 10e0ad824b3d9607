//! Connection settings and the per-batch credential boundary.
//!
//! Settings are loaded exactly once per batch through a [`CredentialSource`]
//! and stay immutable for that batch. A failed load fails every query in the
//! batch.

use std::fmt;

use reqwest::Url;
use seriesgate_core::DatasourceSettings;

use crate::error::ConfigError;

pub const BASE_URL_VAR: &str = "SERIESGATE_BASE_URL";
pub const API_KEY_VAR: &str = "SERIESGATE_API_KEY";

/// Resolved base URL and bearer credential of the remote service.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    base_url: String,
    api_key: String,
}

impl ConnectionSettings {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ConfigError> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        let parsed = Url::parse(base_url).map_err(|err| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(ConnectionSettings {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an API path such as `/compute/v2/compute/batch`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Supplies connection settings for one batch.
pub trait CredentialSource: Send + Sync {
    fn load(&self) -> Result<ConnectionSettings, ConfigError>;
}

impl CredentialSource for ConnectionSettings {
    fn load(&self) -> Result<ConnectionSettings, ConfigError> {
        Ok(self.clone())
    }
}

/// Reads settings from `SERIESGATE_BASE_URL` and `SERIESGATE_API_KEY` on
/// every load.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn load(&self) -> Result<ConnectionSettings, ConfigError> {
        let base_url = std::env::var(BASE_URL_VAR).unwrap_or_default();
        let api_key = std::env::var(API_KEY_VAR).unwrap_or_default();
        ConnectionSettings::new(&base_url, &api_key)
    }
}

/// Settings sent with a request, completed field by field from process
/// defaults.
#[derive(Debug, Clone, Copy)]
pub struct LayeredCredentials<'a> {
    pub inline: Option<&'a DatasourceSettings>,
    pub defaults: &'a DatasourceSettings,
}

impl CredentialSource for LayeredCredentials<'_> {
    fn load(&self) -> Result<ConnectionSettings, ConfigError> {
        let base_url = first_non_blank(
            self.inline.and_then(|s| s.base_url.as_ref()),
            self.defaults.base_url.as_ref(),
        );
        let api_key = first_non_blank(
            self.inline.and_then(|s| s.api_key.as_ref()),
            self.defaults.api_key.as_ref(),
        );
        ConnectionSettings::new(base_url, api_key)
    }
}

fn first_non_blank<'a>(preferred: Option<&'a String>, fallback: Option<&'a String>) -> &'a str {
    preferred
        .filter(|v| !v.trim().is_empty())
        .or(fallback)
        .map(String::as_str)
        .unwrap_or_default()
}
