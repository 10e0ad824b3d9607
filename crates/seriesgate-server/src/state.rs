//! Application state shared by all handlers.
//!
//! The engine (and with it the pooled HTTP client) is built once at startup
//! and shared read-only. Default connection settings come from the process
//! environment; requests may override them per batch.

use std::sync::Arc;

use seriesgate_core::DatasourceSettings;
use seriesgate_engine::credentials::{API_KEY_VAR, BASE_URL_VAR};
use seriesgate_engine::{CancellationToken, ComputeClient, EngineConfig, HttpComputeClient, QueryEngine};

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    /// Settings used when a request carries none of its own.
    pub default_settings: Arc<DatasourceSettings>,
    /// Cancelled on shutdown; every batch runs under a child token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Builds state with the production HTTP compute client.
    pub fn new(config: EngineConfig, default_settings: DatasourceSettings) -> Result<Self, ApiError> {
        let client = HttpComputeClient::new(config.http_timeout)
            .map_err(|err| ApiError::InternalError(format!("http client: {}", err)))?;
        Ok(Self::with_client(config, Arc::new(client), default_settings))
    }

    /// Builds state around an arbitrary compute client.
    pub fn with_client(
        config: EngineConfig,
        client: Arc<dyn ComputeClient>,
        default_settings: DatasourceSettings,
    ) -> Self {
        AppState {
            engine: Arc::new(QueryEngine::new(config, client)),
            default_settings: Arc::new(default_settings),
            shutdown: CancellationToken::new(),
        }
    }

    /// Reads engine configuration and default credentials from the
    /// environment.
    pub fn from_env() -> Result<Self, ApiError> {
        let config = EngineConfig::from_env()?;
        let defaults = DatasourceSettings {
            base_url: std::env::var(BASE_URL_VAR).ok(),
            api_key: std::env::var(API_KEY_VAR).ok(),
        };
        Self::new(config, defaults)
    }
}
