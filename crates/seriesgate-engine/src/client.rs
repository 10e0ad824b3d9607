//! Remote compute service client.
//!
//! [`ComputeClient`] is the seam between the engine and the network. The
//! production implementation, [`HttpComputeClient`], wraps one pooled
//! `reqwest::Client` that is built once and shared read-only by every
//! concurrent chunk dispatch. Retries are not performed here.

use std::time::Duration;

use async_trait::async_trait;
use seriesgate_core::compute::{BatchComputeRequest, BatchComputeResponse};
use seriesgate_core::{ComputeRequest, ComputeResult};

use crate::credentials::ConnectionSettings;
use crate::error::TransportError;

/// Batch compute endpoint, relative to the base URL.
pub const BATCH_COMPUTE_PATH: &str = "/compute/v2/compute/batch";

/// Cheap authenticated endpoint used for connection tests.
pub const CONNECTION_CHECK_PATH: &str = "/authentication/v2/my/profile";

/// Calls against the remote compute service.
#[async_trait]
pub trait ComputeClient: Send + Sync {
    /// Issues one batch compute call. The returned results are positional:
    /// the i-th result answers the i-th request, and the list may be shorter
    /// than `requests`.
    async fn batch_compute(
        &self,
        settings: &ConnectionSettings,
        requests: &[ComputeRequest],
    ) -> Result<Vec<ComputeResult>, TransportError>;

    /// Verifies that the service is reachable with the given credentials.
    async fn check_connection(&self, settings: &ConnectionSettings) -> Result<(), TransportError>;
}

/// `reqwest`-backed [`ComputeClient`].
#[derive(Debug, Clone)]
pub struct HttpComputeClient {
    http: reqwest::Client,
}

impl HttpComputeClient {
    /// Builds a client with a per-call timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpComputeClient { http })
    }

    /// Wraps an existing pooled client.
    pub fn from_client(http: reqwest::Client) -> Self {
        HttpComputeClient { http }
    }
}

#[async_trait]
impl ComputeClient for HttpComputeClient {
    async fn batch_compute(
        &self,
        settings: &ConnectionSettings,
        requests: &[ComputeRequest],
    ) -> Result<Vec<ComputeResult>, TransportError> {
        let response = self
            .http
            .post(settings.endpoint(BATCH_COMPUTE_PATH))
            .header("Authorization", settings.bearer())
            .json(&BatchComputeRequest { requests })
            .send()
            .await?;

        let status = response.status();
        let body_text = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::status(status.as_u16(), &body_text));
        }

        let parsed: BatchComputeResponse = serde_json::from_str(&body_text)?;
        Ok(parsed.results)
    }

    async fn check_connection(&self, settings: &ConnectionSettings) -> Result<(), TransportError> {
        let response = self
            .http
            .get(settings.endpoint(CONNECTION_CHECK_PATH))
            .header("Authorization", settings.bearer())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(TransportError::status(status.as_u16(), &body_text));
        }
        Ok(())
    }
}
