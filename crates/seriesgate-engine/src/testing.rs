//! In-process [`ComputeClient`] for tests.
//!
//! [`ScriptedClient`] answers batch compute calls through a caller-supplied
//! script and records the size of every call it receives.

use std::sync::Mutex;

use async_trait::async_trait;
use seriesgate_core::builder::ASSET_RID_VARIABLE;
use seriesgate_core::compute::{NumericPlot, VariableValue};
use seriesgate_core::{ComputeRequest, ComputeResult, Plot};

use crate::client::ComputeClient;
use crate::credentials::ConnectionSettings;
use crate::error::TransportError;

type Script =
    Box<dyn Fn(usize, &[ComputeRequest]) -> Result<Vec<ComputeResult>, TransportError> + Send + Sync>;

pub struct ScriptedClient {
    script: Script,
    connection_ok: bool,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedClient {
    /// `script` receives the zero-based call number and the chunk requests.
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize, &[ComputeRequest]) -> Result<Vec<ComputeResult>, TransportError>
            + Send
            + Sync
            + 'static,
    {
        ScriptedClient {
            script: Box::new(script),
            connection_ok: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with [`echo_result`].
    pub fn echo() -> Self {
        Self::new(|_, requests| Ok(requests.iter().map(echo_result).collect()))
    }

    pub fn with_connection_ok(mut self, ok: bool) -> Self {
        self.connection_ok = ok;
        self
    }

    /// Sizes of the batch compute calls received so far, in order.
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ComputeClient for ScriptedClient {
    async fn batch_compute(
        &self,
        _settings: &ConnectionSettings,
        requests: &[ComputeRequest],
    ) -> Result<Vec<ComputeResult>, TransportError> {
        let call = match self.calls.lock() {
            Ok(mut calls) => {
                calls.push(requests.len());
                calls.len() - 1
            }
            Err(_) => 0,
        };
        (self.script)(call, requests)
    }

    async fn check_connection(&self, _settings: &ConnectionSettings) -> Result<(), TransportError> {
        if self.connection_ok {
            Ok(())
        } else {
            Err(TransportError::status(401, "unauthorized"))
        }
    }
}

/// Asset RID bound in a request's variable context.
pub fn asset_rid_of(request: &ComputeRequest) -> Option<&str> {
    match request.context.variables.get(ASSET_RID_VARIABLE)? {
        VariableValue::String { string } => Some(string),
    }
}

/// One-point numeric plot whose value is the trailing number of the
/// request's asset RID (`ri.asset.17` gives 17.0), NaN when there is none.
pub fn echo_result(request: &ComputeRequest) -> ComputeResult {
    let value = asset_rid_of(request)
        .and_then(|rid| rid.rsplit('.').next())
        .and_then(|tail| tail.parse::<f64>().ok())
        .unwrap_or(f64::NAN);
    ComputeResult::Success(Plot::Numeric(NumericPlot {
        timestamps: vec![request.start],
        values: vec![value],
    }))
}
