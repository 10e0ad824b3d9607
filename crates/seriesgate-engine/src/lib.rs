//! Batch query execution against a remote time-series compute API.
//!
//! [`QueryEngine`] takes a host batch of panel queries, answers the
//! immediate ones directly, packs the asset/channel queries into chunks
//! bounded by the server's subrequest limit, dispatches one batch compute
//! call per chunk through a [`ComputeClient`], and reconciles the positional
//! results back onto refIds.

pub mod chunk;
pub mod client;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod reconcile;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{ComputeClient, HttpComputeClient};
pub use config::EngineConfig;
pub use credentials::{ConnectionSettings, CredentialSource, EnvCredentials, LayeredCredentials};
pub use engine::QueryEngine;
pub use error::{ConfigError, TransportError};
pub use reconcile::{PositionalReconciler, ResultReconciler};
pub use tokio_util::sync::{CancellationToken, DropGuard};
