//! HTTP handlers.
//!
//! Handlers decode the request, resolve credentials for the batch and hand
//! over to the engine. No query logic lives here.

pub mod health;
pub mod query;
