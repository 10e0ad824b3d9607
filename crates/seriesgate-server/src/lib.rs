//! HTTP backend exposing the seriesgate query engine to a dashboard host.
//!
//! The host posts a batch of panel queries to `/query` and receives one
//! response per refId. `/health` verifies the configured credentials
//! against the remote compute service. This crate holds the server wiring:
//! application state, error mapping, handlers and routes.

pub mod error;
pub mod handlers;
pub mod router;
pub mod schema;
pub mod state;
