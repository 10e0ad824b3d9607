//! API schema types not shared with the engine.
//!
//! Query batch request and response types live in `seriesgate-core`.

pub mod health;
