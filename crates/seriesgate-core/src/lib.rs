//! Data model and CPU-only stages of the seriesgate query pipeline.
//!
//! Everything here is pure: decoding host queries, template interpolation,
//! classification and validation, compute request construction, the remote
//! API wire types, and conversion of result plots into time series. The
//! async dispatch engine lives in `seriesgate-engine`.

pub mod builder;
pub mod classify;
pub mod compute;
pub mod error;
pub mod interpolate;
pub mod model;
pub mod response;
pub mod transform;

pub use builder::build_compute_request;
pub use classify::{prepare, AssetChannelTarget, QueryTarget, ValidatedQuery};
pub use compute::{ComputeRequest, ComputeResult, Plot};
pub use error::QueryError;
pub use model::{DataQuery, DatasourceSettings, QueryDataRequest, QueryKind, TimeRange};
pub use response::{ErrorDetail, QueryDataResponse, QueryResponse, TimeSeries};
pub use transform::plot_to_series;
