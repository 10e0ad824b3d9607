use serde::Serialize;

/// Body of a successful `/health` check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Base URL the check ran against.
    pub base_url: String,
    pub version: &'static str,
}
