use axum::extract::State;
use axum::Json;
use seriesgate_engine::{CredentialSource, LayeredCredentials};

use crate::error::ApiError;
use crate::schema::health::HealthResponse;
use crate::state::AppState;

/// Checks the default credentials against the remote service.
///
/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let settings = LayeredCredentials {
        inline: None,
        defaults: &state.default_settings,
    }
    .load()?;

    state.engine.client().check_connection(&settings).await?;

    Ok(Json(HealthResponse {
        status: "ok",
        base_url: settings.base_url().to_string(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}
