use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use seriesgate_core::{QueryDataRequest, QueryDataResponse};
use seriesgate_engine::{CancellationToken, DropGuard, LayeredCredentials};

use crate::error::ApiError;
use crate::state::AppState;

/// Executes a batch of panel queries.
///
/// `POST /query`
///
/// Responds 200 whenever the envelope decodes; per-query failures are
/// reported inside the body.
pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryDataRequest>, JsonRejection>,
) -> Result<Json<QueryDataResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let credentials = LayeredCredentials {
        inline: request.datasource.as_ref(),
        defaults: &state.default_settings,
    };
    // Held until the handler returns or is dropped on client disconnect.
    let (cancel, _guard) = batch_token(&state.shutdown);

    let response = state.engine.execute(&credentials, &request, &cancel).await;
    Ok(Json(response))
}

/// A token cancelled on server shutdown or when the guard is dropped.
fn batch_token(shutdown: &CancellationToken) -> (CancellationToken, DropGuard) {
    let cancel = shutdown.child_token();
    let guard = cancel.clone().drop_guard();
    (cancel, guard)
}
