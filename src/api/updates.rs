//! User update endpoints
//!
//! `POST /updates/{user_id}` submits a whole-user update (fire and
//! forget); `GET /updates/{user_id}/status` is what the UI polls while
//! the job chain runs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::ApiResult;
use crate::services::UpdateStatus;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: String,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: UpdateStatus,
}

/// POST /updates/{user_id}
///
/// Accepts immediately; the job chain runs in the background.
pub async fn submit_update(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    state.orchestrator.submit(user_id);

    tracing::info!(user_id, "Update submitted");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            status: "submitted".to_string(),
            user_id,
        }),
    ))
}

/// GET /updates/{user_id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<StatusResponse>> {
    let status = state.progress.get_status(user_id).await?;
    Ok(Json(StatusResponse { status }))
}

/// Build update routes
pub fn update_routes() -> Router<AppState> {
    Router::new()
        .route("/updates/:user_id", post(submit_update))
        .route("/updates/:user_id/status", get(update_status))
}
