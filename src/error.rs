//! Error types for the HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
///
/// The surface has no per-resource lookups (an unknown user simply
/// reports status `unknown`), so every handler failure is a storage or
/// pipeline error surfaced as 500.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Internal error from the pipeline or storage
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Internal(ref err) = self;

        let body = Json(json!({
            "error": {
                "code": "INTERNAL_ERROR",
                "message": err.to_string(),
            }
        }));

        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_errors_surface_as_internal_server_error() {
        let response = ApiError::from(anyhow::anyhow!("storage broke")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
