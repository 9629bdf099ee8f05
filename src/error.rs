use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::federation::FederationError;

/// Request-level error taxonomy. Validation and conflict errors carry precise
/// client-facing messages; everything else is logged in full server-side and
/// reported to the client as an opaque message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Authentication(String),
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Federation(#[from] FederationError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::Federation(FederationError::Unsupported(provider)) => {
                warn!(provider = %provider, "oauth login with unsupported provider");
                (StatusCode::BAD_REQUEST, "Unsupported provider".to_string())
            }
            ApiError::Federation(err) => {
                // Upstream detail stays in the logs; the client gets a generic failure.
                error!(error = %err, "identity provider exchange failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "OAuth authentication failed".to_string(),
                )
            }
            ApiError::Internal(err) => {
                error!(error = ?err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
