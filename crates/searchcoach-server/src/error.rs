use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use searchcoach_auth::AuthError;
use searchcoach_storage::StorageError;
use serde_json::json;

/// Errors returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(err) => err.into_response(),
            Self::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not_found", "message": message })),
            )
                .into_response(),
            Self::Storage(err) if err.is_invalid_entity() => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "invalid_request", "message": err.to_string() })),
            )
                .into_response(),
            Self::Storage(err) => {
                tracing::error!(error = %err, "Storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "server_error", "message": "storage unavailable" })),
                )
                    .into_response()
            }
        }
    }
}
