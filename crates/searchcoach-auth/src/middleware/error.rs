//! Error response handling for the auth extractors.
//!
//! Every [`AuthError`] becomes a JSON body of the form
//! `{"error": "<code>", "message": "<text>"}`.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        let code = self.error_code();
        let message = match &self {
            // Configuration and internal details stay in the logs.
            AuthError::Configuration { .. } | AuthError::Internal { .. } => {
                tracing::error!(error = %self, "Authorization failed with a server error");
                "internal server error".to_string()
            }
            AuthError::TokenExpired => "Token has expired".to_string(),
            AuthError::Unauthorized { message }
            | AuthError::InvalidToken { message }
            | AuthError::Forbidden { message }
            | AuthError::InvalidRequest { message }
            | AuthError::MembershipUnavailable { message } => message.clone(),
        };

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(code, &message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        let body = json!({
            "error": code,
            "message": message,
        });

        (status, headers, Json(body)).into_response()
    }
}

fn status_code(error: &AuthError) -> StatusCode {
    match error {
        AuthError::Unauthorized { .. } | AuthError::InvalidToken { .. } | AuthError::TokenExpired => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuthError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        AuthError::MembershipUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Configuration { .. } | AuthError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="searchcoach", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('\"', "\\\"");
    format!("Bearer realm=\"searchcoach\", error=\"{error}\", error_description=\"{escaped_desc}\"")
}
