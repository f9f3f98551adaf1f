//! Authentication errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token on the request.
    #[error("no token, authorization denied")]
    MissingToken,

    /// Invalid authorization header format.
    #[error("invalid authorization header format")]
    InvalidAuthHeader,

    /// Token failed verification: bad signature, malformed payload or expired.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Internal error.
    #[error("internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "MISSING_TOKEN"),
            AuthError::InvalidAuthHeader => (StatusCode::UNAUTHORIZED, "INVALID_AUTH_HEADER"),
            AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            AuthError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct AuthErrorResponse {
    pub msg: String,
    pub code: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let msg = match &self {
            AuthError::Internal(detail) => {
                tracing::error!(error_code = code, message = %detail, "Authentication error");
                "Server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(AuthErrorResponse { msg, code })).into_response()
    }
}
