//! Unified API error handling with structured responses.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::AuthError;
use crate::user::StoreError;

/// Message returned to clients for any internal failure.
const INTERNAL_MESSAGE: &str = "Server error";

/// API error type with structured responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Duplicate registration. Existing clients expect 400 here, not 409.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Categorize an anyhow error by the typed error it carries.
    ///
    /// Only store and auth errors are recognized; everything else is
    /// `Internal`.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        let err = match err.downcast::<StoreError>() {
            Ok(store_err) => return store_err.into(),
            Err(err) => err,
        };
        match err.downcast::<AuthError>() {
            Ok(auth_err) => auth_err.into(),
            Err(err) => ApiError::Internal(format!("{err:#}")),
        }
    }
}

/// Structured error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub msg: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        let msg = match &self {
            ApiError::Internal(detail) => {
                error!(error_code = code, message = %detail, "API error");
                INTERNAL_MESSAGE.to_string()
            }
            other => {
                debug!(error_code = code, message = %other, "Client error");
                other.to_string()
            }
        };

        let body = ErrorResponse {
            msg,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::from_anyhow(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => ApiError::Conflict("User already exists".to_string()),
            StoreError::Database(e) => ApiError::Internal(format!("database error: {e}")),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(msg) => ApiError::Internal(format!("Authentication error: {msg}")),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

/// Malformed or non-JSON request bodies are validation failures.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_email_is_conflict() {
        let err = anyhow::Error::new(StoreError::DuplicateEmail("a@x.com".into()))
            .context("registering user");
        let api_err = ApiError::from_anyhow(err);
        assert!(matches!(api_err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_auth_error_is_unauthorized() {
        let err = anyhow::Error::new(AuthError::InvalidToken("expired".into()));
        assert!(matches!(ApiError::from_anyhow(err), ApiError::Unauthorized(_)));

        let err = anyhow::Error::new(AuthError::Internal("signing".into()));
        assert!(matches!(ApiError::from_anyhow(err), ApiError::Internal(_)));
    }

    #[test]
    fn test_untyped_error_is_internal() {
        // Message text alone never selects a category.
        let err = anyhow::anyhow!("user not found");
        assert!(matches!(ApiError::from_anyhow(err), ApiError::Internal(_)));
    }

    #[test]
    fn test_error_response_status_codes() {
        assert_eq!(ApiError::not_found("").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::bad_request("").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::conflict("").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::internal("").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let response = ApiError::internal("connection reset by peer").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.msg, "Server error");
        assert_eq!(body.code, "INTERNAL_ERROR");
    }
}
