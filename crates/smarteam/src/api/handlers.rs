//! API request handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, Uri, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::auth::{CurrentUser, Role, TOKEN_COOKIE};
use crate::user::UserInfo;

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Register and login request body.
///
/// Both fields are optional at the wire level so a missing field is reported
/// as a validation error instead of a deserialization failure.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsRequest {
    /// Split into `(email, password)`, treating empty strings as missing.
    fn require_fields(self) -> ApiResult<(String, String)> {
        let email = self.email.filter(|e| !e.is_empty());
        let password = self.password.filter(|p| !p.is_empty());

        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(ApiError::bad_request("Please enter all fields")),
        }
    }
}

/// Register and login response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub role: Role,
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}")
}

/// Build the success response shared by register and login.
fn issue_session(state: &AppState, user_id: &str, role: Role) -> ApiResult<Response> {
    let token = state.auth.issue_token(user_id, role)?;
    let cookie = session_cookie(&token, state.auth.token_ttl_secs());

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(AuthResponse { token, role }),
    )
        .into_response())
}

/// Register a new regular user.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let (email, password) = request.require_fields()?;

    let user = state.users.register(&email, &password).await?;
    info!(user_id = %user.id, "User registered successfully");

    issue_session(&state, &user.id, user.role)
}

/// Login with email and password.
///
/// Unknown email and wrong password produce the same response.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let (email, password) = request.require_fields()?;

    let Some(user) = state.users.verify_credentials(&email, &password).await? else {
        warn!("Rejected login attempt");
        return Err(ApiError::bad_request("Invalid credentials"));
    };

    info!(user_id = %user.id, "User logged in successfully");
    issue_session(&state, &user.id, user.role)
}

/// Logout endpoint (clears the session cookie).
pub async fn logout() -> impl IntoResponse {
    let cookie = session_cookie("", 0);

    (AppendHeaders([(SET_COOKIE, cookie)]), StatusCode::NO_CONTENT)
}

/// Get the authenticated user's profile.
///
/// The role comes from the store, not from the token.
#[instrument(skip(state, user), fields(user_id = %user.id()))]
pub async fn get_me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<UserInfo>> {
    let db_user = state
        .users
        .get_user(user.id())
        .await?
        .ok_or_else(|| ApiError::unauthorized("user no longer exists"))?;

    Ok(Json(db_user.into()))
}

/// Fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}
