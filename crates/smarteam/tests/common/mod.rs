//! Test utilities and common setup.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response, header};
use serde_json::Value;
use smarteam::api::{self, AppState};
use smarteam::auth::{AuthConfig, AuthState};
use smarteam::db::Database;
use smarteam::seed::{self, AdminSeedConfig};
use smarteam::user::{UserRepository, UserService};

pub const TEST_SECRET: &str = "test-secret-for-integration-tests-minimum-32-chars";

/// Create a test AuthConfig with a fixed secret and the cheapest bcrypt cost.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Some(TEST_SECRET.to_string()),
        bcrypt_cost: 4,
        ..AuthConfig::default()
    }
}

/// Auth state sharing the test app's signing key.
pub fn test_auth_state() -> AuthState {
    AuthState::new(test_auth_config()).unwrap()
}

async fn test_user_service(auth: &AuthState) -> UserService {
    let db = Database::in_memory().await.unwrap();
    UserService::new(
        UserRepository::new(db.pool().clone()),
        auth.password_hasher(),
    )
}

/// Create a test application backed by an in-memory database.
pub async fn test_app() -> Router {
    let auth = test_auth_state();
    let users = test_user_service(&auth).await;

    api::create_router(AppState::new(users, auth))
}

/// Create a test application with an admin seeded the way `serve` does.
pub async fn test_app_with_admin(email: &str, password: &str) -> Router {
    let auth = test_auth_state();
    let users = test_user_service(&auth).await;

    let admin = AdminSeedConfig {
        enabled: true,
        email: email.to_string(),
        password: password.to_string(),
    };
    seed::run_startup_seed(&users, &admin).await;

    api::create_router(AppState::new(users, auth))
}

/// Build a JSON POST request.
pub fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

/// Build a GET request with optional extra headers.
pub fn get_with_headers(uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method(Method::GET);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Read the `Set-Cookie` header, or an empty string.
pub fn set_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
