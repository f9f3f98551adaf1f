//! API route definitions.

use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::{TOKEN_HEADER, auth_middleware};

use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(state.auth.allowed_origins());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    // Known path with the wrong method answers like an unknown route.
    // The auth layer only wraps the matched method, so it never runs for
    // the fallback.
    let protected_routes = Router::new().route(
        "/auth/me",
        get(handlers::get_me)
            .route_layer(middleware::from_fn_with_state(auth_state, auth_middleware))
            .fallback(handlers::not_found),
    );

    let public_routes = Router::new()
        .route(
            "/auth/register",
            post(handlers::register).fallback(handlers::not_found),
        )
        .route(
            "/auth/login",
            post(handlers::login).fallback(handlers::not_found),
        )
        .route(
            "/auth/logout",
            post(handlers::logout).fallback(handlers::not_found),
        );

    let api_routes = public_routes.merge(protected_routes).with_state(state);

    Router::new()
        .route(
            "/health",
            get(handlers::health).fallback(handlers::not_found),
        )
        .nest("/api", api_routes)
        .fallback(handlers::not_found)
        .layer(cors)
        .layer(trace_layer)
}

/// Build the CORS layer from the configured origins.
///
/// With no configured origins any origin is allowed, but without credentials.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
        header::COOKIE,
        HeaderName::from_static(TOKEN_HEADER),
    ];

    if allowed_origins.is_empty() {
        tracing::warn!("CORS: No origins configured, allowing any origin without credentials");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::error!("CORS: All configured origins are invalid!");
    } else {
        tracing::info!("CORS: Allowing {} origin(s)", origins.len());
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn origin_request(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/health")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, TOKEN_HEADER)
            .body(Body::empty())
            .unwrap()
    }

    fn cors_app(origins: &[String]) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .layer(build_cors_layer(origins))
    }

    #[tokio::test]
    async fn test_cors_configured_origin() {
        let app = cors_app(&["http://localhost:3000".to_string()]);

        let response = app
            .oneshot(origin_request("http://localhost:3000"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
        let allowed = headers
            .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(allowed.contains(TOKEN_HEADER));
    }

    #[tokio::test]
    async fn test_cors_unlisted_origin() {
        let app = cors_app(&["http://localhost:3000".to_string()]);

        let response = app
            .oneshot(origin_request("http://evil.example"))
            .await
            .unwrap();

        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_cors_any_origin_when_unconfigured() {
        let app = cors_app(&[]);

        let response = app
            .oneshot(origin_request("http://anywhere.example"))
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }
}
