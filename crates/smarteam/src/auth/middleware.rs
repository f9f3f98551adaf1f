//! Authentication middleware.

use axum::{
    extract::{FromRequestParts, State},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};

use super::{AuthError, AuthState, Claims, Role};

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// Cookie carrying the session token for browser clients.
pub const TOKEN_COOKIE: &str = "token";

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

fn is_bearer_scheme(header_value: &str) -> bool {
    header_value
        .split_whitespace()
        .next()
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("bearer"))
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == cookie_name {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// Locate the session token on a request.
///
/// Priority order:
/// 1. `x-auth-token` header
/// 2. `Authorization: Bearer <token>` header
/// 3. `token` cookie
///
/// A malformed Bearer header is an error; a non-Bearer scheme is skipped.
fn token_from_headers(headers: &HeaderMap) -> Result<&str, AuthError> {
    if let Some(token) = headers.get(TOKEN_HEADER) {
        let token = token.to_str().map_err(|_| AuthError::InvalidAuthHeader)?.trim();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    // Other schemes (Basic from a proxy, for instance) are not ours; fall
    // through to the cookie.
    if let Some(header) = headers.get(AUTHORIZATION) {
        let header = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
        if is_bearer_scheme(header) {
            return bearer_token_from_header(header);
        }
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(|cookies| token_from_cookie_header(cookies, TOKEN_COOKIE))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Verified token claims.
    pub claims: Claims,
}

impl CurrentUser {
    /// Get the user ID.
    pub fn id(&self) -> &str {
        &self.claims.sub
    }

    /// Role carried by the token. Informational only; the store is authoritative.
    pub fn role(&self) -> Role {
        self.claims.role
    }
}

/// Extract authentication from request.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Authentication middleware.
///
/// Validates the session token and injects `CurrentUser` into request extensions.
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = token_from_headers(req.headers())?;
    let claims = auth.verify_token(token)?;

    req.extensions_mut().insert(CurrentUser { claims });

    Ok(next.run(req).await)
}
