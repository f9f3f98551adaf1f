//! Authentication module.
//!
//! Provides:
//! - bcrypt password hashing off the async executor
//! - HS256 session token issuance and verification
//! - middleware that authenticates requests via the `x-auth-token` header

mod claims;
mod config;
mod error;
mod middleware;
mod password;
mod token;

pub use claims::{Claims, Role};
pub use config::{
    AuthConfig, ConfigValidationError, DEFAULT_BCRYPT_COST, DEFAULT_TOKEN_TTL_SECS,
    resolve_env_reference,
};
pub use error::AuthError;
pub use middleware::{CurrentUser, TOKEN_COOKIE, TOKEN_HEADER, auth_middleware};
pub use password::PasswordHasher;
pub use token::AuthState;
