//! HTTP API module.
//!
//! Provides the `/api/auth` endpoints plus a health check.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{AuthResponse, CredentialsRequest, HealthResponse};
pub use routes::create_router;
pub use state::AppState;
