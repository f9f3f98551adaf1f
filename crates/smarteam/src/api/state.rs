//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::AuthState;
use crate::user::UserService;

/// Application state shared across all handlers.
///
/// Holds the pool-backed user service and the immutable signing keys.
#[derive(Clone, Debug)]
pub struct AppState {
    /// User service for registration and credential checks.
    pub users: Arc<UserService>,
    /// Token signing and verification.
    pub auth: AuthState,
}

impl AppState {
    /// Create new application state.
    pub fn new(users: UserService, auth: AuthState) -> Self {
        Self {
            users: Arc::new(users),
            auth,
        }
    }
}
