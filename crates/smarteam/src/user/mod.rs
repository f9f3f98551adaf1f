//! User management module.
//!
//! Provides the credential store and the registration/login logic built on it.

mod models;
mod repository;
mod service;

pub use models::{User, UserInfo};
pub use repository::{StoreError, StoreResult, UserRepository};
pub use service::UserService;
