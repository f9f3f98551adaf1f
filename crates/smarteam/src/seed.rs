//! Default administrator seeding.
//!
//! Run once at startup after the database connects. Ensures at least one
//! admin account exists; when one is already present nothing changes.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::auth::resolve_env_reference;
use crate::user::{StoreError, User, UserService};

/// Credentials for the default administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSeedConfig {
    /// Seed an admin at startup when none exists.
    pub enabled: bool,
    /// Admin email. Supports `env:VAR_NAME` indirection.
    pub email: String,
    /// Admin plaintext password. Supports `env:VAR_NAME` indirection.
    pub password: String,
}

impl Default for AdminSeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            email: "env:ADMIN_EMAIL".to_string(),
            password: "env:ADMIN_PASSWORD".to_string(),
        }
    }
}

/// Result of a seeding attempt.
#[derive(Debug)]
pub enum SeedOutcome {
    /// A new admin account was created.
    Created(User),
    /// An admin already existed; nothing was written.
    AlreadyPresent,
    /// Seeding is turned off in configuration.
    Disabled,
}

/// Ensure an admin account exists.
///
/// Idempotent: a second run, or a run racing another seeder, reports
/// [`SeedOutcome::AlreadyPresent`].
#[instrument(skip_all)]
pub async fn seed_admin(users: &UserService, config: &AdminSeedConfig) -> Result<SeedOutcome> {
    if !config.enabled {
        return Ok(SeedOutcome::Disabled);
    }

    if users.find_admin().await?.is_some() {
        return Ok(SeedOutcome::AlreadyPresent);
    }

    info!("No admin found, seeding default admin...");

    let email = resolve_env_reference(&config.email).context("resolving admin email")?;
    let password = resolve_env_reference(&config.password).context("resolving admin password")?;
    if email.trim().is_empty() || password.is_empty() {
        bail!("admin email and password must not be empty");
    }

    match users.create_admin_if_absent(&email, &password).await? {
        Some(admin) => Ok(SeedOutcome::Created(admin)),
        None => Ok(SeedOutcome::AlreadyPresent),
    }
}

/// Startup wrapper around [`seed_admin`].
///
/// Failures are logged and swallowed: the API is still served without a
/// seeded admin.
pub async fn run_startup_seed(users: &UserService, config: &AdminSeedConfig) {
    match seed_admin(users, config).await {
        Ok(SeedOutcome::Created(admin)) => {
            info!(user_id = %admin.id, email = %admin.email, "Admin seeded");
        }
        Ok(SeedOutcome::AlreadyPresent) => info!("Admin already exists"),
        Ok(SeedOutcome::Disabled) => debug!("Admin seeding disabled"),
        Err(e) => {
            if let Some(StoreError::DuplicateEmail(email)) = e.downcast_ref::<StoreError>() {
                error!(
                    "Seeding admin failed: '{}' is already registered as a regular user",
                    email
                );
            } else {
                error!("Seeding admin failed: {:#}", e);
            }
        }
    }
}
