//! Password hashing with bcrypt.
//!
//! Hashing and verification are CPU-bound and run on the blocking thread
//! pool, never on the async executor.

use anyhow::{Context, Result};

use super::config::DEFAULT_BCRYPT_COST;

/// Salted one-way password hasher.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt work factor.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Work factor applied to new hashes.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password with a fresh random salt.
    pub async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .context("password hashing task failed")?
            .context("Failed to hash password")
    }

    /// Verify a plaintext password against a stored bcrypt hash.
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .context("password verification task failed")?
            .context("Failed to verify password")
    }
}
