//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Default session token lifetime: one day.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60 * 24;

/// Default bcrypt work factor.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Minimum accepted JWT secret length.
const MIN_SECRET_LEN: usize = 32;

/// Work factor range accepted by bcrypt.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT secret for HS256. Supports `env:VAR_NAME` indirection.
    /// Required; the server refuses to start without it.
    pub jwt_secret: Option<String>,

    /// Session token lifetime in seconds.
    pub token_ttl_secs: i64,

    /// bcrypt work factor used for new password hashes.
    pub bcrypt_cost: u32,

    /// Allowed CORS origins. An empty list allows any origin without credentials.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // No default JWT secret - must be explicitly configured
            jwt_secret: None,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    /// Returns the resolved secret or None if not configured.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        self.jwt_secret
            .as_deref()
            .map(resolve_env_reference)
            .transpose()
    }

    /// Validate the configuration and return the resolved secret.
    pub fn validate(&self) -> Result<String, ConfigValidationError> {
        let secret = self
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigValidationError::JwtSecretTooShort);
        }

        if self.token_ttl_secs <= 0 {
            return Err(ConfigValidationError::InvalidTokenTtl(self.token_ttl_secs));
        }

        if !BCRYPT_COST_RANGE.contains(&self.bcrypt_cost) {
            return Err(ConfigValidationError::InvalidBcryptCost(self.bcrypt_cost));
        }

        Ok(secret)
    }

    /// Generate a secure random JWT secret using cryptographically secure RNG.
    pub fn generate_jwt_secret() -> String {
        use rand::Rng;

        const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        const SECRET_LENGTH: usize = 64;

        let mut rng = rand::rng();
        (0..SECRET_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..CHARSET.len());
                CHARSET[idx] as char
            })
            .collect()
    }
}

/// Resolve a configuration value, expanding `env:VAR_NAME` to the variable's value.
pub fn resolve_env_reference(value: &str) -> Result<String, ConfigValidationError> {
    match value.strip_prefix("env:") {
        Some(var_name) => match std::env::var(var_name) {
            Ok(resolved) if !resolved.is_empty() => Ok(resolved),
            Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
            Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
        },
        None => Ok(value.to_string()),
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    /// JWT secret is required.
    #[error(
        "JWT secret is required. Set SMARTEAM__AUTH__JWT_SECRET or auth.jwt_secret in config."
    )]
    MissingJwtSecret,
    /// JWT secret is too short.
    #[error("JWT secret must be at least 32 characters long.")]
    JwtSecretTooShort,
    /// Token lifetime must be positive.
    #[error("token_ttl_secs must be positive, got {0}")]
    InvalidTokenTtl(i64),
    /// bcrypt cost outside the range bcrypt accepts.
    #[error("bcrypt_cost must be between 4 and 31, got {0}")]
    InvalidBcryptCost(u32),
    /// Environment variable not found (for `env:VAR_NAME` syntax).
    #[error("Environment variable '{0}' not found (referenced via env:{0} in config).")]
    EnvVarNotFound(String),
    /// Environment variable is empty (for `env:VAR_NAME` syntax).
    #[error("Environment variable '{0}' is empty (referenced via env:{0} in config).")]
    EnvVarEmpty(String),
}
