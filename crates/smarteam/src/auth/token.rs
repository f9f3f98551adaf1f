//! Session token issuance and verification.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::debug;

use super::{AuthConfig, AuthError, Claims, ConfigValidationError, PasswordHasher, Role};

/// Authentication state shared across handlers.
///
/// Holds the signing keys derived once from the configured secret.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("token_ttl_secs", &self.config.token_ttl_secs)
            .field("bcrypt_cost", &self.config.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

impl AuthState {
    /// Create new auth state from config.
    /// Resolves `env:VAR_NAME` syntax in jwt_secret and validates the result.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigValidationError> {
        let secret = config.validate()?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            config: Arc::new(config),
        })
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Session token lifetime in seconds.
    pub fn token_ttl_secs(&self) -> i64 {
        self.config.token_ttl_secs
    }

    /// Password hasher configured with the bcrypt cost from config.
    pub fn password_hasher(&self) -> PasswordHasher {
        PasswordHasher::new(self.config.bcrypt_cost)
    }

    /// Issue a signed token for a user, valid from now.
    pub fn issue_token(&self, user_id: &str, role: Role) -> Result<String, AuthError> {
        self.issue_token_at(user_id, role, Utc::now().timestamp())
    }

    /// Issue a signed token as if it were issued at `issued_at` (Unix seconds).
    pub fn issue_token_at(
        &self,
        user_id: &str,
        role: Role,
        issued_at: i64,
    ) -> Result<String, AuthError> {
        let claims = Claims::new(user_id, role, issued_at, self.config.token_ttl_secs);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Validate a token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!("JWT validation failed: {:?}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AuthError::InvalidToken("token expired".to_string())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}
