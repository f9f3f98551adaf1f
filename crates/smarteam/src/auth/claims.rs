//! JWT claims and user roles.

use serde::{Deserialize, Serialize};

/// User role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user.
    #[default]
    User,
    /// Administrator.
    Admin,
}

impl Role {
    /// Wire and storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,

    /// Role at issuance time.
    #[serde(default)]
    pub role: Role,

    /// Issued at (as Unix timestamp).
    pub iat: i64,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Build claims for a user valid for `ttl_secs` from `issued_at`.
    pub fn new(user_id: impl Into<String>, role: Role, issued_at: i64, ttl_secs: i64) -> Self {
        Self {
            sub: user_id.into(),
            role,
            iat: issued_at,
            exp: issued_at + ttl_secs,
        }
    }

    /// Check if the token holder has admin role.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
