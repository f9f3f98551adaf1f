//! User repository for database operations.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, instrument};

use super::models::User;
use crate::auth::Role;

/// Credential store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A user with this email already exists.
    #[error("User '{0}' already exists")]
    DuplicateEmail(String),

    /// The underlying database failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const USER_COLUMNS: &str = "id, email, password_hash, role, created_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new user ID.
    fn generate_id() -> String {
        format!("usr_{}", nanoid::nanoid!(12))
    }

    /// Create a new user.
    ///
    /// Fails with [`StoreError::DuplicateEmail`] when the email is taken. The
    /// uniqueness check is the database constraint itself, so concurrent
    /// inserts for the same email cannot both succeed.
    #[instrument(skip(self, password_hash))]
    pub async fn create(&self, email: &str, password_hash: &str, role: Role) -> StoreResult<User> {
        let id = Self::generate_id();
        debug!("Creating user: {} ({})", email, id);

        let sql = format!(
            "INSERT INTO users (id, email, password_hash, role) VALUES (?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&id)
            .bind(email)
            .bind(password_hash)
            .bind(role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, email))
    }

    /// Insert an admin user unless any admin already exists.
    ///
    /// The existence check and the insert are one statement, so two
    /// concurrent callers cannot both create an admin. Returns `None` when an
    /// admin was already present.
    #[instrument(skip(self, password_hash))]
    pub async fn create_admin_if_absent(
        &self,
        email: &str,
        password_hash: &str,
    ) -> StoreResult<Option<User>> {
        let id = Self::generate_id();

        let sql = format!(
            r#"
            INSERT INTO users (id, email, password_hash, role)
            SELECT ?, ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM users WHERE role = ?)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(&id)
            .bind(email)
            .bind(password_hash)
            .bind(Role::Admin)
            .bind(Role::Admin)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, email))
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by email. Matching is case-sensitive.
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get the earliest admin user, if any exists.
    #[instrument(skip(self))]
    pub async fn find_admin(&self) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY created_at, rowid LIMIT 1"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Role::Admin)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Count users by role.
    #[instrument(skip(self))]
    pub async fn count_by_role(&self, role: Role) -> StoreResult<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

fn map_unique_violation(err: sqlx::Error, email: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::DuplicateEmail(email.to_string())
        }
        _ => StoreError::Database(err),
    }
}
