//! User service for business logic.

use anyhow::Result;
use tracing::{info, instrument};

use super::models::User;
use super::repository::UserRepository;
use crate::auth::{PasswordHasher, Role};

/// Service for user registration and credential checks.
#[derive(Debug, Clone)]
pub struct UserService {
    repo: UserRepository,
    hasher: PasswordHasher,
}

impl UserService {
    /// Create a new user service.
    pub fn new(repo: UserRepository, hasher: PasswordHasher) -> Self {
        Self { repo, hasher }
    }

    /// Register a new regular user.
    ///
    /// Duplicate emails surface as [`super::StoreError::DuplicateEmail`]
    /// inside the returned error.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let password_hash = self.hasher.hash(password).await?;
        let user = self.repo.create(email, &password_hash, Role::User).await?;
        info!(user_id = %user.id, "Registered new user");

        Ok(user)
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.repo.get(id).await?)
    }

    /// Verify user credentials.
    ///
    /// Returns `None` for an unknown email or a wrong password.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.repo.find_by_email(email).await? else {
            return Ok(None);
        };

        if self.hasher.verify(password, &user.password_hash).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Get any admin user.
    #[instrument(skip(self))]
    pub async fn find_admin(&self) -> Result<Option<User>> {
        Ok(self.repo.find_admin().await?)
    }

    /// Create an admin with the given credentials unless one already exists.
    ///
    /// Returns `None` if an admin was already present, including one created
    /// concurrently by another caller.
    #[instrument(skip(self, password))]
    pub async fn create_admin_if_absent(&self, email: &str, password: &str) -> Result<Option<User>> {
        let password_hash = self.hasher.hash(password).await?;
        let created = self.repo.create_admin_if_absent(email, &password_hash).await?;

        if let Some(ref admin) = created {
            info!(user_id = %admin.id, "Created admin user");
        }

        Ok(created)
    }

    /// Count users with the given role.
    #[instrument(skip(self))]
    pub async fn count_by_role(&self, role: Role) -> Result<i64> {
        Ok(self.repo.count_by_role(role).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::user::StoreError;

    async fn setup_service() -> UserService {
        let db = Database::in_memory().await.unwrap();
        UserService::new(UserRepository::new(db.pool().clone()), PasswordHasher::new(4))
    }

    /// Service over a pooled on-disk database, so writers really contend.
    async fn file_backed_service(dir: &std::path::Path) -> UserService {
        let url = crate::db::sqlite_url_for_path(&dir.join("users.db"));
        let db = Database::connect(&url).await.unwrap();
        UserService::new(UserRepository::new(db.pool().clone()), PasswordHasher::new(4))
    }

    #[tokio::test]
    async fn test_register_hashes_password() {
        let service = setup_service().await;
        let user = service.register("a@x.com", "secret").await.unwrap();

        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.role, Role::User);
        assert_ne!(user.password_hash, "secret");
        assert!(user.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let service = setup_service().await;
        service.register("a@x.com", "secret").await.unwrap();

        let err = service.register("a@x.com", "other").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::DuplicateEmail(_))
        ));

        // Original credentials still work, the new ones do not.
        assert!(service.verify_credentials("a@x.com", "secret").await.unwrap().is_some());
        assert!(service.verify_credentials("a@x.com", "other").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_same_email() {
        let dir = tempfile::tempdir().unwrap();
        let service = file_backed_service(dir.path()).await;

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let service = service.clone();
            tasks.spawn(async move { service.register("race@x.com", &format!("pw-{i}")).await });
        }

        let mut created = 0;
        let mut duplicates = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) => created += 1,
                Err(err) => {
                    assert!(
                        matches!(
                            err.downcast_ref::<StoreError>(),
                            Some(StoreError::DuplicateEmail(_))
                        ),
                        "unexpected error: {err:#}"
                    );
                    duplicates += 1;
                }
            }
        }

        assert_eq!((created, duplicates), (1, 7));
        assert_eq!(service.count_by_role(Role::User).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let service = setup_service().await;
        let user = service.register("a@x.com", "secret").await.unwrap();

        let verified = service
            .verify_credentials("a@x.com", "secret")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(verified.id, user.id);

        assert!(service.verify_credentials("a@x.com", "wrong").await.unwrap().is_none());
        assert!(service.verify_credentials("b@x.com", "secret").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_admin_if_absent() {
        let service = setup_service().await;

        let admin = service
            .create_admin_if_absent("admin@x.com", "adminpw")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(service.verify_credentials("admin@x.com", "adminpw").await.unwrap().is_some());

        assert!(service
            .create_admin_if_absent("second@x.com", "adminpw")
            .await
            .unwrap()
            .is_none());
        assert_eq!(service.count_by_role(Role::Admin).await.unwrap(), 1);
    }
}
