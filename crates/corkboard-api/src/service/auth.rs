use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use anyhow::anyhow;
use uuid::Uuid;

use corkboard_db::models::{UserPatch, UserRow};
use corkboard_db::{Database, is_constraint_violation};

use crate::error::ApiError;

/// Account registration, credential checks, and user CRUD.
///
/// Duplicate pre-checks are an optimization; the DB unique constraints are
/// the authoritative backstop, so a constraint failure after a clean
/// pre-check still surfaces as a conflict.
#[derive(Clone)]
pub struct AuthService {
    db: Arc<Database>,
}

impl AuthService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserRow, ApiError> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(ApiError::Validation(
                "username, email and password are required".into(),
            ));
        }

        if self.db.get_user_by_username(username)?.is_some() {
            return Err(ApiError::Conflict("username already taken".into()));
        }
        if self.db.get_user_by_email(email)?.is_some() {
            return Err(ApiError::Conflict("email already registered".into()));
        }

        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4().to_string();

        self.db
            .create_user(&id, username, email, &password_hash)
            .map_err(conflict_or_internal)?;

        self.db
            .get_user_by_id(&id)?
            .ok_or_else(|| ApiError::Internal(anyhow!("user vanished after insert")))
    }

    /// Verify credentials. A missing user and a wrong password produce the
    /// same error, so callers cannot tell which check failed.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<UserRow, ApiError> {
        let user = self
            .db
            .get_user_by_username(username)?
            .ok_or(ApiError::Unauthorized)?;

        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| ApiError::Internal(anyhow!("stored hash unparsable: {}", e)))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(user)
    }

    pub fn get_user(&self, id: &str) -> Result<UserRow, ApiError> {
        self.db
            .get_user_by_id(id)?
            .ok_or_else(|| ApiError::NotFound("user not found".into()))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>, ApiError> {
        Ok(self.db.list_users()?)
    }

    /// Apply a partial update; only present fields change. Each present
    /// unique field is re-validated against other users before the write.
    pub fn update_user(
        &self,
        id: &str,
        username: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<UserRow, ApiError> {
        // Ensure the target exists before duplicate checks so a missing
        // user reports 404, not 409.
        self.get_user(id)?;

        if let Some(username) = username {
            if username.is_empty() {
                return Err(ApiError::Validation("username must not be empty".into()));
            }
            if let Some(other) = self.db.get_user_by_username(username)?
                && other.id != id
            {
                return Err(ApiError::Conflict("username already taken".into()));
            }
        }
        if let Some(email) = email {
            if email.is_empty() {
                return Err(ApiError::Validation("email must not be empty".into()));
            }
            if let Some(other) = self.db.get_user_by_email(email)?
                && other.id != id
            {
                return Err(ApiError::Conflict("email already registered".into()));
            }
        }
        if let Some(password) = password
            && password.is_empty()
        {
            return Err(ApiError::Validation("password must not be empty".into()));
        }

        let patch = UserPatch {
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            password_hash: password.map(hash_password).transpose()?,
        };

        let updated = self.db.update_user(id, &patch).map_err(conflict_or_internal)?;
        if !updated {
            return Err(ApiError::NotFound("user not found".into()));
        }
        self.get_user(id)
    }

    /// Delete a user row. The caller is responsible for removing the
    /// avatar file first; contact messages keep their rows with a nulled
    /// owner (FK action).
    pub fn delete_user(&self, id: &str) -> Result<UserRow, ApiError> {
        let user = self.get_user(id)?;
        if !self.db.delete_user(id)? {
            return Err(ApiError::NotFound("user not found".into()));
        }
        Ok(user)
    }

    pub fn set_avatar(&self, id: &str, avatar: Option<&str>) -> Result<(), ApiError> {
        if !self.db.set_user_avatar(id, avatar)? {
            return Err(ApiError::NotFound("user not found".into()));
        }
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {}", e)))?
        .to_string();
    Ok(hash)
}

fn conflict_or_internal(err: anyhow::Error) -> ApiError {
    if is_constraint_violation(&err) {
        // TOCTOU window: the pre-check passed but the insert lost the race.
        ApiError::Conflict("username or email already in use".into())
    } else {
        ApiError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn register_then_authenticate() {
        let auth = service();
        let user = auth
            .create_user("alice", "alice@example.com", "hunter2")
            .unwrap();
        assert_ne!(user.password, "hunter2");
        assert!(!user.password.is_empty());

        let found = auth.authenticate("alice", "hunter2").unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn authenticate_failure_is_opaque() {
        let auth = service();
        auth.create_user("alice", "alice@example.com", "hunter2")
            .unwrap();

        let wrong_password = auth.authenticate("alice", "wrong").unwrap_err();
        let missing_user = auth.authenticate("nobody", "hunter2").unwrap_err();
        assert_eq!(wrong_password.to_string(), missing_user.to_string());
        assert!(matches!(wrong_password, ApiError::Unauthorized));
        assert!(matches!(missing_user, ApiError::Unauthorized));
    }

    #[test]
    fn duplicate_registration_conflicts_without_insert() {
        let auth = service();
        auth.create_user("alice", "alice@example.com", "pw").unwrap();

        let dup_name = auth
            .create_user("alice", "other@example.com", "pw")
            .unwrap_err();
        assert!(matches!(dup_name, ApiError::Conflict(_)));

        let dup_email = auth
            .create_user("bob", "alice@example.com", "pw")
            .unwrap_err();
        assert!(matches!(dup_email, ApiError::Conflict(_)));

        assert_eq!(auth.list_users().unwrap().len(), 1);
    }

    #[test]
    fn empty_fields_fail_validation() {
        let auth = service();
        let err = auth.create_user("", "a@x.com", "pw").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(auth.list_users().unwrap().is_empty());
    }

    #[test]
    fn patch_revalidates_uniqueness_per_field() {
        let auth = service();
        let alice = auth.create_user("alice", "alice@example.com", "pw").unwrap();
        auth.create_user("bob", "bob@example.com", "pw").unwrap();

        let err = auth
            .update_user(&alice.id, Some("bob"), None, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Re-submitting your own username is not a conflict
        let same = auth
            .update_user(&alice.id, Some("alice"), Some("new@example.com"), None)
            .unwrap();
        assert_eq!(same.email, "new@example.com");
    }

    #[test]
    fn patch_password_rehashes() {
        let auth = service();
        let alice = auth.create_user("alice", "alice@example.com", "old").unwrap();

        auth.update_user(&alice.id, None, None, Some("new")).unwrap();
        assert!(auth.authenticate("alice", "new").is_ok());
        assert!(matches!(
            auth.authenticate("alice", "old").unwrap_err(),
            ApiError::Unauthorized
        ));
    }

    #[test]
    fn missing_user_is_not_found() {
        let auth = service();
        assert!(matches!(
            auth.get_user("missing").unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            auth.update_user("missing", Some("x"), None, None).unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            auth.delete_user("missing").unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}
