use std::sync::Arc;

use uuid::Uuid;

use corkboard_db::models::ContactRow;
use corkboard_db::{Database, is_constraint_violation};

use crate::error::ApiError;

/// Contact-message board: create and list, never update or delete.
#[derive(Clone)]
pub struct ContactService {
    db: Arc<Database>,
}

impl ContactService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Validation is presence-only, matching the form behavior. An owner
    /// id, when given, must name an existing user; the FK constraint is
    /// the backstop for the pre-check.
    pub fn create_message(
        &self,
        name: &str,
        email: &str,
        message: &str,
        user_id: Option<&str>,
    ) -> Result<ContactRow, ApiError> {
        if name.is_empty() || email.is_empty() || message.is_empty() {
            return Err(ApiError::Validation(
                "name, email and message are required".into(),
            ));
        }

        if let Some(uid) = user_id
            && self.db.get_user_by_id(uid)?.is_none()
        {
            return Err(ApiError::Validation("user_id does not exist".into()));
        }

        let id = Uuid::new_v4().to_string();
        self.db
            .insert_contact(&id, name, email, message, user_id)
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    ApiError::Validation("user_id does not exist".into())
                } else {
                    ApiError::Internal(e)
                }
            })?;

        self.db
            .get_contact(&id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("contact vanished after insert")))
    }

    pub fn list_all(&self) -> Result<Vec<ContactRow>, ApiError> {
        Ok(self.db.list_contacts()?)
    }

    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<ContactRow>, ApiError> {
        Ok(self.db.list_contacts_by_user(user_id)?)
    }

    pub fn get(&self, id: &str) -> Result<ContactRow, ApiError> {
        self.db
            .get_contact(id)?
            .ok_or_else(|| ApiError::NotFound("message not found".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ContactService {
        ContactService::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn round_trip_single_message() {
        let contacts = service();
        let created = contacts
            .create_message("A", "a@x.com", "hi", None)
            .unwrap();

        let all = contacts.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, created.id);
        assert_eq!(all[0].name, "A");
        assert_eq!(all[0].email, "a@x.com");
        assert_eq!(all[0].message, "hi");
        assert!(!all[0].created_at.is_empty());
    }

    #[test]
    fn empty_message_fails_validation_and_inserts_nothing() {
        let contacts = service();
        let err = contacts.create_message("A", "a@x.com", "", None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(contacts.list_all().unwrap().is_empty());
    }

    #[test]
    fn unknown_owner_fails_validation() {
        let contacts = service();
        let err = contacts
            .create_message("A", "a@x.com", "hi", Some("no-such-user"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(contacts.list_all().unwrap().is_empty());
    }

    #[test]
    fn get_missing_is_not_found() {
        let contacts = service();
        assert!(matches!(
            contacts.get("missing").unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}
