use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::Database;
use crate::models::{ContactRow, UserPatch, UserRow};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, email, password, avatar, created_at
                 FROM users ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Apply a partial update. Builds the SET clause from the fields that
    /// are present; returns false when the user does not exist.
    pub fn update_user(&self, id: &str, patch: &UserPatch) -> Result<bool> {
        if patch.is_empty() {
            return Ok(self.get_user_by_id(id)?.is_some());
        }

        self.with_conn(|conn| {
            let mut sets: Vec<String> = Vec::new();
            let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

            if let Some(username) = &patch.username {
                sets.push(format!("username = ?{}", params.len() + 1));
                params.push(username);
            }
            if let Some(email) = &patch.email {
                sets.push(format!("email = ?{}", params.len() + 1));
                params.push(email);
            }
            if let Some(hash) = &patch.password_hash {
                sets.push(format!("password = ?{}", params.len() + 1));
                params.push(hash);
            }

            let sql = format!(
                "UPDATE users SET {} WHERE id = ?{}",
                sets.join(", "),
                params.len() + 1
            );
            params.push(&id);

            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed > 0)
        })
    }

    pub fn set_user_avatar(&self, id: &str, avatar: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET avatar = ?1 WHERE id = ?2",
                rusqlite::params![avatar, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete a user. Contact messages keep their rows; the FK action
    /// nulls their user_id. Returns false when the user does not exist.
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Contacts --

    pub fn insert_contact(
        &self,
        id: &str,
        name: &str,
        email: &str,
        message: &str,
        user_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO contacts (id, name, email, message, user_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, email, message, user_id],
            )?;
            Ok(())
        })
    }

    pub fn get_contact(&self, id: &str) -> Result<Option<ContactRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, email, message, user_id, created_at
                     FROM contacts WHERE id = ?1",
                    [id],
                    contact_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_contacts(&self) -> Result<Vec<ContactRow>> {
        self.with_conn(|conn| query_contacts(conn, None))
    }

    pub fn list_contacts_by_user(&self, user_id: &str) -> Result<Vec<ContactRow>> {
        self.with_conn(|conn| query_contacts(conn, Some(user_id)))
    }
}

fn query_user(conn: &Connection, field: &str, value: &str) -> Result<Option<UserRow>> {
    // `field` is one of the fixed column names above, never client input.
    let sql = format!(
        "SELECT id, username, email, password, avatar, created_at
         FROM users WHERE {} = ?1",
        field
    );
    let row = conn.query_row(&sql, [value], user_from_row).optional()?;
    Ok(row)
}

fn query_contacts(conn: &Connection, user_id: Option<&str>) -> Result<Vec<ContactRow>> {
    match user_id {
        Some(uid) => {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, message, user_id, created_at
                 FROM contacts WHERE user_id = ?1 ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([uid], contact_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, name, email, message, user_id, created_at
                 FROM contacts ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([], contact_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        }
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        avatar: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn contact_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<ContactRow, rusqlite::Error> {
    Ok(ContactRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        message: row.get(3)?,
        user_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}
