//! `users` table mapping and the email lookup query.

use crate::model::user::{normalize_email, User};
use crate::model::EntityId;
use crate::repo::crud::{row_id, CrudRepository, EntityMapping, SqliteRepository};
use crate::repo::error::{StorageError, StorageResult};
use rusqlite::types::Value;
use rusqlite::Row;

/// SQLite-backed repository for users.
pub type SqliteUserRepository<'conn> = SqliteRepository<'conn, User>;

/// User-specific queries on top of the shared CRUD contract.
///
/// Lookups normalize the requested address with [`normalize_email`], so matching is
/// case-insensitive for ASCII and ignores surrounding whitespace.
pub trait UserRepository: CrudRepository<User> {
    fn find_by_email(&self, email: &str) -> StorageResult<Option<User>>;
    fn exists_by_email(&self, email: &str) -> StorageResult<bool>;
}

impl EntityMapping for User {
    const ENTITY: &'static str = "user";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["email", "password_hash"];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.email.clone()),
            Value::Text(self.password_hash.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        Ok(Self {
            id: Some(row_id(row, Self::TABLE)?),
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
        })
    }

    fn prepare_for_write(&mut self) -> StorageResult<()> {
        let email = normalize_email(&self.email);
        if email.is_empty() {
            return Err(StorageError::InvalidInput(
                "user email cannot be empty".to_string(),
            ));
        }
        self.email = email;
        Ok(())
    }
}

impl UserRepository for SqliteRepository<'_, User> {
    fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(None);
        }
        let mut found = self.query_rows("WHERE email = ?1;", vec![Value::Text(email)])?;
        Ok(found.pop())
    }

    fn exists_by_email(&self, email: &str) -> StorageResult<bool> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(false);
        }
        let exists: i64 = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1);",
            [email],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}
