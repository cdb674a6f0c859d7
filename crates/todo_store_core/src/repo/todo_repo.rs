//! `todos` table mapping.

use crate::model::todo::Todo;
use crate::model::EntityId;
use crate::repo::crud::{row_id, EntityMapping, SqliteRepository};
use crate::repo::error::{StorageError, StorageResult};
use rusqlite::types::Value;
use rusqlite::Row;

/// SQLite-backed repository for to-do items.
pub type SqliteTodoRepository<'conn> = SqliteRepository<'conn, Todo>;

impl EntityMapping for Todo {
    const ENTITY: &'static str = "todo";
    const TABLE: &'static str = "todos";
    const COLUMNS: &'static [&'static str] = &["title", "description", "is_completed"];

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.title.clone()),
            Value::Text(self.description.clone()),
            Value::Integer(i64::from(self.is_completed)),
        ]
    }

    fn from_row(row: &Row<'_>) -> StorageResult<Self> {
        let is_completed = match row.get::<_, i64>("is_completed")? {
            0 => false,
            1 => true,
            other => {
                return Err(StorageError::InvalidData(format!(
                    "invalid is_completed value `{other}` in todos.is_completed"
                )));
            }
        };

        Ok(Self {
            id: Some(row_id(row, Self::TABLE)?),
            title: row.get("title")?,
            description: row.get("description")?,
            is_completed,
        })
    }
}
