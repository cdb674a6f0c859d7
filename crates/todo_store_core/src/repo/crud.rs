//! Generic CRUD contract and its SQLite implementation.
//!
//! # Responsibility
//! - Provide one save/find/delete contract for every entity table.
//! - Generate the per-table SQL from an [`EntityMapping`].
//!
//! # Invariants
//! - `save` inserts when the id is unset (`None` or `0`) and updates otherwise;
//!   it never inserts a caller-chosen id.
//! - Read paths return `Ok(None)` / empty vectors for missing rows.
//! - Listing is deterministic: `ORDER BY id ASC`.
//! - `delete_by_id` on a missing id is a no-op.

use crate::db::migrations::latest_version;
use crate::model::EntityId;
use crate::repo::error::{StorageError, StorageResult};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::BTreeSet;
use std::marker::PhantomData;

/// Column mapping between a record type and its table.
///
/// Every mapped table has an `INTEGER PRIMARY KEY AUTOINCREMENT` column named
/// `id` plus the data columns listed in `COLUMNS`.
pub trait EntityMapping: Sized {
    /// Human-readable entity name used in errors.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    /// Data columns, excluding `id`, in binding order.
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Option<EntityId>;
    fn set_id(&mut self, id: EntityId);

    /// Values for `COLUMNS`, same order.
    fn column_values(&self) -> Vec<Value>;

    /// Decodes one row selected as `id, COLUMNS...`.
    fn from_row(row: &Row<'_>) -> StorageResult<Self>;

    /// Canonicalizes and checks the record right before it is written.
    fn prepare_for_write(&mut self) -> StorageResult<()> {
        Ok(())
    }
}

/// Limit/offset window over an id-ordered listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageQuery {
    /// `None` returns every remaining row.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository contract shared by all entities.
pub trait CrudRepository<E> {
    /// Inserts or updates `entity`; returns it with its id populated.
    fn save(&self, entity: E) -> StorageResult<E>;
    /// Saves every entity in order; either all succeed or none are kept.
    fn save_all(&self, entities: Vec<E>) -> StorageResult<Vec<E>>;
    fn find_by_id(&self, id: EntityId) -> StorageResult<Option<E>>;
    fn exists_by_id(&self, id: EntityId) -> StorageResult<bool>;
    fn find_all(&self) -> StorageResult<Vec<E>>;
    /// Returns the records for the ids present, ascending by id.
    fn find_all_by_id(&self, ids: &[EntityId]) -> StorageResult<Vec<E>>;
    fn find_page(&self, query: &PageQuery) -> StorageResult<Vec<E>>;
    fn count(&self) -> StorageResult<u64>;
    fn delete_by_id(&self, id: EntityId) -> StorageResult<()>;
    fn delete_all(&self) -> StorageResult<()>;
}

/// SQLite-backed repository for any mapped entity.
pub struct SqliteRepository<'conn, E> {
    conn: &'conn Connection,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: EntityMapping> SqliteRepository<'conn, E> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` when the entity table is absent.
    pub fn try_new(conn: &'conn Connection) -> StorageResult<Self> {
        ensure_connection_ready(conn, E::TABLE)?;
        Ok(Self::new_unchecked(conn))
    }

    pub(crate) fn new_unchecked(conn: &'conn Connection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    pub(crate) fn conn(&self) -> &'conn Connection {
        self.conn
    }

    fn insert(&self, entity: &E) -> StorageResult<EntityId> {
        let placeholders = (1..=E::COLUMNS.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            E::COLUMNS.join(", ")
        );

        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(entity.column_values()))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: EntityId, entity: &E) -> StorageResult<()> {
        let assignments = E::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {}
             SET
                {assignments},
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?{};",
            E::TABLE,
            E::COLUMNS.len() + 1
        );

        let mut bind_values = entity.column_values();
        bind_values.push(Value::Integer(id));

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let changed = stmt.execute(params_from_iter(bind_values))?;
        if changed == 0 {
            return Err(StorageError::NotFound {
                entity: E::ENTITY,
                id,
            });
        }
        Ok(())
    }

    fn save_all_inner(&self, entities: Vec<E>) -> StorageResult<Vec<E>> {
        let mut saved = Vec::with_capacity(entities.len());
        for entity in entities {
            saved.push(self.save(entity)?);
        }
        Ok(saved)
    }

    /// Runs one `SELECT id, COLUMNS... FROM table <tail>` and decodes all rows.
    pub(crate) fn query_rows(&self, tail: &str, bind_values: Vec<Value>) -> StorageResult<Vec<E>> {
        let sql = format!("{} {tail}", select_sql::<E>());
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row)?);
        }
        Ok(entities)
    }
}

impl<E: EntityMapping> CrudRepository<E> for SqliteRepository<'_, E> {
    fn save(&self, mut entity: E) -> StorageResult<E> {
        entity.prepare_for_write()?;

        match persisted_id(entity.id())? {
            Some(id) => self.update(id, &entity)?,
            None => {
                let id = self.insert(&entity)?;
                entity.set_id(id);
            }
        }
        Ok(entity)
    }

    fn save_all(&self, entities: Vec<E>) -> StorageResult<Vec<E>> {
        // Savepoints nest inside an outer transaction as well as standalone.
        self.conn.execute_batch("SAVEPOINT crud_save_all;")?;
        match self.save_all_inner(entities) {
            Ok(saved) => {
                self.conn.execute_batch("RELEASE crud_save_all;")?;
                Ok(saved)
            }
            Err(err) => {
                // The savepoint is already gone if RAISE(ROLLBACK) or an
                // interrupted write aborted the enclosing transaction.
                let _ = self
                    .conn
                    .execute_batch("ROLLBACK TO crud_save_all; RELEASE crud_save_all;");
                Err(err)
            }
        }
    }

    fn find_by_id(&self, id: EntityId) -> StorageResult<Option<E>> {
        if id <= 0 {
            return Ok(None);
        }
        let mut found = self.query_rows("WHERE id = ?1;", vec![Value::Integer(id)])?;
        Ok(found.pop())
    }

    fn exists_by_id(&self, id: EntityId) -> StorageResult<bool> {
        if id <= 0 {
            return Ok(false);
        }
        let exists: i64 = self.conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);", E::TABLE),
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_all(&self) -> StorageResult<Vec<E>> {
        self.query_rows("ORDER BY id ASC;", Vec::new())
    }

    fn find_all_by_id(&self, ids: &[EntityId]) -> StorageResult<Vec<E>> {
        let wanted: BTreeSet<EntityId> = ids.iter().copied().filter(|id| *id > 0).collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        // Single JSON array parameter: no bound-variable limit on `ids`.
        let id_array = wanted
            .iter()
            .map(EntityId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.query_rows(
            "WHERE id IN (SELECT value FROM json_each(?1)) ORDER BY id ASC;",
            vec![Value::Text(format!("[{id_array}]"))],
        )
    }

    fn find_page(&self, query: &PageQuery) -> StorageResult<Vec<E>> {
        let mut tail = String::from("ORDER BY id ASC");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(limit) = query.limit {
            tail.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                tail.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            tail.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }
        tail.push(';');

        self.query_rows(&tail, bind_values)
    }

    fn count(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", E::TABLE),
            [],
            |row| row.get(0),
        )?;
        u64::try_from(count)
            .map_err(|_| StorageError::InvalidData(format!("negative row count {count}")))
    }

    fn delete_by_id(&self, id: EntityId) -> StorageResult<()> {
        if id <= 0 {
            return Ok(());
        }
        self.conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1;", E::TABLE), [id])?;
        Ok(())
    }

    fn delete_all(&self) -> StorageResult<()> {
        self.conn
            .execute(&format!("DELETE FROM {};", E::TABLE), [])?;
        Ok(())
    }
}

/// Maps the caller's id to the key of an existing row, if any.
fn persisted_id(id: Option<EntityId>) -> StorageResult<Option<EntityId>> {
    match id {
        None | Some(0) => Ok(None),
        Some(id) if id > 0 => Ok(Some(id)),
        Some(id) => Err(StorageError::InvalidInput(format!(
            "id must be positive, got {id}"
        ))),
    }
}

fn select_sql<E: EntityMapping>() -> String {
    format!("SELECT id, {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
}

/// Reads the `id` column and rejects non-positive keys.
pub(crate) fn row_id(row: &Row<'_>, table: &str) -> StorageResult<EntityId> {
    let id: EntityId = row.get("id")?;
    if id <= 0 {
        return Err(StorageError::InvalidData(format!(
            "invalid id value `{id}` in {table}.id"
        )));
    }
    Ok(id)
}

pub(crate) fn ensure_connection_ready(conn: &Connection, table: &'static str) -> StorageResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StorageError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(StorageError::MissingRequiredTable(table));
    }

    Ok(())
}
