//! Thread-safe persistence façade over one SQLite connection.
//!
//! # Responsibility
//! - Own the connection and hand out per-entity repository views.
//! - Run every operation as its own short-lived transaction.
//!
//! # Invariants
//! - No transaction spans two gateway calls.
//! - A failed operation rolls back before the lock is released.
//! - Lock poisoning surfaces as `StorageError::Unavailable`, never a panic.

use crate::config::StoreConfig;
use crate::db::migrations::current_version;
use crate::db::{open_db_in_memory, open_with_config};
use crate::model::todo::Todo;
use crate::model::user::User;
use crate::model::EntityId;
use crate::repo::crud::{
    ensure_connection_ready, CrudRepository, EntityMapping, PageQuery, SqliteRepository,
};
use crate::repo::error::{StorageError, StorageResult};
use crate::repo::user_repo::UserRepository;
use rusqlite::{Connection, InterruptHandle, TransactionBehavior};
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard};

/// Shared entry point for callers on any thread.
pub struct PersistenceGateway {
    conn: Mutex<Connection>,
    interrupt: InterruptHandle,
}

impl PersistenceGateway {
    /// Opens (and migrates) the store described by `config`.
    pub fn open(config: &StoreConfig) -> StorageResult<Self> {
        Self::from_connection(open_with_config(config)?)
    }

    /// Opens a private, empty in-memory store.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> StorageResult<Self> {
        ensure_connection_ready(&conn, Todo::TABLE)?;
        ensure_connection_ready(&conn, User::TABLE)?;
        let interrupt = conn.get_interrupt_handle();
        Ok(Self {
            conn: Mutex::new(conn),
            interrupt,
        })
    }

    /// Repository view over `todos`.
    pub fn todos(&self) -> GatewayRepository<'_, Todo> {
        GatewayRepository::new(self)
    }

    /// Repository view over `users`.
    pub fn users(&self) -> GatewayRepository<'_, User> {
        GatewayRepository::new(self)
    }

    /// Aborts the statement currently running on another thread, if any.
    ///
    /// The interrupted operation fails with `StorageError::Db`; later calls
    /// are unaffected.
    pub fn interrupt(&self) {
        self.interrupt.interrupt();
    }

    pub fn schema_version(&self) -> StorageResult<u32> {
        let conn = self.lock()?;
        Ok(current_version(&conn)?)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|err| StorageError::Unavailable(err.to_string()))
    }

    fn run<E, T, F>(&self, behavior: TransactionBehavior, op: F) -> StorageResult<T>
    where
        E: EntityMapping,
        F: FnOnce(&SqliteRepository<'_, E>) -> StorageResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let output = op(&SqliteRepository::<E>::new_unchecked(&tx))?;
        tx.commit()?;
        Ok(output)
    }

    fn read<E, T, F>(&self, op: F) -> StorageResult<T>
    where
        E: EntityMapping,
        F: FnOnce(&SqliteRepository<'_, E>) -> StorageResult<T>,
    {
        self.run(TransactionBehavior::Deferred, op)
    }

    fn write<E, T, F>(&self, op: F) -> StorageResult<T>
    where
        E: EntityMapping,
        F: FnOnce(&SqliteRepository<'_, E>) -> StorageResult<T>,
    {
        self.run(TransactionBehavior::Immediate, op)
    }
}

/// Per-entity handle borrowed from a [`PersistenceGateway`].
pub struct GatewayRepository<'g, E> {
    gateway: &'g PersistenceGateway,
    _entity: PhantomData<fn() -> E>,
}

impl<'g, E: EntityMapping> GatewayRepository<'g, E> {
    fn new(gateway: &'g PersistenceGateway) -> Self {
        Self {
            gateway,
            _entity: PhantomData,
        }
    }
}

impl<E: EntityMapping> CrudRepository<E> for GatewayRepository<'_, E> {
    fn save(&self, entity: E) -> StorageResult<E> {
        self.gateway.write(|repo: &SqliteRepository<'_, E>| repo.save(entity))
    }

    fn save_all(&self, entities: Vec<E>) -> StorageResult<Vec<E>> {
        self.gateway.write(|repo: &SqliteRepository<'_, E>| repo.save_all(entities))
    }

    fn find_by_id(&self, id: EntityId) -> StorageResult<Option<E>> {
        self.gateway.read(|repo: &SqliteRepository<'_, E>| repo.find_by_id(id))
    }

    fn exists_by_id(&self, id: EntityId) -> StorageResult<bool> {
        self.gateway.read(|repo: &SqliteRepository<'_, E>| repo.exists_by_id(id))
    }

    fn find_all(&self) -> StorageResult<Vec<E>> {
        self.gateway.read(|repo: &SqliteRepository<'_, E>| repo.find_all())
    }

    fn find_all_by_id(&self, ids: &[EntityId]) -> StorageResult<Vec<E>> {
        self.gateway.read(|repo: &SqliteRepository<'_, E>| repo.find_all_by_id(ids))
    }

    fn find_page(&self, query: &PageQuery) -> StorageResult<Vec<E>> {
        self.gateway.read(|repo: &SqliteRepository<'_, E>| repo.find_page(query))
    }

    fn count(&self) -> StorageResult<u64> {
        self.gateway.read(|repo: &SqliteRepository<'_, E>| repo.count())
    }

    fn delete_by_id(&self, id: EntityId) -> StorageResult<()> {
        self.gateway.write(|repo: &SqliteRepository<'_, E>| repo.delete_by_id(id))
    }

    fn delete_all(&self) -> StorageResult<()> {
        self.gateway.write(|repo: &SqliteRepository<'_, E>| repo.delete_all())
    }
}

impl UserRepository for GatewayRepository<'_, User> {
    fn find_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        self.gateway
            .read(|repo: &SqliteRepository<'_, User>| repo.find_by_email(email))
    }

    fn exists_by_email(&self, email: &str) -> StorageResult<bool> {
        self.gateway
            .read(|repo: &SqliteRepository<'_, User>| repo.exists_by_email(email))
    }
}
