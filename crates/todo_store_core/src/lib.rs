//! Persistence gateway for the to-do application.
//! Owns the SQLite schema and every read/write of `Todo` and `User` records.

pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{ConfigError, DbLocation, StoreConfig};
pub use gateway::{GatewayRepository, PersistenceGateway};
pub use logging::{
    default_log_level, flush_logging, init_logging, logging_status, LogConfig, LoggingError,
};
pub use model::todo::{Todo, TodoId};
pub use model::user::{normalize_email, User, UserId};
pub use model::EntityId;
pub use repo::crud::{CrudRepository, EntityMapping, PageQuery, SqliteRepository};
pub use repo::error::{StorageError, StorageResult};
pub use repo::todo_repo::SqliteTodoRepository;
pub use repo::user_repo::{SqliteUserRepository, UserRepository};

/// Minimal health-check API for embedding callers.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
