//! Error type shared by every repository and gateway operation.

use crate::db::DbError;
use crate::model::EntityId;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of a storage operation.
///
/// Missing rows on read paths are reported as `Ok(None)`, not as errors.
#[derive(Debug)]
pub enum StorageError {
    /// Connectivity, I/O or SQLite engine failure.
    Db(DbError),
    /// Uniqueness or check constraint rejected the write.
    Constraint(String),
    /// Caller-supplied value cannot be stored.
    InvalidInput(String),
    /// Update targeted a key with no record.
    NotFound { entity: &'static str, id: EntityId },
    /// Persisted row cannot be decoded into its record type.
    InvalidData(String),
    /// Shared connection is unusable after a panic in another caller.
    Unavailable(String),
    /// Connection schema is not at the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint(message) => write!(f, "constraint violation: {message}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version is {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(message.clone().unwrap_or_else(|| code.to_string()))
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}
