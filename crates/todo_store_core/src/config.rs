//! Store configuration loaded from the process environment.
//!
//! # Responsibility
//! - Describe where the database lives and how long writers wait on locks.
//! - Carry optional logging settings for embedding binaries.
//!
//! # Invariants
//! - Unset variables fall back to defaults; malformed values are rejected,
//!   never silently ignored.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use crate::logging::{default_log_level, LogConfig};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB: &str = "TODO_STORE_DB";
pub const ENV_BUSY_TIMEOUT_MS: &str = "TODO_STORE_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "TODO_STORE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TODO_STORE_LOG_DIR";

const MEMORY_MARKER: &str = ":memory:";

/// Where the backing SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    File(PathBuf),
    Memory,
}

/// Settings used to open a [`crate::PersistenceGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: DbLocation,
    /// Upper bound on how long one operation waits for a SQLite lock.
    pub busy_timeout: Duration,
    /// `None` leaves logging untouched.
    pub log: Option<LogConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: DbLocation::Memory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            log: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for {key}")
            }
        }
    }
}

impl Error for ConfigError {}

impl StoreConfig {
    /// File-backed configuration with default timeout and no logging.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DbLocation::File(path.into()),
            ..Self::default()
        }
    }

    /// Reads `TODO_STORE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = non_blank(lookup(ENV_DB)) {
            config.location = if raw == MEMORY_MARKER {
                DbLocation::Memory
            } else {
                DbLocation::File(PathBuf::from(raw))
            };
        }

        if let Some(raw) = non_blank(lookup(ENV_BUSY_TIMEOUT_MS)) {
            let millis = raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_BUSY_TIMEOUT_MS,
                    value: raw.clone(),
                })?;
            config.busy_timeout = Duration::from_millis(millis);
        }

        if let Some(dir) = non_blank(lookup(ENV_LOG_DIR)) {
            let level =
                non_blank(lookup(ENV_LOG_LEVEL)).unwrap_or_else(|| default_log_level().to_string());
            config.log = Some(LogConfig { level, dir });
        }

        Ok(config)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = StoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.location, DbLocation::Memory);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn reads_file_location_and_timeout() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            (ENV_DB, " /var/lib/todo/store.sqlite3 "),
            (ENV_BUSY_TIMEOUT_MS, "250"),
        ]))
        .unwrap();
        assert_eq!(
            config.location,
            DbLocation::File(PathBuf::from("/var/lib/todo/store.sqlite3"))
        );
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn memory_marker_selects_in_memory_store() {
        let config = StoreConfig::from_lookup(lookup_from(&[(ENV_DB, ":memory:")])).unwrap();
        assert_eq!(config.location, DbLocation::Memory);
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let err = StoreConfig::from_lookup(lookup_from(&[(ENV_BUSY_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_BUSY_TIMEOUT_MS,
                value: "soon".to_string(),
            }
        );
    }

    #[test]
    fn logging_requires_directory() {
        let without_dir =
            StoreConfig::from_lookup(lookup_from(&[(ENV_LOG_LEVEL, "warn")])).unwrap();
        assert!(without_dir.log.is_none());

        let with_dir = StoreConfig::from_lookup(lookup_from(&[
            (ENV_LOG_DIR, "/tmp/todo-logs"),
            (ENV_LOG_LEVEL, "warn"),
        ]))
        .unwrap();
        assert_eq!(
            with_dir.log,
            Some(LogConfig {
                level: "warn".to_string(),
                dir: "/tmp/todo-logs".to_string(),
            })
        );
    }
}
