//! Configuration for `bugboard`.
//!
//! Precedence (highest wins): environment variables, then defaults. The
//! store handle built from this is injected into every component at
//! process start; nothing reads ambient global state afterwards.

use std::env;
use std::path::PathBuf;

use crate::error::Result;
use crate::storage::SqliteStorage;

/// Default database filename.
const DEFAULT_DB_FILENAME: &str = "bugboard.db";

/// Environment variable naming the database path.
pub const ENV_DB_PATH: &str = "BUGBOARD_DB";
/// Environment variable setting the busy timeout in milliseconds.
pub const ENV_LOCK_TIMEOUT_MS: &str = "BUGBOARD_LOCK_TIMEOUT_MS";

/// Where and how to open the persistent store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path of the SQLite database file.
    pub database: PathBuf,
    /// Busy timeout for contended opens, if any.
    pub lock_timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DB_FILENAME),
            lock_timeout_ms: None,
        }
    }
}

impl StoreConfig {
    /// Resolve configuration from the environment, falling back to
    /// defaults. An unparsable timeout value is ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let database = env::var(ENV_DB_PATH)
            .map_or_else(|_| PathBuf::from(DEFAULT_DB_FILENAME), PathBuf::from);
        let lock_timeout_ms = env::var(ENV_LOCK_TIMEOUT_MS)
            .ok()
            .and_then(|v| v.parse().ok());
        Self {
            database,
            lock_timeout_ms,
        }
    }

    /// Open the store this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or the
    /// schema cannot be applied.
    pub fn open(&self) -> Result<SqliteStorage> {
        SqliteStorage::open_with_timeout(&self.database, self.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_file() {
        let config = StoreConfig::default();
        assert_eq!(config.database, PathBuf::from("bugboard.db"));
        assert!(config.lock_timeout_ms.is_none());
    }

    #[test]
    fn open_creates_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig {
            database: dir.path().join("test.db"),
            lock_timeout_ms: Some(250),
        };
        let storage = config.open().unwrap();
        drop(storage);
        assert!(config.database.exists());
    }
}
