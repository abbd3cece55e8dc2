#![allow(dead_code)]

use std::sync::Once;

use bugboard::storage::SqliteStorage;
use tempfile::TempDir;

pub mod fixtures;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        bugboard::logging::init_test_logging();
    });
}

/// Fresh in-memory store with the schema applied.
pub fn test_db() -> SqliteStorage {
    init_test_logging();
    SqliteStorage::open_memory().expect("Failed to create test database")
}

/// Fresh on-disk store in a temp dir, for tests that reopen the file.
pub fn test_db_with_dir() -> (SqliteStorage, TempDir) {
    init_test_logging();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("bugboard.db");
    let storage = SqliteStorage::open(&db_path).expect("Failed to create test database");
    (storage, dir)
}
