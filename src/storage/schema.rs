//! Database schema definitions.

use rusqlite::{Connection, Result};

/// The complete SQL schema for the bugboard database.
///
/// Column names match the wire contract consumed by the HTTP layer
/// (`bugName`, `creationDate`, `closingDate`); timestamps are stored as
/// RFC 3339 text.
pub const SCHEMA_SQL: &str = r"
    -- Users: owned by the authentication collaborator. The core stores
    -- the opaque credential hash and never verifies it.
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL
    );

    -- Bugs
    CREATE TABLE IF NOT EXISTS bugs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bugName TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        createdBy INTEGER NOT NULL,
        assignedTo INTEGER,
        severity TEXT NOT NULL,
        priority TEXT NOT NULL,
        status TEXT NOT NULL,
        creationDate TEXT NOT NULL,
        closingDate TEXT,
        FOREIGN KEY (createdBy) REFERENCES users (id) ON DELETE CASCADE,
        FOREIGN KEY (assignedTo) REFERENCES users (id) ON DELETE CASCADE,
        CHECK (length(bugName) >= 1)
    );

    CREATE INDEX IF NOT EXISTS idx_bugs_status ON bugs(status);
    CREATE INDEX IF NOT EXISTS idx_bugs_severity ON bugs(severity);
    CREATE INDEX IF NOT EXISTS idx_bugs_priority ON bugs(priority);
    CREATE INDEX IF NOT EXISTS idx_bugs_created_by ON bugs(createdBy);
    CREATE INDEX IF NOT EXISTS idx_bugs_assigned_to ON bugs(assignedTo);

    -- Reproduction steps. A step never exists without its bug.
    CREATE TABLE IF NOT EXISTS steps (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bug_id INTEGER NOT NULL,
        step_order INTEGER NOT NULL,
        description TEXT NOT NULL,
        FOREIGN KEY (bug_id) REFERENCES bugs (id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_steps_bug_order ON steps(bug_id, step_order);
";

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set journal mode to WAL for concurrency
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Enable foreign keys; the bugs -> steps cascade depends on it
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert!(tables.contains(&"users".to_string()));
        assert!(tables.contains(&"bugs".to_string()));
        assert!(tables.contains(&"steps".to_string()));

        // Verify pragmas
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        // In-memory DBs use MEMORY journaling, regardless of what we set
        assert!(journal_mode.to_uppercase() == "WAL" || journal_mode.to_uppercase() == "MEMORY");

        let foreign_keys: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[test]
    fn test_apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();
    }
}
