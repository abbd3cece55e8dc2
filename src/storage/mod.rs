//! Persistent storage for `bugboard`.
//!
//! One shared relational store backs all components. `SqliteStorage`
//! owns the connection; step-row plumbing lives in `steps` so the same
//! code runs inside coordinator transactions.

pub mod schema;
pub mod sqlite;
pub(crate) mod steps;

pub use schema::{SCHEMA_SQL, apply_schema};
pub use sqlite::{BugFilters, SqliteStorage};
