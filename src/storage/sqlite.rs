//! `SQLite` storage implementation.
//!
//! `SqliteStorage` is an injected handle with an explicit lifecycle:
//! opened once at process start, passed by reference into each
//! operation, dropped at shutdown. Every mutation funnels through
//! [`SqliteStorage::mutate`], which owns the transaction scope; reads
//! run lock-free on the same connection.

use crate::error::{BugboardError, Result};
use crate::model::{
    Bug, BugDetails, BugUpdate, NewBug, Priority, Severity, Status, Step, User, UserWork,
};
use crate::storage::schema::apply_schema;
use crate::storage::steps;
use crate::validation::{BugValidator, StepsValidator};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema
    /// application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a new connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema
    /// application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Execute a mutation inside a single transaction.
    ///
    /// The transaction is opened `IMMEDIATE` so concurrent writers
    /// serialize up front instead of failing at commit. Compound
    /// operations spanning bugs and steps go through here so either all
    /// writes commit or none do.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails; the transaction is rolled back
    /// on error.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        debug!(op, "Committed mutation");
        Ok(result)
    }
}

// ============================================================================
// BUG STORE
// ============================================================================

impl SqliteStorage {
    /// Create a new bug.
    ///
    /// Status starts at `Open`, `creationDate` is now, `closingDate` is
    /// null. Name, description, severity, and priority must be non-empty.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields, or a database error if
    /// the insert fails (e.g. unknown `created_by` / `assigned_to` user).
    pub fn create_bug(&mut self, new: &NewBug, created_by: i64) -> Result<Bug> {
        BugValidator::validate_new(new).map_err(BugboardError::from_validation_errors)?;

        let created_at = Utc::now();
        let bug = self.mutate("create_bug", |tx| insert_bug(tx, new, created_by, created_at))?;
        info!(bug_id = bug.id, created_by, "Created bug");
        Ok(bug)
    }

    /// Get a bug by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_bug(&self, id: i64) -> Result<Option<Bug>> {
        let bug = self
            .conn
            .query_row(
                "SELECT id, bugName, description, createdBy, assignedTo, severity,
                        priority, status, creationDate, closingDate
                 FROM bugs WHERE id = ?",
                [id],
                bug_from_row,
            )
            .optional()?;
        Ok(bug)
    }

    /// Detail view: the bug, its creator/assignee usernames, and its
    /// steps in display order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_bug_details(&self, id: i64) -> Result<Option<BugDetails>> {
        let row = self
            .conn
            .query_row(
                "SELECT b.id, b.bugName, b.description, b.createdBy, b.assignedTo, b.severity,
                        b.priority, b.status, b.creationDate, b.closingDate,
                        u_created.username, u_assigned.username
                 FROM bugs b
                 LEFT JOIN users u_created ON b.createdBy = u_created.id
                 LEFT JOIN users u_assigned ON b.assignedTo = u_assigned.id
                 WHERE b.id = ?",
                [id],
                |row| {
                    let bug = bug_from_row(row)?;
                    let creator: Option<String> = row.get(10)?;
                    let assignee: Option<String> = row.get(11)?;
                    Ok((bug, creator, assignee))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((bug, creator, assignee)) => {
                let steps = steps::list_for_bug(&self.conn, id)?;
                Ok(Some(BugDetails {
                    bug,
                    creator,
                    assignee,
                    steps,
                }))
            }
        }
    }

    /// List bugs with optional filters, most recently created first.
    ///
    /// Severity, priority, and status narrow by exact match; `search`
    /// matches case-insensitive substrings of the bug name, description,
    /// creator username, and assignee username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_bugs(&self, filters: &BugFilters) -> Result<Vec<Bug>> {
        let mut sql = String::from(
            "SELECT b.id, b.bugName, b.description, b.createdBy, b.assignedTo, b.severity,
                    b.priority, b.status, b.creationDate, b.closingDate
             FROM bugs b
             LEFT JOIN users u_created ON b.createdBy = u_created.id
             LEFT JOIN users u_assigned ON b.assignedTo = u_assigned.id
             WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref severity) = filters.severity {
            sql.push_str(" AND b.severity = ?");
            params.push(Box::new(severity.as_str().to_string()));
        }
        if let Some(ref priority) = filters.priority {
            sql.push_str(" AND b.priority = ?");
            params.push(Box::new(priority.as_str().to_string()));
        }
        if let Some(ref status) = filters.status {
            sql.push_str(" AND b.status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }
        if let Some(ref search) = filters.search {
            let trimmed = search.trim();
            if !trimmed.is_empty() {
                let _ = write!(
                    sql,
                    " AND (b.bugName LIKE ? OR b.description LIKE ?
                           OR u_created.username LIKE ? OR u_assigned.username LIKE ?)"
                );
                let pattern = format!("%{trimmed}%");
                for _ in 0..4 {
                    params.push(Box::new(pattern.clone()));
                }
            }
        }

        sql.push_str(" ORDER BY b.id DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
        let bugs = stmt
            .query_map(params_refs.as_slice(), bug_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bugs)
    }

    /// The two per-user dashboard views: bugs assigned to the user and
    /// bugs created by the user. Independent lists, no deduplication.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_for_user(&self, user_id: i64) -> Result<UserWork> {
        let mut assigned_stmt = self.conn.prepare(
            "SELECT id, bugName, description, createdBy, assignedTo, severity,
                    priority, status, creationDate, closingDate
             FROM bugs WHERE assignedTo = ? ORDER BY id DESC",
        )?;
        let assigned = assigned_stmt
            .query_map([user_id], bug_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut created_stmt = self.conn.prepare(
            "SELECT id, bugName, description, createdBy, assignedTo, severity,
                    priority, status, creationDate, closingDate
             FROM bugs WHERE createdBy = ? ORDER BY id DESC",
        )?;
        let created = created_stmt
            .query_map([user_id], bug_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(UserWork { assigned, created })
    }

    /// Sparse update of a bug's editable fields: name, description,
    /// assignee, severity, priority. Status, creator, and both dates are
    /// never touched here. Authorization is the coordinator's job.
    ///
    /// # Errors
    ///
    /// `BugNotFound` if the id is absent; validation errors for bad
    /// field values.
    pub fn update_bug_fields(&mut self, id: i64, update: &BugUpdate) -> Result<Bug> {
        BugValidator::validate_update(update).map_err(BugboardError::from_validation_errors)?;

        let bug = self.get_bug(id)?.ok_or(BugboardError::BugNotFound { id })?;
        if update.is_empty() {
            return Ok(bug);
        }

        self.mutate("update_bug_fields", |tx| apply_bug_update(tx, id, update))?;
        debug!(bug_id = id, "Updated bug fields");
        self.get_bug(id)?.ok_or(BugboardError::BugNotFound { id })
    }

    /// Transition a bug to a new status.
    ///
    /// This is the single authoritative place the closing-date invariant
    /// is enforced: a terminal status ({Resolved, Closed}) sets
    /// `closingDate = now`, any other status clears it. Transitions are
    /// unrestricted; a closed bug can be reopened.
    ///
    /// # Errors
    ///
    /// `BugNotFound` if the id is absent.
    pub fn transition_status(&mut self, id: i64, status: &Status) -> Result<Bug> {
        let exists = self.get_bug(id)?.is_some();
        if !exists {
            return Err(BugboardError::BugNotFound { id });
        }

        self.mutate("transition_status", |tx| {
            if status.is_terminal() {
                tx.execute(
                    "UPDATE bugs SET status = ?, closingDate = ? WHERE id = ?",
                    rusqlite::params![status.as_str(), Utc::now().to_rfc3339(), id],
                )?;
            } else {
                tx.execute(
                    "UPDATE bugs SET status = ?, closingDate = NULL WHERE id = ?",
                    rusqlite::params![status.as_str(), id],
                )?;
            }
            Ok(())
        })?;
        info!(bug_id = id, status = %status, "Transitioned bug status");

        self.get_bug(id)?.ok_or(BugboardError::BugNotFound { id })
    }

    /// Delete a bug. All of its steps go with it (FK cascade).
    ///
    /// # Errors
    ///
    /// `BugNotFound` if the id is absent.
    pub fn delete_bug(&mut self, id: i64) -> Result<()> {
        self.mutate("delete_bug", |tx| {
            let affected = tx.execute("DELETE FROM bugs WHERE id = ?", [id])?;
            if affected == 0 {
                return Err(BugboardError::BugNotFound { id });
            }
            Ok(())
        })?;
        info!(bug_id = id, "Deleted bug");
        Ok(())
    }

    /// Whether a bug row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn bug_exists(&self, id: i64) -> Result<bool> {
        let exists = self
            .conn
            .prepare("SELECT 1 FROM bugs WHERE id = ?")?
            .exists([id])?;
        Ok(exists)
    }
}

// ============================================================================
// STEP STORE
// ============================================================================

impl SqliteStorage {
    /// All steps for a bug, ascending by `step_order`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_steps(&self, bug_id: i64) -> Result<Vec<Step>> {
        steps::list_for_bug(&self.conn, bug_id)
    }

    /// Get a step by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_step(&self, step_id: i64) -> Result<Option<Step>> {
        steps::get(&self.conn, step_id)
    }

    /// Append a step to a bug's sequence: order = max existing + 1, or 0
    /// for the first step. The description is trimmed and must be
    /// non-empty.
    ///
    /// # Errors
    ///
    /// Validation error for an empty description, `BugNotFound` for an
    /// unknown bug.
    pub fn add_step(&mut self, bug_id: i64, description: &str) -> Result<Step> {
        StepsValidator::validate_description(description)
            .map_err(BugboardError::from_validation_errors)?;
        if !self.bug_exists(bug_id)? {
            return Err(BugboardError::BugNotFound { id: bug_id });
        }
        self.mutate("add_step", |tx| steps::insert(tx, bug_id, description.trim()))
    }

    /// Update a step's description; its order is untouched.
    ///
    /// # Errors
    ///
    /// `StepNotFound` if the id is absent; validation error for an empty
    /// description.
    pub fn update_step(&mut self, step_id: i64, description: &str) -> Result<Step> {
        StepsValidator::validate_description(description)
            .map_err(BugboardError::from_validation_errors)?;
        self.mutate("update_step", |tx| {
            steps::update_description(tx, step_id, description.trim())
        })
    }

    /// Delete a step. Idempotent: a missing id is not an error. Returns
    /// whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the database operation fails.
    pub fn delete_step(&mut self, step_id: i64) -> Result<bool> {
        self.mutate("delete_step", |tx| steps::delete(tx, step_id))
    }

    /// Atomically re-sequence a bug's steps. Listed ids take positions
    /// 0..k in the given order; unlisted steps follow in prior relative
    /// order. An id not belonging to the bug, or listed twice, rejects
    /// the whole call with nothing written.
    ///
    /// # Errors
    ///
    /// Validation error for foreign or duplicate ids, `BugNotFound` for
    /// an unknown bug.
    pub fn reorder_steps(&mut self, bug_id: i64, ordered_ids: &[i64]) -> Result<Vec<Step>> {
        if !self.bug_exists(bug_id)? {
            return Err(BugboardError::BugNotFound { id: bug_id });
        }
        self.mutate("reorder_steps", |tx| steps::apply_order(tx, bug_id, ordered_ids))
    }

    /// Atomically replace a bug's whole step list with the given
    /// descriptions, ordered from 0. Validates every description before
    /// touching the table.
    ///
    /// # Errors
    ///
    /// Validation error for any empty description, `BugNotFound` for an
    /// unknown bug.
    pub fn replace_all_steps(&mut self, bug_id: i64, descriptions: &[String]) -> Result<Vec<Step>> {
        StepsValidator::validate_descriptions(descriptions)
            .map_err(BugboardError::from_validation_errors)?;
        if !self.bug_exists(bug_id)? {
            return Err(BugboardError::BugNotFound { id: bug_id });
        }
        self.mutate("replace_all_steps", |tx| {
            steps::replace_all(tx, bug_id, descriptions)
        })
    }
}

// ============================================================================
// USERS
// ============================================================================

impl SqliteStorage {
    /// Store a user row. The credential hash arrives pre-computed from
    /// the authentication collaborator; the core never verifies it.
    ///
    /// # Errors
    ///
    /// A duplicate username surfaces as a validation error.
    pub fn create_user(&mut self, username: &str, password_hash: &str) -> Result<User> {
        if username.trim().is_empty() {
            return Err(BugboardError::validation("username", "cannot be empty"));
        }
        let result = self.mutate("create_user", |tx| {
            tx.execute(
                "INSERT INTO users (username, password) VALUES (?, ?)",
                rusqlite::params![username, password_hash],
            )?;
            Ok(tx.last_insert_rowid())
        });
        match result {
            Ok(id) => Ok(User {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            }),
            Err(BugboardError::Database(rusqlite::Error::SqliteFailure(e, msg)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                debug!(username, ?msg, "Duplicate username");
                Err(BugboardError::validation("username", "already taken"))
            }
            Err(e) => Err(e),
        }
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, password FROM users WHERE id = ?",
                [id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Look up a user by username (the login path's query).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, password FROM users WHERE username = ?",
                [username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// All users, for assignee pickers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, password FROM users ORDER BY username ASC")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }
}

/// Filter options for listing bugs. An absent field means "no constraint".
#[derive(Debug, Clone, Default)]
pub struct BugFilters {
    pub severity: Option<Severity>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    /// Case-insensitive substring match across bug name, description,
    /// creator username, and assignee username.
    pub search: Option<String>,
}

/// Insert a bug row. Runs on a plain `&Connection` so the lifecycle
/// coordinator can compose it with step inserts inside one transaction.
/// Status starts at `Open` and `closingDate` at NULL; callers validate
/// the payload beforehand.
pub(crate) fn insert_bug(
    conn: &Connection,
    new: &NewBug,
    created_by: i64,
    created_at: DateTime<Utc>,
) -> Result<Bug> {
    conn.execute(
        "INSERT INTO bugs (bugName, description, createdBy, assignedTo, severity,
                           priority, status, creationDate, closingDate)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL)",
        rusqlite::params![
            new.name,
            new.description,
            created_by,
            new.assigned_to,
            new.severity.as_str(),
            new.priority.as_str(),
            Status::Open.as_str(),
            created_at.to_rfc3339(),
        ],
    )?;
    Ok(Bug {
        id: conn.last_insert_rowid(),
        name: new.name.clone(),
        description: new.description.clone(),
        created_by,
        assigned_to: new.assigned_to,
        severity: new.severity.clone(),
        priority: new.priority.clone(),
        status: Status::Open,
        created_at,
        closed_at: None,
    })
}

/// Apply a sparse field update to a bug row. Touches only the editable
/// columns; status, creator, and both dates are never in the SET list.
/// The caller guarantees the update is non-empty and validated.
pub(crate) fn apply_bug_update(conn: &Connection, id: i64, update: &BugUpdate) -> Result<()> {
    let mut set_clauses: Vec<&str> = vec![];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

    if let Some(ref name) = update.name {
        set_clauses.push("bugName = ?");
        params.push(Box::new(name.clone()));
    }
    if let Some(ref description) = update.description {
        set_clauses.push("description = ?");
        params.push(Box::new(description.clone()));
    }
    if let Some(assigned_to) = update.assigned_to {
        set_clauses.push("assignedTo = ?");
        params.push(Box::new(assigned_to));
    }
    if let Some(ref severity) = update.severity {
        set_clauses.push("severity = ?");
        params.push(Box::new(severity.as_str().to_string()));
    }
    if let Some(ref priority) = update.priority {
        set_clauses.push("priority = ?");
        params.push(Box::new(priority.as_str().to_string()));
    }

    let sql = format!("UPDATE bugs SET {} WHERE id = ?", set_clauses.join(", "));
    params.push(Box::new(id));
    let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(AsRef::as_ref).collect();
    conn.execute(&sql, params_refs.as_slice())?;
    Ok(())
}

fn bug_from_row(row: &rusqlite::Row) -> rusqlite::Result<Bug> {
    Ok(Bug {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        created_by: row.get(3)?,
        assigned_to: row.get(4)?,
        severity: parse_severity(row.get::<_, Option<String>>(5)?.as_deref()),
        priority: parse_priority(row.get::<_, Option<String>>(6)?.as_deref()),
        status: parse_status(row.get::<_, Option<String>>(7)?.as_deref()),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        closed_at: row
            .get::<_, Option<String>>(9)?
            .as_deref()
            .map(parse_datetime),
    })
}

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
    })
}

fn parse_status(s: Option<&str>) -> Status {
    s.map_or_else(Status::default, |val| {
        val.parse()
            .unwrap_or_else(|_| Status::Custom(val.to_string()))
    })
}

fn parse_severity(s: Option<&str>) -> Severity {
    s.map_or_else(Severity::default, Severity::from)
}

fn parse_priority(s: Option<&str>) -> Priority {
    s.map_or_else(Priority::default, Priority::from)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    Utc::now()
}
