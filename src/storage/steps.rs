//! Reproduction-step row operations for `bugboard`.
//!
//! Everything here takes a plain `&Connection` so the same code runs
//! standalone (wrapped by `SqliteStorage`) or inside a coordinator
//! transaction (`Transaction` derefs to `Connection`). The caller owns
//! transaction scope and commit/rollback.
//!
//! Ordering contract: for a given bug, `step_order` values are unique and
//! dense (0..n) after every write performed through this module.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::error::{BugboardError, Result};
use crate::model::Step;

fn step_from_row(row: &rusqlite::Row) -> rusqlite::Result<Step> {
    Ok(Step {
        id: row.get(0)?,
        bug_id: row.get(1)?,
        step_order: row.get(2)?,
        description: row.get(3)?,
    })
}

/// All steps for a bug, ascending by `step_order`. Empty if none.
pub(crate) fn list_for_bug(conn: &Connection, bug_id: i64) -> Result<Vec<Step>> {
    let mut stmt = conn.prepare(
        "SELECT id, bug_id, step_order, description
         FROM steps WHERE bug_id = ? ORDER BY step_order ASC",
    )?;
    let steps = stmt
        .query_map([bug_id], step_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(steps)
}

/// Fetch a single step by id.
pub(crate) fn get(conn: &Connection, step_id: i64) -> Result<Option<Step>> {
    let step = conn
        .query_row(
            "SELECT id, bug_id, step_order, description FROM steps WHERE id = ?",
            [step_id],
            step_from_row,
        )
        .optional()?;
    Ok(step)
}

/// Next order value for a bug: max existing + 1, or 0 if there are no
/// steps. Gaps left by deletions are not reused.
pub(crate) fn next_order(conn: &Connection, bug_id: i64) -> Result<i32> {
    let max: Option<i32> = conn.query_row(
        "SELECT MAX(step_order) FROM steps WHERE bug_id = ?",
        [bug_id],
        |row| row.get(0),
    )?;
    Ok(max.map_or(0, |m| m + 1))
}

/// Insert a step at the end of a bug's sequence.
pub(crate) fn insert(conn: &Connection, bug_id: i64, description: &str) -> Result<Step> {
    let order = next_order(conn, bug_id)?;
    insert_at(conn, bug_id, order, description)
}

/// Insert a step at an explicit order value. The caller is responsible
/// for keeping orders unique; used by append, replace-all, and
/// create-with-steps.
pub(crate) fn insert_at(
    conn: &Connection,
    bug_id: i64,
    order: i32,
    description: &str,
) -> Result<Step> {
    conn.execute(
        "INSERT INTO steps (bug_id, step_order, description) VALUES (?, ?, ?)",
        params![bug_id, order, description],
    )?;
    let id = conn.last_insert_rowid();
    debug!(step_id = id, bug_id, order, "Inserted step");
    Ok(Step {
        id,
        bug_id,
        step_order: order,
        description: description.to_string(),
    })
}

/// Update a step's description. `step_order` is never touched here.
pub(crate) fn update_description(
    conn: &Connection,
    step_id: i64,
    description: &str,
) -> Result<Step> {
    let affected = conn.execute(
        "UPDATE steps SET description = ? WHERE id = ?",
        params![description, step_id],
    )?;
    if affected == 0 {
        return Err(BugboardError::StepNotFound { id: step_id });
    }
    get(conn, step_id)?.ok_or(BugboardError::StepNotFound { id: step_id })
}

/// Delete a step. Idempotent: deleting a nonexistent id is a no-op.
/// Returns whether a row was actually removed.
pub(crate) fn delete(conn: &Connection, step_id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM steps WHERE id = ?", [step_id])?;
    Ok(affected > 0)
}

/// Delete every step belonging to a bug. Returns the number removed.
pub(crate) fn delete_all_for_bug(conn: &Connection, bug_id: i64) -> Result<usize> {
    let removed = conn.execute("DELETE FROM steps WHERE bug_id = ?", [bug_id])?;
    Ok(removed)
}

/// Re-sequence a bug's steps so the listed ids take positions 0..k in the
/// given order. Unlisted steps follow in their previous relative order,
/// keeping the sequence dense and tie-free.
///
/// The whole operation is validated up front: an id that does not belong
/// to the bug, or appears twice, rejects the call with nothing written.
pub(crate) fn apply_order(conn: &Connection, bug_id: i64, ordered_ids: &[i64]) -> Result<Vec<Step>> {
    let current = list_for_bug(conn, bug_id)?;
    let owned: Vec<i64> = current.iter().map(|s| s.id).collect();

    let mut seen = std::collections::HashSet::with_capacity(ordered_ids.len());
    for &id in ordered_ids {
        if !owned.contains(&id) {
            return Err(BugboardError::validation(
                "ordered_ids",
                format!("step {id} does not belong to bug {bug_id}"),
            ));
        }
        if !seen.insert(id) {
            return Err(BugboardError::validation(
                "ordered_ids",
                format!("step {id} listed more than once"),
            ));
        }
    }

    let trailing = owned.iter().copied().filter(|id| !seen.contains(id));
    let final_order: Vec<i64> = ordered_ids.iter().copied().chain(trailing).collect();

    let mut stmt = conn.prepare("UPDATE steps SET step_order = ? WHERE id = ?")?;
    for (index, id) in final_order.iter().enumerate() {
        let order = i32::try_from(index).map_err(|_| {
            BugboardError::validation("ordered_ids", "too many steps to reorder")
        })?;
        stmt.execute(params![order, id])?;
    }
    debug!(bug_id, count = final_order.len(), "Reordered steps");

    list_for_bug(conn, bug_id)
}

/// Replace a bug's whole step list: delete everything, insert the given
/// descriptions in order starting at 0. Caller validates the payload
/// before entering the transaction.
pub(crate) fn replace_all(
    conn: &Connection,
    bug_id: i64,
    descriptions: &[String],
) -> Result<Vec<Step>> {
    let removed = delete_all_for_bug(conn, bug_id)?;
    let mut steps = Vec::with_capacity(descriptions.len());
    for (index, description) in descriptions.iter().enumerate() {
        let order = i32::try_from(index)
            .map_err(|_| BugboardError::validation("steps", "too many steps"))?;
        steps.push(insert_at(conn, bug_id, order, description.trim())?);
    }
    debug!(bug_id, removed, inserted = steps.len(), "Replaced step list");
    Ok(steps)
}
