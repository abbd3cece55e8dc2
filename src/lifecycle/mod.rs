//! Lifecycle coordinator: compound operations spanning the bug and step
//! stores.
//!
//! Each operation here is one atomic unit of work — validate first,
//! then a single transaction; any failure rolls back every write. This
//! module is also where the creator-only policy lives: storage never
//! checks identity, handlers never check it inline, everything funnels
//! through [`authorize_creator`].

use tracing::{debug, info};

use crate::error::{BugboardError, Result};
use crate::model::{Bug, BugUpdate, NewBug, Status, Step};
use crate::storage::sqlite::{apply_bug_update, insert_bug};
use crate::storage::{SqliteStorage, steps};
use crate::validation::{BugValidator, StepsValidator};

/// The single creator-only policy check. Status transitions are exempt
/// (any authenticated user may transition); edits and deletes are not.
///
/// # Errors
///
/// `Forbidden` if `actor` is not the bug's creator.
pub fn authorize_creator(bug: &Bug, actor: i64) -> Result<()> {
    if bug.created_by == actor {
        Ok(())
    } else {
        Err(BugboardError::Forbidden {
            bug_id: bug.id,
            user_id: actor,
        })
    }
}

/// Parse the steps payload the HTTP layer receives as a JSON-encoded
/// array of strings in a form field. Anything that is not an array of
/// strings is rejected before any write happens.
///
/// # Errors
///
/// Returns a validation error for malformed JSON or a non-string-array
/// shape.
pub fn parse_steps_payload(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<Vec<String>>(trimmed).map_err(|e| {
        debug!(error = %e, "Rejected steps payload");
        BugboardError::validation("steps", format!("not a JSON array of strings: {e}"))
    })
}

/// Create a bug together with its initial ordered step list, as one
/// atomic unit. If any step insert fails, the bug insert rolls back with
/// it — no orphan bug, no partial step list.
///
/// # Errors
///
/// Validation errors for bad bug fields or step descriptions (checked
/// before any write); storage errors abort the whole transaction.
pub fn create_bug_with_steps(
    store: &mut SqliteStorage,
    new: &NewBug,
    created_by: i64,
    step_descriptions: &[String],
) -> Result<Bug> {
    BugValidator::validate_new(new).map_err(BugboardError::from_validation_errors)?;
    StepsValidator::validate_descriptions(step_descriptions)
        .map_err(BugboardError::from_validation_errors)?;

    let created_at = chrono::Utc::now();
    let bug = store.mutate("create_bug_with_steps", |tx| {
        let bug = insert_bug(tx, new, created_by, created_at)?;
        for (index, description) in step_descriptions.iter().enumerate() {
            let order = i32::try_from(index)
                .map_err(|_| BugboardError::validation("steps", "too many steps"))?;
            steps::insert_at(tx, bug.id, order, description.trim())?;
        }
        Ok(bug)
    })?;
    info!(
        bug_id = bug.id,
        created_by,
        steps = step_descriptions.len(),
        "Created bug with steps"
    );
    Ok(bug)
}

/// Atomically update a bug's fields and replace its whole step list.
/// Creator-only. All-or-nothing: on any failure both the fields and the
/// steps are left exactly as they were.
///
/// # Errors
///
/// `BugNotFound` / `Forbidden` / validation errors before any write;
/// storage errors abort the whole transaction.
pub fn edit_bug_with_steps(
    store: &mut SqliteStorage,
    actor: i64,
    bug_id: i64,
    update: &BugUpdate,
    step_descriptions: &[String],
) -> Result<(Bug, Vec<Step>)> {
    BugValidator::validate_update(update).map_err(BugboardError::from_validation_errors)?;
    StepsValidator::validate_descriptions(step_descriptions)
        .map_err(BugboardError::from_validation_errors)?;

    let bug = store
        .get_bug(bug_id)?
        .ok_or(BugboardError::BugNotFound { id: bug_id })?;
    authorize_creator(&bug, actor)?;

    let new_steps = store.mutate("edit_bug_with_steps", |tx| {
        if !update.is_empty() {
            apply_bug_update(tx, bug_id, update)?;
        }
        steps::replace_all(tx, bug_id, step_descriptions)
    })?;
    let bug = store
        .get_bug(bug_id)?
        .ok_or(BugboardError::BugNotFound { id: bug_id })?;
    info!(bug_id, actor, steps = new_steps.len(), "Edited bug with steps");
    Ok((bug, new_steps))
}

/// Fields-only edit path (no steps payload). Creator-only.
///
/// # Errors
///
/// `BugNotFound` / `Forbidden` / validation errors.
pub fn edit_bug(
    store: &mut SqliteStorage,
    actor: i64,
    bug_id: i64,
    update: &BugUpdate,
) -> Result<Bug> {
    let bug = store
        .get_bug(bug_id)?
        .ok_or(BugboardError::BugNotFound { id: bug_id })?;
    authorize_creator(&bug, actor)?;
    store.update_bug_fields(bug_id, update)
}

/// Delete a bug and, via cascade, all of its steps. Creator-only.
///
/// # Errors
///
/// `BugNotFound` / `Forbidden`.
pub fn delete_bug(store: &mut SqliteStorage, actor: i64, bug_id: i64) -> Result<()> {
    let bug = store
        .get_bug(bug_id)?
        .ok_or(BugboardError::BugNotFound { id: bug_id })?;
    authorize_creator(&bug, actor)?;
    store.delete_bug(bug_id)
}

/// Transition a bug's status. Deliberately unrestricted: any
/// authenticated user may move a bug between any two statuses; the
/// closing-date rule is enforced by the store.
///
/// # Errors
///
/// `BugNotFound` if the id is absent.
pub fn transition_status(store: &mut SqliteStorage, bug_id: i64, status: &Status) -> Result<Bug> {
    store.transition_status(bug_id, status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Severity};

    fn store_with_users() -> (SqliteStorage, i64, i64) {
        let mut store = SqliteStorage::open_memory().unwrap();
        let creator = store.create_user("creator", "h1").unwrap();
        let other = store.create_user("other", "h2").unwrap();
        (store, creator.id, other.id)
    }

    fn new_bug(name: &str) -> NewBug {
        NewBug {
            name: name.to_string(),
            description: "desc".to_string(),
            severity: Severity::Major,
            priority: Priority::High,
            assigned_to: None,
        }
    }

    #[test]
    fn parse_steps_payload_accepts_array_of_strings() {
        let steps = parse_steps_payload(r#"["open page", "click save"]"#).unwrap();
        assert_eq!(steps, vec!["open page", "click save"]);
        assert!(parse_steps_payload("").unwrap().is_empty());
    }

    #[test]
    fn parse_steps_payload_rejects_non_arrays() {
        assert!(parse_steps_payload(r#"{"steps": []}"#).is_err());
        assert!(parse_steps_payload("[1, 2]").is_err());
        assert!(parse_steps_payload("not json").is_err());
    }

    #[test]
    fn create_with_invalid_steps_writes_nothing() {
        let (mut store, creator, _) = store_with_users();
        let err = create_bug_with_steps(
            &mut store,
            &new_bug("doomed"),
            creator,
            &["fine".to_string(), "  ".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, BugboardError::Validation { .. }));
        assert!(store.list_bugs(&Default::default()).unwrap().is_empty());
    }

    #[test]
    fn edit_by_non_creator_is_forbidden() {
        let (mut store, creator, other) = store_with_users();
        let bug = create_bug_with_steps(&mut store, &new_bug("mine"), creator, &[]).unwrap();

        let update = BugUpdate {
            name: Some("theirs".to_string()),
            ..Default::default()
        };
        let err = edit_bug(&mut store, other, bug.id, &update).unwrap_err();
        assert!(matches!(err, BugboardError::Forbidden { .. }));

        let err = delete_bug(&mut store, other, bug.id).unwrap_err();
        assert!(matches!(err, BugboardError::Forbidden { .. }));

        // Status transitions are open to everyone
        assert!(transition_status(&mut store, bug.id, &Status::Closed).is_ok());
    }
}
