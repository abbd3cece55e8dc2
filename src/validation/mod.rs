//! Validation helpers for `bugboard`.
//!
//! These routines enforce the data constraints on bug and step payloads
//! and return structured validation errors without mutating storage.
//! Compound operations in [`crate::lifecycle`] run them before opening a
//! transaction: validate first, mutate second.

use crate::error::ValidationError;
use crate::model::{BugUpdate, NewBug};

/// Maximum length for a bug name.
pub const MAX_NAME_LEN: usize = 500;
/// Maximum length for a bug or step description.
pub const MAX_DESCRIPTION_LEN: usize = 102_400;

/// Validates bug payloads.
pub struct BugValidator;

impl BugValidator {
    /// Validate a create payload and return all validation errors found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate_new(new: &NewBug) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if new.name.trim().is_empty() {
            errors.push(ValidationError::new("name", "cannot be empty"));
        }
        if new.name.len() > MAX_NAME_LEN {
            errors.push(ValidationError::new("name", "exceeds 500 characters"));
        }
        if new.description.trim().is_empty() {
            errors.push(ValidationError::new("description", "cannot be empty"));
        }
        if new.description.len() > MAX_DESCRIPTION_LEN {
            errors.push(ValidationError::new("description", "exceeds 100KB"));
        }
        if new.severity.as_str().trim().is_empty() {
            errors.push(ValidationError::new("severity", "cannot be empty"));
        }
        if new.priority.as_str().trim().is_empty() {
            errors.push(ValidationError::new("priority", "cannot be empty"));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Validate a sparse update. Absent fields are not constrained.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any present field is invalid.
    pub fn validate_update(update: &BugUpdate) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(name) = update.name.as_ref() {
            if name.trim().is_empty() {
                errors.push(ValidationError::new("name", "cannot be empty"));
            }
            if name.len() > MAX_NAME_LEN {
                errors.push(ValidationError::new("name", "exceeds 500 characters"));
            }
        }
        if let Some(description) = update.description.as_ref() {
            if description.trim().is_empty() {
                errors.push(ValidationError::new("description", "cannot be empty"));
            }
            if description.len() > MAX_DESCRIPTION_LEN {
                errors.push(ValidationError::new("description", "exceeds 100KB"));
            }
        }
        if let Some(severity) = update.severity.as_ref() {
            if severity.as_str().trim().is_empty() {
                errors.push(ValidationError::new("severity", "cannot be empty"));
            }
        }
        if let Some(priority) = update.priority.as_ref() {
            if priority.as_str().trim().is_empty() {
                errors.push(ValidationError::new("priority", "cannot be empty"));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Validates reproduction-step payloads.
pub struct StepsValidator;

impl StepsValidator {
    /// Validate a single step description.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if the description is empty after
    /// trimming or oversized.
    pub fn validate_description(description: &str) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if description.trim().is_empty() {
            errors.push(ValidationError::new("description", "cannot be empty"));
        }
        if description.len() > MAX_DESCRIPTION_LEN {
            errors.push(ValidationError::new("description", "exceeds 100KB"));
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Validate an ordered list of step descriptions, as used by
    /// replace-all and create-with-steps. Reports the index of each bad
    /// entry so the whole payload can be rejected in one pass.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` naming every invalid entry.
    pub fn validate_descriptions(descriptions: &[String]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        for (index, description) in descriptions.iter().enumerate() {
            if description.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("steps[{index}]"),
                    "cannot be empty",
                ));
            } else if description.len() > MAX_DESCRIPTION_LEN {
                errors.push(ValidationError::new(
                    format!("steps[{index}]"),
                    "exceeds 100KB",
                ));
            }
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Severity};

    fn new_bug(name: &str, description: &str) -> NewBug {
        NewBug {
            name: name.to_string(),
            description: description.to_string(),
            severity: Severity::Major,
            priority: Priority::High,
            assigned_to: None,
        }
    }

    #[test]
    fn valid_new_bug_passes() {
        assert!(BugValidator::validate_new(&new_bug("UI glitch", "Navbar overlaps hero")).is_ok());
    }

    #[test]
    fn blank_required_fields_are_reported_together() {
        let errors = BugValidator::validate_new(&new_bug("   ", "")).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "description"]);
    }

    #[test]
    fn empty_custom_severity_is_rejected() {
        let mut bug = new_bug("x", "y");
        bug.severity = Severity::Custom(String::new());
        let errors = BugValidator::validate_new(&bug).unwrap_err();
        assert_eq!(errors[0].field, "severity");
    }

    #[test]
    fn update_with_no_fields_passes() {
        assert!(BugValidator::validate_update(&BugUpdate::default()).is_ok());
    }

    #[test]
    fn update_with_blank_name_fails() {
        let update = BugUpdate {
            name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(BugValidator::validate_update(&update).is_err());
    }

    #[test]
    fn step_description_must_not_be_whitespace() {
        assert!(StepsValidator::validate_description("Open the login page").is_ok());
        assert!(StepsValidator::validate_description(" \t ").is_err());
    }

    #[test]
    fn step_list_reports_offending_indexes() {
        let steps = vec![
            "Open the app".to_string(),
            String::new(),
            "Click save".to_string(),
            "   ".to_string(),
        ];
        let errors = StepsValidator::validate_descriptions(&steps).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["steps[1]", "steps[3]"]);
    }
}
