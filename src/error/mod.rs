//! Error types and handling for `bugboard`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Structured variants for the cases callers branch on; `Other` wraps
//!   anything else via `anyhow`
//! - [`ErrorKind`] collapses the variants into the four categories the
//!   HTTP layer maps to response classes: not-found, validation,
//!   forbidden, storage

use thiserror::Error;

/// Primary error type for `bugboard` operations.
#[derive(Error, Debug)]
pub enum BugboardError {
    // === Entity lookups ===
    /// Bug with the specified id was not found.
    #[error("Bug not found: {id}")]
    BugNotFound { id: i64 },

    /// Step with the specified id was not found.
    #[error("Step not found: {id}")]
    StepNotFound { id: i64 },

    // === Validation ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Invalid status value on the write path.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    // === Authorization ===
    /// Creator-only mutation attempted by another user.
    #[error("User {user_id} is not the creator of bug {bug_id}")]
    Forbidden { bug_id: i64, user_id: i64 },

    // === Storage ===
    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped error from collaborating code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The failure categories exposed to the HTTP layer. The core never
/// renders or redirects; callers pick a response class from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Forbidden,
    Storage,
}

/// A single field validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl BugboardError {
    /// The category this error falls into.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BugNotFound { .. } | Self::StepNotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } | Self::ValidationErrors { .. } | Self::InvalidStatus { .. } => {
                ErrorKind::Validation
            }
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Database(_) | Self::Io(_) | Self::Other(_) => ErrorKind::Storage,
        }
    }

    /// Can the user fix this by correcting their input?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Storage)
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create from multiple validation errors.
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }
}

/// Result type using `BugboardError`.
pub type Result<T> = std::result::Result<T, BugboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BugboardError::BugNotFound { id: 42 };
        assert_eq!(err.to_string(), "Bug not found: 42");
    }

    #[test]
    fn test_validation_error() {
        let err = BugboardError::validation("name", "cannot be empty");
        assert_eq!(err.to_string(), "Validation failed: name: cannot be empty");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            BugboardError::StepNotFound { id: 7 }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            BugboardError::Forbidden {
                bug_id: 1,
                user_id: 2
            }
            .kind(),
            ErrorKind::Forbidden
        );
        let db = BugboardError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(1),
            None,
        ));
        assert_eq!(db.kind(), ErrorKind::Storage);
        assert!(!db.is_user_recoverable());
    }

    #[test]
    fn test_single_validation_error_collapses() {
        let err =
            BugboardError::from_validation_errors(vec![ValidationError::new("severity", "empty")]);
        assert!(matches!(err, BugboardError::Validation { .. }));

        let err = BugboardError::from_validation_errors(vec![
            ValidationError::new("name", "empty"),
            ValidationError::new("priority", "empty"),
        ]);
        assert!(matches!(err, BugboardError::ValidationErrors { .. }));
    }

    #[test]
    fn test_validation_error_struct() {
        let err = ValidationError::new("description", "cannot be empty");
        assert_eq!(err.to_string(), "description: cannot be empty");
    }
}
