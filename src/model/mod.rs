//! Core data types for `bugboard`.
//!
//! This module defines the fundamental types used throughout the crate:
//! - `Bug` - A tracked defect record
//! - `Step` - One ordered reproduction instruction belonging to a bug
//! - `User` - Identity reference owned by the authentication collaborator
//! - `Status` - Bug lifecycle states
//! - `Severity` / `Priority` - Open-set classification strings
//! - `NewBug` / `BugUpdate` - Create and sparse-update payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bug lifecycle status.
///
/// The set is open: rows written by other tools with an unknown status
/// read back as `Custom`. The terminal set, which drives the
/// closing-date invariant, is fixed at `Resolved` and `Closed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
    #[serde(untagged)]
    Custom(String),
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
            Self::Custom(value) => value,
        }
    }

    /// Terminal statuses carry a non-null closing date; all others must not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = crate::error::BugboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "in progress" | "in_progress" | "inprogress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            other => Err(crate::error::BugboardError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }
}

/// Bug severity classification.
///
/// Stored as plain text; conversion from arbitrary strings never fails,
/// unrecognized values become `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Severity {
    Critical,
    #[default]
    Major,
    Minor,
    Trivial,
    #[serde(untagged)]
    Custom(String),
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Critical => "Critical",
            Self::Major => "Major",
            Self::Minor => "Minor",
            Self::Trivial => "Trivial",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => Self::Critical,
            "major" => Self::Major,
            "minor" => Self::Minor,
            "trivial" => Self::Trivial,
            _ => Self::Custom(s.trim().to_string()),
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// Bug priority classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
    #[serde(untagged)]
    Custom(String),
}

impl Priority {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Custom(value) => value,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Custom(s.trim().to_string()),
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// A tracked defect record.
///
/// `created_by` is immutable after creation. `closed_at` is non-null
/// exactly when `status.is_terminal()`; `SqliteStorage::transition_status`
/// is the only place that writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bug {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_by: i64,
    pub assigned_to: Option<i64>,
    pub severity: Severity,
    pub priority: Priority,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// One ordered reproduction instruction.
///
/// `step_order` values are unique per bug at every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: i64,
    pub bug_id: i64,
    pub step_order: i32,
    pub description: String,
}

/// Identity reference. Credentials are owned and verified by the
/// authentication collaborator; the core only stores the opaque hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// Payload for creating a bug. Status and timestamps are assigned by the
/// store, never by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBug {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub priority: Priority,
    pub assigned_to: Option<i64>,
}

/// Sparse field update for a bug.
///
/// `None` means "leave unchanged". `assigned_to` is doubly optional so an
/// update can also clear the assignee. Status, creator, and both dates are
/// deliberately absent: status changes funnel through
/// `transition_status`, the rest is immutable.
#[derive(Debug, Clone, Default)]
pub struct BugUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<Option<i64>>,
    pub severity: Option<Severity>,
    pub priority: Option<Priority>,
}

impl BugUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.assigned_to.is_none()
            && self.severity.is_none()
            && self.priority.is_none()
    }
}

/// The two independent per-user dashboard views. A bug both created by
/// and assigned to the same user appears in both lists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserWork {
    pub assigned: Vec<Bug>,
    pub created: Vec<Bug>,
}

/// Detail view of a bug: usernames resolved and steps in display order.
#[derive(Debug, Clone, Serialize)]
pub struct BugDetails {
    pub bug: Bug,
    /// Username of the creator, if the user row still exists.
    pub creator: Option<String>,
    /// Username of the assignee, if any.
    pub assignee: Option<String>,
    pub steps: Vec<Step>,
}
