#![allow(dead_code)]

use bugboard::model::{NewBug, Priority, Severity};
use bugboard::storage::SqliteStorage;

/// A valid create payload with defaults a builder can override.
pub fn new_bug(name: &str) -> NewBug {
    NewBug {
        name: name.to_string(),
        description: format!("Reproduction notes for {name}"),
        severity: Severity::Major,
        priority: Priority::High,
        assigned_to: None,
    }
}

pub struct NewBugBuilder {
    bug: NewBug,
}

impl NewBugBuilder {
    pub fn new(name: &str) -> Self {
        Self { bug: new_bug(name) }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.bug.description = description.to_string();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.bug.severity = severity;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.bug.priority = priority;
        self
    }

    pub fn assigned_to(mut self, user_id: i64) -> Self {
        self.bug.assigned_to = Some(user_id);
        self
    }

    pub fn build(self) -> NewBug {
        self.bug
    }
}

/// Seed a user and return its id. Usernames are unique per store, so
/// tests pick distinct names.
pub fn user(storage: &mut SqliteStorage, username: &str) -> i64 {
    storage
        .create_user(username, "fixture-hash")
        .expect("Failed to seed user")
        .id
}

/// Step descriptions as owned strings.
pub fn steps(descriptions: &[&str]) -> Vec<String> {
    descriptions.iter().map(|s| (*s).to_string()).collect()
}
