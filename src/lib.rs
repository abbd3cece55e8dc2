//! `bugboard` — the persistence core of a multi-user bug tracker.
//!
//! Models bugs and their ordered reproduction steps, enforces the
//! status/closing-date invariant, and provides the atomic compound
//! mutations (create-with-steps, full-replace-steps, reorder,
//! status-transition) a thin HTTP layer calls into. Authentication,
//! routing, and rendering live outside this crate; mutating operations
//! receive an already-authenticated user id and trust it.
//!
//! ```no_run
//! use bugboard::config::StoreConfig;
//! use bugboard::model::{NewBug, Priority, Severity, Status};
//! use bugboard::{Result, lifecycle};
//!
//! fn main() -> Result<()> {
//!     let mut store = StoreConfig::from_env().open()?;
//!     let reporter = store.create_user("admin", "<hash>")?.id;
//!
//!     let bug = lifecycle::create_bug_with_steps(
//!         &mut store,
//!         &NewBug {
//!             name: "UI glitch on homepage".into(),
//!             description: "Navbar overlaps the hero section".into(),
//!             severity: Severity::Major,
//!             priority: Priority::High,
//!             assigned_to: None,
//!         },
//!         reporter,
//!         &["Open the homepage".into(), "Shrink the window".into()],
//!     )?;
//!
//!     store.transition_status(bug.id, &Status::Resolved)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod storage;
pub mod validation;

pub use error::{BugboardError, ErrorKind, Result};
pub use model::{Bug, BugDetails, BugUpdate, NewBug, Priority, Severity, Status, Step, User};
pub use storage::{BugFilters, SqliteStorage};
