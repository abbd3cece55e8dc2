//! Logging initialization for `bugboard`.
//!
//! The embedding process calls [`init_logging`] once at startup; tests
//! use [`init_test_logging`], which is safe to call repeatedly.

use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Initialize the global tracing subscriber.
///
/// Filter precedence: `RUST_LOG` if set, otherwise the given default
/// directive (e.g. `"bugboard=info"`).
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    Ok(())
}

/// Initialize logging for tests: test-capture writer, repeated calls are
/// no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
