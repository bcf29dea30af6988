//! Rollback of a chunk whose stage or commit step failed.
//!
//! Rolling back means putting the chunk's index entries back to HEAD's
//! version. Entries outside the chunk stay staged. The working tree is
//! never touched: the files stay on disk and are picked up again by the
//! next run. A commit that was already created is never undone, so a failed
//! push leaves its commit in place for the next run to push.
//!
//! A failed rollback is reported, not raised. The cycle is already halting
//! with the original error, which is the one the operator needs to see.

use std::path::PathBuf;

use serde::Serialize;

use super::publish::PublishBackend;

/// Result of a rollback attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackResult {
    /// Whether the index now matches HEAD.
    pub complete: bool,
    /// Why the reset failed, if it did.
    pub error: Option<String>,
}

impl RollbackResult {
    pub fn has_failures(&self) -> bool {
        !self.complete
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        match &self.error {
            None => "index reset to HEAD".to_string(),
            Some(err) => format!("index could not be reset: {err}"),
        }
    }
}

/// Reset the index entries of a chunk's `paths` to HEAD.
pub fn rollback_index<B: PublishBackend + ?Sized>(backend: &mut B, paths: &[PathBuf]) -> RollbackResult {
    match backend.reset_index(paths) {
        Ok(()) => {
            tracing::debug!("index reset to HEAD");
            RollbackResult {
                complete: true,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "index rollback failed");
            RollbackResult {
                complete: false,
                error: Some(e.to_string()),
            }
        }
    }
}
