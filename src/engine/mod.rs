//! engine
//!
//! Orchestrates a publish run: Acquire -> Plan -> (Stage -> Commit -> Push)*.
//!
//! # Architecture
//!
//! - [`handle`] loads or creates the working tree and configures `origin`
//! - [`plan`] partitions the listed files into chunks
//! - [`publish`] runs the per-chunk cycle against a [`PublishBackend`]
//! - [`rollback`] resets the index after a stage or commit failure
//! - [`driver`] ties them together and produces a [`RunReport`]
//!
//! # Invariants
//!
//! - Chunks are published strictly in order, one at a time
//! - Chunk N+1 is never committed unless chunk N was pushed or skipped
//! - A failed stage or commit leaves the index equal to HEAD
//! - A failed push never removes the local commit
//! - Only [`handle`] and [`publish`] reach into the `git` module
//!
//! # Example
//!
//! ```ignore
//! use bulkpush::engine::{run, RunOptions};
//!
//! let report = run(&settings, RunOptions::default(), &mut |_event| {})?;
//! println!("{} chunks pushed", report.chunks_pushed);
//! ```

pub mod driver;
pub mod handle;
pub mod plan;
pub mod publish;
pub mod rollback;

pub use driver::{
    plan_source, publish_chunks, run, HaltInfo, Progress, RunError, RunEvent, RunOptions,
    RunReport,
};
pub use handle::{AcquireReport, RemoteAction, RepoOrigin, RepositoryError, RepositoryHandle};
pub use plan::{Chunk, ChunkPreview, Plan};
pub use publish::{execute, ChunkState, PublishBackend, PublishError, PublishResult, Step};
pub use rollback::{rollback_index, RollbackResult};

use std::path::PathBuf;

use crate::ui::output::Verbosity;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file.
    pub config: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Interactive mode enabled.
    pub interactive: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            config: None,
            debug: false,
            quiet: false,
            interactive: true,
        }
    }
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Prompts are allowed only when interactive and not quiet.
    pub fn can_prompt(&self) -> bool {
        self.interactive && !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod context {
        use super::*;

        #[test]
        fn default_values() {
            let ctx = Context::default();
            assert!(ctx.config.is_none());
            assert!(!ctx.debug);
            assert!(!ctx.quiet);
            assert!(ctx.interactive);
            assert!(ctx.can_prompt());
            assert_eq!(ctx.verbosity(), Verbosity::Normal);
        }

        #[test]
        fn quiet_disables_prompts() {
            let ctx = Context {
                quiet: true,
                debug: true,
                ..Default::default()
            };
            assert!(!ctx.can_prompt());
            assert_eq!(ctx.verbosity(), Verbosity::Quiet);
        }
    }
}
