//! bulkpush - Publish large file sets to a git remote in bounded chunks
//!
//! bulkpush takes every file under a source folder and commits it into a
//! git working tree, then pushes it to a remote, a fixed number of files at
//! a time. Keeping each commit and push bounded avoids the size limits that
//! hosting services and transports put on a single operation, and lets an
//! interrupted run resume by simply running again.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, resolves settings)
//! - [`engine`] - Acquire, plan, and the per-chunk stage/commit/push cycle
//! - [`core`] - Domain types, configuration, paths, listing, locking
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - User interaction utilities
//!
//! # Correctness Invariants
//!
//! 1. Chunks are published strictly in order and the run halts at the first failure
//! 2. A failed stage or commit leaves the index equal to HEAD
//! 3. No path outside the repository root is ever staged
//! 4. Only one run touches a repository at a time

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
