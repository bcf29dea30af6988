//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. No other module imports
//! `git2` or spawns the `git` executable. Everything above it works with
//! [`Git`], strong types ([`Oid`](crate::core::types::Oid),
//! [`BranchName`](crate::core::types::BranchName)) and [`GitError`].
//!
//! Local operations use libgit2. Pushing runs `git push`, so whatever
//! transports and credential helpers the operator has configured apply.
//!
//! # Responsibilities
//!
//! - Repository opening and initialization
//! - Branch and HEAD resolution
//! - Remote configuration
//! - Index staging, index reset, commits
//! - Working tree status
//! - Push
//!
//! # Example
//!
//! ```ignore
//! use bulkpush::core::types::BranchName;
//! use bulkpush::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/srv/mirror"))?;
//! let branch = git.current_branch()?.expect("on a branch");
//! git.push("origin", &branch)?;
//! ```

mod interface;

pub use interface::{Git, GitError, WorktreeStatus, FALLBACK_EMAIL, FALLBACK_NAME};
