//! core::ops::lock
//!
//! Exclusive per-repository lock held for the length of a publish run.
//!
//! The working tree and index are the only shared mutable state of a run,
//! so two pipelines against the same repository must never interleave their
//! stage/commit/push cycles. The lock lives at `<git_dir>/bulkpush.lock` and
//! uses an OS-level advisory lock via `fs2`, which works across processes.
//!
//! # Invariants
//!
//! - Acquisition is non-blocking (fails fast if locked)
//! - The lock is released on drop, including during unwinding
//!
//! # Example
//!
//! ```ignore
//! use bulkpush::core::ops::lock::RepoLock;
//!
//! let lock = RepoLock::acquire(git.git_dir())?;
//! // ... publish chunks ...
//! drop(lock);
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::lock_path;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("repository is locked by another bulkpush run ({path})")]
    AlreadyLocked { path: PathBuf },

    /// Failed to open or create the lock file.
    #[error("failed to create lock '{path}': {source}")]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(std::io::Error),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(std::io::Error),
}

/// An exclusive lock on a repository, released on drop.
#[derive(Debug)]
pub struct RepoLock {
    path: PathBuf,
    file: Option<File>,
}

impl RepoLock {
    /// Attempt to acquire the lock for the repository whose metadata
    /// directory is `git_dir`.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another run holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be opened
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be taken
    pub fn acquire(git_dir: &Path) -> Result<Self, LockError> {
        let path = lock_path(git_dir);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::CreateFailed {
                path: path.clone(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::AlreadyLocked { path })
            }
            Err(e) => Err(LockError::AcquireFailed(e)),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock().map_err(LockError::ReleaseFailed)?;
        }
        Ok(())
    }
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
