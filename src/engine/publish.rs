//! engine::publish
//!
//! The per-chunk stage, commit, push cycle.
//!
//! # State machine
//!
//! ```text
//! Pending -> Staged -> Committed -> Pushed
//!    |          |          |
//!  Failed  CommitFailed PushFailed
//!
//! Pending -> Skipped   (no path in the chunk survived relativization)
//! ```
//!
//! Every step is scoped to the chunk's own paths: the changed-check, the
//! commit tree and the rollback ignore anything else sitting in the index.
//!
//! Stage and commit failures reset the chunk's index entries to HEAD before
//! returning. A push failure keeps the local commit. Every failure state is terminal and
//! the driver halts the run on it.
//!
//! When staging leaves the index identical to HEAD (the files were already
//! published by an earlier run) no commit is created and the cycle goes
//! straight to the push, which retries whatever an earlier run failed to
//! push.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::driver::Progress;
use super::handle::{RepositoryHandle, REMOTE_NAME};
use super::plan::Chunk;
use super::rollback::{rollback_index, RollbackResult};
use crate::core::paths::{relativize, PathError};
use crate::core::types::Oid;
use crate::git::GitError;

/// Repository operations a publish cycle needs.
///
/// Implemented by [`RepositoryHandle`].
pub trait PublishBackend {
    /// Root that chunk paths are made relative to.
    fn root(&self) -> &Path;

    /// Add root-relative paths to the index.
    fn stage(&mut self, paths: &[PathBuf]) -> Result<(), GitError>;

    /// Whether the index entries of `paths` differ from HEAD.
    fn has_staged_changes(&self, paths: &[PathBuf]) -> Result<bool, GitError>;

    /// Commit HEAD plus the staged `paths` on the current branch. Nothing
    /// else in the index is committed.
    fn commit(&mut self, paths: &[PathBuf], message: &str) -> Result<Oid, GitError>;

    /// Push the current branch to the same-named remote branch.
    fn push(&mut self) -> Result<(), GitError>;

    /// Reset the index entries of `paths` to HEAD, leaving the working tree alone.
    fn reset_index(&mut self, paths: &[PathBuf]) -> Result<(), GitError>;
}

impl PublishBackend for RepositoryHandle {
    fn root(&self) -> &Path {
        RepositoryHandle::root(self)
    }

    fn stage(&mut self, paths: &[PathBuf]) -> Result<(), GitError> {
        self.git().stage_paths(paths)
    }

    fn has_staged_changes(&self, paths: &[PathBuf]) -> Result<bool, GitError> {
        self.git().has_staged_changes(paths)
    }

    fn commit(&mut self, paths: &[PathBuf], message: &str) -> Result<Oid, GitError> {
        self.git().commit_staged(paths, message)
    }

    fn push(&mut self) -> Result<(), GitError> {
        self.git().push(REMOTE_NAME, self.current_branch())
    }

    fn reset_index(&mut self, paths: &[PathBuf]) -> Result<(), GitError> {
        self.git().reset_paths(paths)
    }
}

/// Where a chunk's cycle ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkState {
    Pending,
    Staged,
    Committed,
    Pushed,
    Skipped,
    Failed,
    CommitFailed,
    PushFailed,
}

impl ChunkState {
    /// Whether the run must halt after this state.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ChunkState::Failed | ChunkState::CommitFailed | ChunkState::PushFailed
        )
    }
}

/// The step of the cycle a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Stage,
    Commit,
    Push,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Step::Stage => "stage",
            Step::Commit => "commit",
            Step::Push => "push",
        })
    }
}

/// A failed step of a chunk's cycle.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("chunk {chunk}: staging failed: {source}")]
    Stage { chunk: usize, source: GitError },

    #[error("chunk {chunk}: commit failed: {source}")]
    Commit { chunk: usize, source: GitError },

    #[error("chunk {chunk}: push failed: {source}")]
    Push { chunk: usize, source: GitError },
}

impl PublishError {
    pub fn step(&self) -> Step {
        match self {
            PublishError::Stage { .. } => Step::Stage,
            PublishError::Commit { .. } => Step::Commit,
            PublishError::Push { .. } => Step::Push,
        }
    }

    pub fn chunk(&self) -> usize {
        match self {
            PublishError::Stage { chunk, .. }
            | PublishError::Commit { chunk, .. }
            | PublishError::Push { chunk, .. } => *chunk,
        }
    }
}

/// Outcome of one chunk.
#[derive(Debug)]
pub struct PublishResult {
    pub chunk: usize,
    pub total: usize,
    pub state: ChunkState,
    /// Commit created for this chunk; `None` when nothing new was staged.
    pub commit: Option<Oid>,
    /// Paths handed to the index.
    pub staged: usize,
    /// Paths dropped because they could not be made root-relative.
    pub excluded: Vec<PathError>,
    pub error: Option<PublishError>,
    /// Present when a stage or commit failure triggered an index reset.
    pub rollback: Option<RollbackResult>,
}

impl PublishResult {
    fn new(chunk: &Chunk) -> Self {
        Self {
            chunk: chunk.index(),
            total: chunk.total(),
            state: ChunkState::Pending,
            commit: None,
            staged: 0,
            excluded: Vec::new(),
            error: None,
            rollback: None,
        }
    }

    fn fail<B: PublishBackend + ?Sized>(
        mut self,
        backend: &mut B,
        paths: &[PathBuf],
        state: ChunkState,
        error: PublishError,
    ) -> Self {
        tracing::debug!(chunk = self.chunk, step = %error.step(), error = %error, "chunk failed");
        if matches!(error.step(), Step::Stage | Step::Commit) {
            self.rollback = Some(rollback_index(backend, paths));
        }
        self.state = state;
        self.error = Some(error);
        self
    }
}

/// Run the cycle for one chunk.
///
/// Counters in `progress` are only advanced for work that completed.
pub fn execute<B: PublishBackend + ?Sized>(
    backend: &mut B,
    chunk: &Chunk,
    source_label: &str,
    progress: &mut Progress,
) -> PublishResult {
    let mut result = PublishResult::new(chunk);
    progress.current_chunk = chunk.index();

    let mut relative = Vec::with_capacity(chunk.len());
    for path in chunk.paths() {
        match relativize(path, backend.root()) {
            Ok(rel) => relative.push(rel.into_relative()),
            Err(e) => {
                tracing::debug!(chunk = chunk.index(), error = %e, "path excluded");
                result.excluded.push(e);
            }
        }
    }
    progress.files_excluded += result.excluded.len();

    if relative.is_empty() {
        tracing::info!(chunk = chunk.index(), "no valid paths; chunk skipped");
        result.state = ChunkState::Skipped;
        progress.chunks_skipped += 1;
        return result;
    }

    if let Err(source) = backend.stage(&relative) {
        let error = PublishError::Stage {
            chunk: chunk.index(),
            source,
        };
        return result.fail(backend, &relative, ChunkState::Failed, error);
    }
    result.state = ChunkState::Staged;
    result.staged = relative.len();

    let commit_err = |source| PublishError::Commit {
        chunk: chunk.index(),
        source,
    };
    let changed = match backend.has_staged_changes(&relative) {
        Ok(changed) => changed,
        Err(source) => {
            return result.fail(backend, &relative, ChunkState::CommitFailed, commit_err(source))
        }
    };
    if changed {
        match backend.commit(&relative, &chunk.commit_message(source_label)) {
            Ok(oid) => {
                tracing::info!(chunk = chunk.index(), commit = %oid.short(7), files = relative.len(), "committed");
                progress.commits_created += 1;
                progress.files_committed += relative.len();
                result.commit = Some(oid);
            }
            Err(source) => {
                return result.fail(backend, &relative, ChunkState::CommitFailed, commit_err(source))
            }
        }
    } else {
        tracing::info!(chunk = chunk.index(), "nothing new to commit");
    }
    result.state = ChunkState::Committed;

    if let Err(source) = backend.push() {
        let error = PublishError::Push {
            chunk: chunk.index(),
            source,
        };
        return result.fail(backend, &relative, ChunkState::PushFailed, error);
    }
    result.state = ChunkState::Pushed;
    progress.chunks_pushed += 1;
    tracing::info!(chunk = chunk.index(), total = chunk.total(), "pushed");

    result
}
