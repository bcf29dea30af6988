//! engine::handle
//!
//! Acquisition of the working tree a run publishes into.
//!
//! [`RepositoryHandle::acquire`] either loads the repository at the target
//! path or creates and initializes it, then brings it into the shape the
//! publish cycle relies on:
//!
//! - the run lock is held
//! - a remote named `origin` points at the configured URL
//! - HEAD is on a branch that has at least one commit
//!
//! Once acquired, the handle is the only writer to the repository for the
//! rest of the run.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::core::ops::lock::{LockError, RepoLock};
use crate::core::paths::GIT_DIR_NAME;
use crate::core::types::{BranchName, Oid};
use crate::git::{Git, GitError, WorktreeStatus};

/// Name of the remote every chunk is pushed to.
pub const REMOTE_NAME: &str = "origin";

/// Message of the empty commit created in a repository without history.
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial repository setup";

/// Branch preferred for new repositories.
pub const DEFAULT_BRANCH: &str = "main";

/// Used when [`DEFAULT_BRANCH`] cannot be created.
pub const FALLBACK_BRANCH: &str = "master";

/// Errors acquiring or configuring the repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to create repository directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to initialize repository at '{path}': {source}")]
    Init { path: PathBuf, source: GitError },

    #[error("failed to open repository at '{path}': {source}")]
    Open { path: PathBuf, source: GitError },

    #[error(transparent)]
    Locked(#[from] LockError),

    #[error("failed to configure remote '{name}': {source}")]
    Remote { name: String, source: GitError },

    #[error("could not create branch 'main' or 'master': {0}")]
    NoBranch(GitError),

    #[error("HEAD is detached; check out a branch before publishing")]
    DetachedHead,

    #[error(transparent)]
    Git(#[from] GitError),
}

/// How the working tree came to exist for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoOrigin {
    Created,
    Loaded,
}

/// What acquisition did to the `origin` remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum RemoteAction {
    Created,
    Updated { previous: String },
    Unchanged,
}

/// Everything acquisition observed or changed.
#[derive(Debug, Clone)]
pub struct AcquireReport {
    pub origin: RepoOrigin,
    pub remote: RemoteAction,
    /// Set when an empty initial commit had to be created.
    pub initial_commit: Option<Oid>,
    /// Uncommitted or untracked changes found in a loaded working tree.
    pub dirty: Option<WorktreeStatus>,
}

/// An acquired, locked working tree with a current branch and an `origin`.
#[derive(Debug)]
pub struct RepositoryHandle {
    git: Git,
    root: PathBuf,
    branch: BranchName,
    // Held for the handle's lifetime.
    _lock: RepoLock,
}

impl RepositoryHandle {
    /// Load or create the repository at `path` and configure `origin`.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::CreateDir`] if the directory cannot be created
    /// - [`RepositoryError::Init`] / [`RepositoryError::Open`] on git failures
    /// - [`RepositoryError::Locked`] if another run holds the repository
    /// - [`RepositoryError::Remote`] if `origin` cannot be written
    /// - [`RepositoryError::NoBranch`] / [`RepositoryError::DetachedHead`]
    ///   when no current branch can be established
    pub fn acquire(path: &Path, remote_url: &str) -> Result<(Self, AcquireReport), RepositoryError> {
        let (git, root, origin) = if path.join(GIT_DIR_NAME).exists() {
            let root = canonical(path)?;
            let git = Git::open(&root).map_err(|source| RepositoryError::Open {
                path: root.clone(),
                source,
            })?;
            (git, root, RepoOrigin::Loaded)
        } else {
            fs::create_dir_all(path).map_err(|source| RepositoryError::CreateDir {
                path: path.to_path_buf(),
                source,
            })?;
            let root = canonical(path)?;
            let initial = BranchName::new(DEFAULT_BRANCH).map_err(GitError::from)?;
            let git = Git::init(&root, &initial).map_err(|source| RepositoryError::Init {
                path: root.clone(),
                source,
            })?;
            tracing::info!(path = %root.display(), "initialized repository");
            (git, root, RepoOrigin::Created)
        };

        let lock = RepoLock::acquire(git.git_dir())?;

        let dirty = match origin {
            RepoOrigin::Loaded => {
                let status = git.worktree_status(true)?;
                (!status.is_clean()).then_some(status)
            }
            RepoOrigin::Created => None,
        };

        let remote = configure_remote(&git, remote_url)?;

        let mut initial_commit = None;
        let branch = if git.has_commits()? {
            git.current_branch()?.ok_or(RepositoryError::DetachedHead)?
        } else {
            let oid = git.commit_empty(INITIAL_COMMIT_MESSAGE)?;
            tracing::info!(commit = %oid.short(7), "created initial commit");
            initial_commit = Some(oid);
            ensure_standard_branch(&git)?
        };

        tracing::debug!(
            root = %root.display(),
            branch = %branch,
            ?origin,
            ?remote,
            "repository acquired"
        );

        let handle = Self {
            git,
            root,
            branch,
            _lock: lock,
        };
        let report = AcquireReport {
            origin,
            remote,
            initial_commit,
            dirty,
        };
        Ok((handle, report))
    }

    /// Branch every chunk is committed to and pushed from.
    pub fn current_branch(&self) -> &BranchName {
        &self.branch
    }

    /// Canonical working tree root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git(&self) -> &Git {
        &self.git
    }
}

fn canonical(path: &Path) -> Result<PathBuf, RepositoryError> {
    path.canonicalize()
        .map_err(|source| RepositoryError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

fn configure_remote(git: &Git, url: &str) -> Result<RemoteAction, RepositoryError> {
    let remote_err = |source| RepositoryError::Remote {
        name: REMOTE_NAME.to_string(),
        source,
    };

    match git.remote_url(REMOTE_NAME).map_err(remote_err)? {
        Some(current) if current == url => Ok(RemoteAction::Unchanged),
        Some(previous) => {
            git.set_remote_url(REMOTE_NAME, url).map_err(remote_err)?;
            tracing::info!(%previous, %url, "updated remote url");
            Ok(RemoteAction::Updated { previous })
        }
        None => {
            git.add_remote(REMOTE_NAME, url).map_err(remote_err)?;
            tracing::info!(%url, "added remote");
            Ok(RemoteAction::Created)
        }
    }
}

/// Keep `main`/`master` if HEAD is already on one, otherwise switch to a
/// new `main` (or `master`) at HEAD.
fn ensure_standard_branch(git: &Git) -> Result<BranchName, RepositoryError> {
    if let Some(current) = git.current_branch()? {
        if current.as_str() == DEFAULT_BRANCH || current.as_str() == FALLBACK_BRANCH {
            return Ok(current);
        }
    }

    let mut last_err = None;
    for name in [DEFAULT_BRANCH, FALLBACK_BRANCH] {
        let branch = BranchName::new(name).map_err(GitError::from)?;
        match git.create_branch_at_head(&branch) {
            Ok(()) => return Ok(branch),
            Err(e) => {
                tracing::debug!(branch = name, error = %e, "branch creation failed");
                last_err = Some(e);
            }
        }
    }
    Err(RepositoryError::NoBranch(last_err.unwrap_or_else(|| {
        GitError::Internal {
            message: "no branch candidates".into(),
        }
    })))
}
