//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module is the **single doorway** to the version-control engine.
//! Repository creation, remotes, the index, and commits go through libgit2;
//! `push` shells out to the `git` CLI so the operator's transports and
//! credential helpers apply unchanged.
//!
//! # Error Handling
//!
//! Engine failures are normalized into [`GitError`] here and nowhere else.
//! Callers above this layer never see a `git2::Error` or a raw exit status.
//!
//! # Example
//!
//! ```ignore
//! use bulkpush::core::types::BranchName;
//! use bulkpush::git::Git;
//! use std::path::{Path, PathBuf};
//!
//! let git = Git::init(Path::new("/srv/mirror"), &BranchName::new("main")?)?;
//! let chunk = [PathBuf::from("tiles/1/2/3.png")];
//! git.stage_paths(&chunk)?;
//! let oid = git.commit_staged(&chunk, "Add files from chunk 1/1 (Source: tiles)")?;
//! println!("committed {}", oid.short(7));
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::core::types::{BranchName, Oid, TypeError};

/// Identity used for commits when the repository has none configured.
pub const FALLBACK_NAME: &str = "bulkpush";
pub const FALLBACK_EMAIL: &str = "bulkpush@localhost";

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// No repository at the given path.
    #[error("not a git repository: {path}")]
    NotARepo { path: PathBuf },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound { refname: String },

    /// A file handed to the index does not exist in the working tree.
    #[error("path not found in working tree: {path}")]
    PathNotFound { path: PathBuf },

    /// Invalid branch or ref name.
    #[error("invalid name: {message}")]
    InvalidName { message: String },

    /// Invalid object id.
    #[error("invalid object id: {oid}")]
    InvalidOid { oid: String },

    /// Repository files are locked or unreadable.
    #[error("repository access error: {message}")]
    AccessError { message: String },

    /// The remote refused the push or could not be reached.
    #[error("push of {refspec} to {remote} failed: {stderr}")]
    PushRejected {
        remote: String,
        refspec: String,
        stderr: String,
    },

    /// The `git` executable could not be run.
    #[error("failed to run git: {message}")]
    CliUnavailable { message: String },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal { message: String },
}

impl GitError {
    /// Translate a git2 error, keeping the operation or path as context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound if context.starts_with("refs/") || context == "HEAD" => {
                GitError::RefNotFound {
                    refname: context.to_string(),
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidName {
                message: format!("{}: {}", context, err.message()),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("{} is locked: {}", context, err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(oid) => GitError::InvalidOid { oid },
            TypeError::InvalidBranchName(message) => GitError::InvalidName { message },
        }
    }
}

/// Summary of working tree status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files (if requested)
    pub untracked: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// No staged, unstaged, untracked or conflicted entries.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && self.untracked == 0 && !self.has_conflicts
    }

    /// One-line description for warnings, e.g. "2 staged, 5 untracked".
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (count, label) in [
            (self.staged, "staged"),
            (self.unstaged, "modified"),
            (self.untracked, "untracked"),
        ] {
            if count > 0 {
                parts.push(format!("{count} {label}"));
            }
        }
        if self.has_conflicts {
            parts.push("conflicts".to_string());
        }
        if parts.is_empty() {
            "clean".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// The Git interface.
///
/// Owns the opened repository for the lifetime of a run.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open the repository whose working tree is exactly `path`.
    ///
    /// Unlike discovery, parent directories are not searched: a working tree
    /// nested inside another repository is never mistaken for its parent.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` has no repository
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Initialize a new repository at an existing directory.
    ///
    /// The unborn HEAD points at `initial_branch`.
    pub fn init(path: &Path, initial_branch: &BranchName) -> Result<Self, GitError> {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head(initial_branch.as_str());

        let repo = git2::Repository::init_opts(path, &opts)
            .map_err(|e| GitError::from_git2(e, &path.display().to_string()))?;
        Ok(Self { repo })
    }

    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Working tree root.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Count staged, unstaged and (optionally) untracked entries.
    pub fn worktree_status(&self, include_untracked: bool) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(include_untracked)
            .recurse_untracked_dirs(false)
            .include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "status"))?;

        let mut result = WorktreeStatus::default();
        for entry in statuses.iter() {
            let status = entry.status();

            if status.is_conflicted() {
                result.has_conflicts = true;
            }
            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }
            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }
            if status.is_wt_new() {
                result.untracked += 1;
            }
        }

        Ok(result)
    }

    /// Whether the index entry of any of `paths` differs from HEAD's tree.
    ///
    /// Entries outside `paths` are ignored, so changes the operator staged
    /// by hand never count. Paths are matched literally, not as globs.
    pub fn has_staged_changes(&self, paths: &[PathBuf]) -> Result<bool, GitError> {
        if paths.is_empty() {
            return Ok(false);
        }
        let index = self.repo.index().map_err(|e| GitError::from_git2(e, "index"))?;
        let head_tree = self.head_tree()?;

        let mut opts = git2::DiffOptions::new();
        opts.disable_pathspec_match(true);
        for path in paths {
            opts.pathspec(path.as_path());
        }

        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "diff"))?;
        Ok(diff.deltas().len() > 0)
    }

    // =========================================================================
    // HEAD and Branches
    // =========================================================================

    /// Whether HEAD points at a commit.
    pub fn has_commits(&self) -> Result<bool, GitError> {
        match self.repo.head() {
            Ok(_) => Ok(true),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(false)
            }
            Err(e) => Err(GitError::from_git2(e, "HEAD")),
        }
    }

    /// HEAD's tree, or `None` on an unborn HEAD.
    fn head_tree(&self) -> Result<Option<git2::Tree<'_>>, GitError> {
        if !self.has_commits()? {
            return Ok(None);
        }
        let tree = self
            .repo
            .head()
            .and_then(|head| head.peel_to_tree())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        Ok(Some(tree))
    }

    /// Get the current branch name, if on a branch.
    ///
    /// Returns `None` if HEAD is detached or unborn.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                return Ok(None)
            }
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };

        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }

        Ok(None)
    }

    /// Whether a local branch exists.
    pub fn branch_exists(&self, branch: &BranchName) -> bool {
        self.repo
            .find_branch(branch.as_str(), git2::BranchType::Local)
            .is_ok()
    }

    /// Create a local branch at HEAD and make it the current branch.
    ///
    /// The working tree and index are left as they are; HEAD's commit does
    /// not change, only the ref HEAD points through.
    pub fn create_branch_at_head(&self, branch: &BranchName) -> Result<(), GitError> {
        let head = self
            .repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        if !self.branch_exists(branch) {
            self.repo
                .branch(branch.as_str(), &head, false)
                .map_err(|e| GitError::from_git2(e, &branch.ref_path()))?;
        }
        self.repo
            .set_head(&branch.ref_path())
            .map_err(|e| GitError::from_git2(e, &branch.ref_path()))
    }

    // =========================================================================
    // Remotes
    // =========================================================================

    /// URL of a remote, or `None` if it is not configured.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, name)),
        }
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.repo
            .remote(name, url)
            .map(|_| ())
            .map_err(|e| GitError::from_git2(e, name))
    }

    /// Point an existing remote at a new URL in place.
    pub fn set_remote_url(&self, name: &str, url: &str) -> Result<(), GitError> {
        self.repo
            .remote_set_url(name, url)
            .map_err(|e| GitError::from_git2(e, name))
    }

    // =========================================================================
    // Index and Commits
    // =========================================================================

    /// Add root-relative paths to the index and write it out.
    ///
    /// Either every path is staged or the index is left untouched: entries
    /// are accumulated in memory and written once at the end, and the
    /// in-memory index is reloaded from disk if any entry fails.
    pub fn stage_paths(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        let work_dir = self.work_dir()?;
        let present = |p: &PathBuf| {
            std::fs::symlink_metadata(work_dir.join(p)).is_ok_and(|meta| !meta.is_dir())
        };
        if let Some(missing) = paths.iter().find(|p| !present(p)) {
            return Err(GitError::PathNotFound {
                path: missing.clone(),
            });
        }

        let mut index = self.repo.index().map_err(|e| GitError::from_git2(e, "index"))?;
        for path in paths {
            if let Err(e) = index.add_path(path) {
                // The repository shares this index object; drop the partial adds.
                if let Err(reload) = index.read(true) {
                    tracing::warn!(error = %reload, "index reload failed; partial adds remain in memory");
                }
                return Err(GitError::from_git2(e, &path.display().to_string()));
            }
        }

        index.write().map_err(|e| GitError::from_git2(e, "index"))
    }

    /// Put the index entries of `paths` back to HEAD's version.
    ///
    /// A path HEAD does not contain is dropped from the index. Other entries
    /// and the working tree are left alone.
    pub fn reset_paths(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        let head = self.head_index()?;
        let mut index = self.repo.index().map_err(|e| GitError::from_git2(e, "index"))?;
        for path in paths {
            let context = path.display().to_string();
            match head.get_path(path, 0) {
                Some(entry) => index.add(&entry),
                None => index.remove_path(path),
            }
            .map_err(|e| GitError::from_git2(e, &context))?;
        }
        index.write().map_err(|e| GitError::from_git2(e, "index"))
    }

    /// In-memory index holding HEAD's tree; empty on an unborn HEAD.
    fn head_index(&self) -> Result<git2::Index, GitError> {
        let mut index = git2::Index::new().map_err(|e| GitError::from_git2(e, "index"))?;
        if let Some(tree) = self.head_tree()? {
            index
                .read_tree(&tree)
                .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        }
        Ok(index)
    }

    /// Commit identity: repository/user config, else the fallback identity.
    fn signature(&self) -> Result<git2::Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig.to_owned()),
            Err(_) => git2::Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)
                .map_err(|e| GitError::from_git2(e, "signature")),
        }
    }

    /// Commit HEAD's tree plus the staged versions of `paths`.
    ///
    /// The tree is assembled in memory from HEAD, so whatever else sits in
    /// the index stays staged and out of the commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::PathNotFound`] if one of `paths` was never staged
    pub fn commit_staged(&self, paths: &[PathBuf], message: &str) -> Result<Oid, GitError> {
        let staged = self.repo.index().map_err(|e| GitError::from_git2(e, "index"))?;
        let mut tree_index = self.head_index()?;
        for path in paths {
            let entry = staged
                .get_path(path, 0)
                .ok_or_else(|| GitError::PathNotFound { path: path.clone() })?;
            tree_index
                .add(&entry)
                .map_err(|e| GitError::from_git2(e, &path.display().to_string()))?;
        }

        let tree_id = tree_index
            .write_tree_to(&self.repo)
            .map_err(|e| GitError::from_git2(e, "write tree"))?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, "write tree"))?;
        self.commit_tree(&tree, message)
    }

    /// Create a commit with an empty tree on HEAD.
    pub fn commit_empty(&self, message: &str) -> Result<Oid, GitError> {
        let tree_id = self
            .repo
            .treebuilder(None)
            .and_then(|builder| builder.write())
            .map_err(|e| GitError::from_git2(e, "empty tree"))?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, "empty tree"))?;
        self.commit_tree(&tree, message)
    }

    fn commit_tree(&self, tree: &git2::Tree<'_>, message: &str) -> Result<Oid, GitError> {
        let signature = self.signature()?;
        let parent = if self.has_commits()? {
            Some(
                self.repo
                    .head()
                    .and_then(|head| head.peel_to_commit())
                    .map_err(|e| GitError::from_git2(e, "HEAD"))?,
            )
        } else {
            None
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, tree, &parents)
            .map_err(|e| GitError::from_git2(e, "commit"))?;
        Ok(Oid::new(oid.to_string())?)
    }

    // =========================================================================
    // Push
    // =========================================================================

    /// Push `branch` to the same-named branch on `remote`.
    ///
    /// Runs `git push <remote> <branch>:<branch>` in the working tree and
    /// blocks until it exits. There is no timeout.
    pub fn push(&self, remote: &str, branch: &BranchName) -> Result<(), GitError> {
        let refspec = branch.refspec();
        let output = Command::new("git")
            .arg("push")
            .arg(remote)
            .arg(&refspec)
            .current_dir(self.work_dir()?)
            .output()
            .map_err(|e| GitError::CliUnavailable {
                message: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(GitError::PushRejected {
                remote: remote.to_string(),
                refspec,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
