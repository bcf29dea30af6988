//! core::paths
//!
//! Mapping of absolute file paths onto paths relative to the repository root.
//!
//! # Architecture
//!
//! Every file handed to the index goes through [`relativize`] first. The
//! index only accepts root-relative paths, and a path that resolves above
//! the root, or through any `.git` component, must never reach it.
//!
//! Normalization is purely lexical: `.` components are dropped and `..`
//! folds onto its parent. The filesystem is not consulted, so symlinks are
//! not resolved; the lister already yields paths under a canonical root.
//!
//! # Example
//!
//! ```
//! use bulkpush::core::paths::{relativize, PathError};
//! use std::path::Path;
//!
//! let rel = relativize(Path::new("/srv/repo/data/a.png"), Path::new("/srv/repo")).unwrap();
//! assert_eq!(rel.relative(), Path::new("data/a.png"));
//!
//! let err = relativize(Path::new("/srv/repo/../etc/passwd"), Path::new("/srv/repo"));
//! assert!(matches!(err, Err(PathError::OutsideRoot { .. })));
//! ```

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Name of the version-control metadata directory.
pub const GIT_DIR_NAME: &str = ".git";

/// Name of the lock file placed inside the metadata directory.
pub const LOCK_FILE_NAME: &str = "bulkpush.lock";

/// Why a path cannot be expressed relative to the repository root.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("'{path}' is not absolute")]
    NotAbsolute { path: PathBuf },

    #[error("'{path}' is outside repository root '{root}'")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("'{path}' climbs above the filesystem root")]
    EscapesRoot { path: PathBuf },

    #[error("'{path}' is or lies inside a .git entry")]
    InsideGitDir { path: PathBuf },

    #[error("'{path}' is the repository root itself")]
    IsRoot { path: PathBuf },
}

/// An absolute path paired with its validated root-relative form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativePath {
    absolute: PathBuf,
    relative: PathBuf,
}

impl RelativePath {
    pub fn absolute(&self) -> &Path {
        &self.absolute
    }

    /// Root-relative path; never contains `..` and never starts inside `.git`.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn into_relative(self) -> PathBuf {
        self.relative
    }
}

/// Lexically normalize an absolute path.
///
/// Returns `None` when a `..` would climb above the path's root.
pub fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
        }
    }
    Some(out)
}

/// Express `path` relative to `root`.
///
/// Both arguments must be absolute. Paths on a different drive or prefix
/// surface as [`PathError::OutsideRoot`].
pub fn relativize(path: &Path, root: &Path) -> Result<RelativePath, PathError> {
    if !path.is_absolute() {
        return Err(PathError::NotAbsolute {
            path: path.to_path_buf(),
        });
    }
    let normalized = normalize(path).ok_or_else(|| PathError::EscapesRoot {
        path: path.to_path_buf(),
    })?;
    let normalized_root = normalize(root).unwrap_or_else(|| root.to_path_buf());

    let relative = normalized
        .strip_prefix(&normalized_root)
        .map_err(|_| PathError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    if relative.as_os_str().is_empty() {
        return Err(PathError::IsRoot {
            path: path.to_path_buf(),
        });
    }
    // Nested `.git` entries (submodule gitfiles, vendored repositories) are
    // refused by the index just like the top-level one.
    if relative
        .components()
        .any(|c| matches!(c, Component::Normal(part) if part == GIT_DIR_NAME))
    {
        return Err(PathError::InsideGitDir {
            path: path.to_path_buf(),
        });
    }
    Ok(RelativePath {
        absolute: path.to_path_buf(),
        relative: relative.to_path_buf(),
    })
}

/// Location of the run lock for a repository whose metadata lives in `git_dir`.
pub fn lock_path(git_dir: &Path) -> PathBuf {
    git_dir.join(LOCK_FILE_NAME)
}
