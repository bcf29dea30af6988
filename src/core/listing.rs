//! core::listing
//!
//! Recursive enumeration of the files to publish.
//!
//! The listing is ordered: entries of each directory are visited in sorted
//! byte order, depth first. Identical trees therefore always produce
//! identical lists, which keeps chunk boundaries (and the commit messages
//! derived from them) stable across restarts.
//!
//! `.git` directories are never entered. A `.git` *file* (a submodule
//! gitfile) is still listed; the relativizer excludes it before staging.
//! Symlinks are listed as files and not followed.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::paths::GIT_DIR_NAME;

/// Errors from listing a source directory.
#[derive(Debug, Error)]
pub enum ListError {
    #[error("source folder '{path}' does not exist or is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// List every file under `root` as an absolute path.
///
/// `root` is canonicalized first so the returned paths are absolute even
/// when a relative root is given.
///
/// # Errors
///
/// - [`ListError::NotADirectory`] if `root` is missing or not a directory
/// - [`ListError::Io`] if any directory below it cannot be read
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, ListError> {
    if !root.is_dir() {
        return Err(ListError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    let root = root.canonicalize().map_err(|source| ListError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    walk(&root, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), ListError> {
    let io_err = |source| ListError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir)
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let file_type = entry.file_type().map_err(io_err)?;
        let path = entry.path();
        if file_type.is_dir() {
            if entry.file_name() == GIT_DIR_NAME {
                continue;
            }
            walk(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
