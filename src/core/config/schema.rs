//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Example
//!
//! ```toml
//! source = "/data/tiles"
//! repository = "/srv/mirror"
//! remote = "git@example.com:org/mirror.git"
//! chunk_size = 6000
//! ```
//!
//! Every key is optional; anything missing is taken from the command line
//! or an interactive prompt. Unknown keys are rejected.
//!
//! `chunk_size` is read as a signed integer so that zero or negative values
//! reach validation (where they are reported and replaced by the default)
//! instead of failing the parse.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Contents of a `bulkpush` config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Folder whose files are published.
    pub source: Option<PathBuf>,

    /// Working tree the files are committed into.
    pub repository: Option<PathBuf>,

    /// URL of the `origin` remote.
    pub remote: Option<String>,

    /// Files per chunk.
    pub chunk_size: Option<i64>,
}

impl FileConfig {
    /// Validate values that can be rejected without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty remote URL or an
    /// empty path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = &self.remote {
            if remote.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "remote URL cannot be empty".into(),
                ));
            }
        }
        for (key, path) in [("source", &self.source), ("repository", &self.repository)] {
            if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
                return Err(ConfigError::InvalidValue(format!("{key} cannot be empty")));
            }
        }
        Ok(())
    }
}
