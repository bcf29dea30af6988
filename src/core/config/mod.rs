//! core::config
//!
//! Configuration loading and validation of publish parameters.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values (`chunk_size` = 6000)
//! 2. Config file
//! 3. CLI flags
//! 4. Interactive prompts, for required values still missing and for an unset
//!    `chunk_size` when stdin is a terminal (handled by `cli`)
//!
//! # Config File Locations
//!
//! Searched in order, first hit wins:
//! 1. `--config <path>` (must exist)
//! 2. `$BULKPUSH_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/bulkpush/config.toml`
//! 4. `~/.bulkpush/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use bulkpush::core::config::{Config, PublishParams};
//!
//! let loaded = Config::load(None).unwrap();
//! let params = loaded.config.merge(PublishParams {
//!     remote: Some("https://example.com/mirror.git".into()),
//!     ..Default::default()
//! });
//! let (settings, warnings) = params.validate().unwrap();
//! println!("publishing {} in chunks of {}", settings.source.display(), settings.chunk_size);
//! ```

pub mod schema;

pub use schema::FileConfig;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::ChunkSize;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "BULKPUSH_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("config file '{path}' does not exist")]
    NotFound { path: PathBuf },

    #[error("missing required value: {0}")]
    Missing(&'static str),

    #[error("source folder '{path}' does not exist or is not a directory")]
    SourceNotADirectory { path: PathBuf },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// A non-fatal problem found while resolving configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

/// Configuration loaded from disk.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: FileConfig,
    loaded_from: Option<PathBuf>,
}

impl Config {
    /// Load the config file from the standard locations.
    ///
    /// A missing file is not an error unless it was named explicitly.
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with(explicit, |key| std::env::var_os(key), dirs::home_dir())
    }

    /// [`Config::load`] with the environment and home directory supplied by
    /// the caller.
    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<std::ffi::OsString>,
        home: Option<PathBuf>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::candidate_paths(&env, home)
                .into_iter()
                .find(|p| p.is_file()),
        };

        let Some(path) = path else {
            return Ok(ConfigLoadResult {
                config: Config::default(),
                warnings: Vec::new(),
            });
        };

        let file = Self::read_file_config(&path)?;
        file.validate()?;

        let mut warnings = Vec::new();
        if file.chunk_size.is_some_and(|n| n <= 0) {
            warnings.push(ConfigWarning {
                message: format!(
                    "chunk_size in '{}' must be positive; it will be ignored",
                    path.display()
                ),
            });
        }

        Ok(ConfigLoadResult {
            config: Config {
                file,
                loaded_from: Some(path),
            },
            warnings,
        })
    }

    fn candidate_paths(
        env: &impl Fn(&str) -> Option<std::ffi::OsString>,
        home: Option<PathBuf>,
    ) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = env(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Some(xdg) = env("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("bulkpush/config.toml"));
        }
        if let Some(home) = home {
            paths.push(home.join(".bulkpush/config.toml"));
        }
        paths
    }

    fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Path the config was read from, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    /// Overlay CLI-provided values on top of the file values.
    pub fn merge(&self, cli: PublishParams) -> PublishParams {
        PublishParams {
            source: cli.source.or_else(|| self.file.source.clone()),
            repository: cli.repository.or_else(|| self.file.repository.clone()),
            remote: cli.remote.or_else(|| self.file.remote.clone()),
            chunk_size: cli.chunk_size.or_else(|| {
                self.file
                    .chunk_size
                    .filter(|n| *n > 0)
                    .map(|n| n.to_string())
            }),
        }
    }
}

/// Raw, possibly incomplete publish parameters.
///
/// `chunk_size` stays a string until validation so that bad operator input
/// is reported and replaced instead of rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishParams {
    pub source: Option<PathBuf>,
    pub repository: Option<PathBuf>,
    pub remote: Option<String>,
    pub chunk_size: Option<String>,
}

impl PublishParams {
    /// Names of required values that are still unset.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.source.is_none() {
            missing.push("source");
        }
        if self.repository.is_none() {
            missing.push("repository");
        }
        if self.remote.is_none() {
            missing.push("remote");
        }
        missing
    }

    /// Check the parameters and produce settings the pipeline can run with.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Missing`] when source, repository or remote is unset
    /// - [`ConfigError::SourceNotADirectory`] when the source folder is absent
    /// - [`ConfigError::InvalidValue`] for an empty remote URL
    pub fn validate(self) -> Result<(PublishSettings, Vec<ConfigWarning>), ConfigError> {
        let source = self.source.ok_or(ConfigError::Missing("source"))?;
        let repository = self.repository.ok_or(ConfigError::Missing("repository"))?;
        let remote = self.remote.ok_or(ConfigError::Missing("remote"))?;

        let remote = remote.trim().to_string();
        if remote.is_empty() {
            return Err(ConfigError::InvalidValue(
                "remote URL cannot be empty".into(),
            ));
        }
        if !source.is_dir() {
            return Err(ConfigError::SourceNotADirectory { path: source });
        }

        let mut warnings = Vec::new();
        let chunk_size = match self.chunk_size.as_deref().map(str::trim) {
            None | Some("") => ChunkSize::DEFAULT,
            Some(raw) => {
                let (size, rejected) = ChunkSize::parse_or_default(raw);
                if let Some(reason) = rejected {
                    warnings.push(ConfigWarning {
                        message: format!(
                            "invalid chunk size {reason}; using default {}",
                            ChunkSize::DEFAULT
                        ),
                    });
                }
                size
            }
        };

        Ok((
            PublishSettings {
                source,
                repository,
                remote,
                chunk_size,
            },
            warnings,
        ))
    }
}

/// Validated parameters for one publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    /// Existing folder whose files are published.
    pub source: PathBuf,
    /// Working tree; created when absent.
    pub repository: PathBuf,
    /// URL for the `origin` remote.
    pub remote: String,
    pub chunk_size: ChunkSize,
}

impl PublishSettings {
    /// Label recorded in commit messages: the source folder's base name.
    pub fn source_label(&self) -> String {
        source_label(&self.source)
    }
}

/// Base name of a folder, falling back to the whole path for roots like `/`.
pub fn source_label(source: &Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string())
}
