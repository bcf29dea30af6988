//! core::types
//!
//! Strong types for the values that flow through a publish run.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name (the push refspec is built from it)
//! - [`Oid`] - Commit identifier recorded for each published chunk
//! - [`ChunkSize`] - Positive upper bound on files per chunk
//!
//! # Validation
//!
//! These types enforce validity at construction time, so a refspec can never
//! be assembled from a malformed branch and a chunk size can never be zero.
//!
//! # Examples
//!
//! ```
//! use bulkpush::core::types::{BranchName, ChunkSize, Oid};
//!
//! let branch = BranchName::new("main").unwrap();
//! assert_eq!(branch.refspec(), "main:main");
//!
//! let size = ChunkSize::new(500).unwrap();
//! assert_eq!(size.get(), 500);
//! assert!(ChunkSize::new(0).is_none());
//!
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated Git branch name.
///
/// Follows the subset of `git check-ref-format --branch` rules that matter
/// when the name is used verbatim in a `<src>:<dst>` push refspec: no empty
/// name, no leading `.`/`-`, no `..`, `@{`, `//`, no trailing `/` or `.lock`,
/// no whitespace, control characters or any of `~^:\?*[`.
///
/// # Example
///
/// ```
/// use bulkpush::core::types::BranchName;
///
/// assert!(BranchName::new("datasets/2024").is_ok());
/// assert!(BranchName::new("bad..name").is_err());
/// assert!(BranchName::new("has:colon").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(format!("'{name}': {why}")));

        if name.is_empty() {
            return reject("empty");
        }
        if name == "@" {
            return reject("'@' is reserved");
        }
        if name.starts_with('-') {
            return reject("starts with '-'");
        }
        if name.ends_with('/') {
            return reject("ends with '/'");
        }
        for pattern in ["..", "@{", "//"] {
            if name.contains(pattern) {
                return reject(&format!("contains '{pattern}'"));
            }
        }
        if let Some(c) = name
            .chars()
            .find(|c| c.is_whitespace() || c.is_ascii_control() || "~^:\\?*[".contains(*c))
        {
            return reject(&format!("contains {c:?}"));
        }
        if name
            .split('/')
            .any(|part| part.starts_with('.') || part.ends_with(".lock"))
        {
            return reject("component starts with '.' or ends with '.lock'");
        }
        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Same-name push refspec (`<branch>:<branch>`).
    pub fn refspec(&self) -> String {
        format!("{0}:{0}", self.0)
    }

    /// Full ref path (`refs/heads/<branch>`).
    pub fn ref_path(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Git object identifier, normalized to lowercase hex.
///
/// ```
/// use bulkpush::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id (40 hex chars for SHA-1, 64 for SHA-256).
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(format!("'{oid}' is not hexadecimal")));
        }
        Ok(Self(oid))
    }

    /// Abbreviated form; the full id when `len` exceeds it.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maximum number of files staged, committed and pushed together.
///
/// Backed by [`NonZeroUsize`]: a zero or negative size is corrected where raw
/// input is parsed (see [`ChunkSize::parse_or_default`]), never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct ChunkSize(NonZeroUsize);

impl ChunkSize {
    /// Files per chunk when nothing else is configured.
    pub const DEFAULT: ChunkSize = match NonZeroUsize::new(6000) {
        Some(n) => ChunkSize(n),
        None => unreachable!(),
    };

    /// Returns `None` for zero.
    pub fn new(size: usize) -> Option<Self> {
        NonZeroUsize::new(size).map(Self)
    }

    /// Parse operator input, falling back to [`ChunkSize::DEFAULT`].
    ///
    /// Returns the size together with a description of the rejected input
    /// when the fallback was taken, so callers can report it.
    ///
    /// ```
    /// use bulkpush::core::types::ChunkSize;
    ///
    /// assert_eq!(ChunkSize::parse_or_default("250").0.get(), 250);
    ///
    /// let (size, rejected) = ChunkSize::parse_or_default("-3");
    /// assert_eq!(size, ChunkSize::DEFAULT);
    /// assert!(rejected.is_some());
    /// ```
    pub fn parse_or_default(raw: &str) -> (Self, Option<String>) {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(n) if n > 0 => match usize::try_from(n).ok().and_then(Self::new) {
                Some(size) => (size, None),
                None => (Self::DEFAULT, Some(format!("'{raw}' is too large"))),
            },
            Ok(_) => (
                Self::DEFAULT,
                Some(format!("'{raw}' must be a positive integer")),
            ),
            Err(e) => (Self::DEFAULT, Some(format!("'{raw}': {e}"))),
        }
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<usize> for ChunkSize {
    type Error = String;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        Self::new(size).ok_or_else(|| "chunk size must be a positive integer".to_string())
    }
}

impl From<ChunkSize> for usize {
    fn from(size: ChunkSize) -> Self {
        size.get()
    }
}

impl std::fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
