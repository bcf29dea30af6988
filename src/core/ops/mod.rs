//! core::ops
//!
//! Guards held around repository mutation.
//!
//! - [`lock`] - Exclusive per-repository run lock

pub mod lock;

pub use lock::{LockError, RepoLock};
