//! core
//!
//! Domain types, configuration, and the filesystem-facing pieces of a run.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, ChunkSize
//! - [`config`] - Configuration schema, loading and validation
//! - [`listing`] - Ordered enumeration of the files to publish
//! - [`paths`] - Root-relative path mapping and metadata locations
//! - [`ops`] - Repository locking
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Nothing here talks to git; that is the job of [`crate::git`]
//! - Listing and path mapping are deterministic

pub mod config;
pub mod listing;
pub mod ops;
pub mod paths;
pub mod types;
