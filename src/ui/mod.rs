//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`prompts`] - Interactive prompts for missing parameters
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All console output and prompts go through this module so quiet mode,
//! debug mode and non-interactive runs behave the same in every command.

pub mod output;
pub mod prompts;
