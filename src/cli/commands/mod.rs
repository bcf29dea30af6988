//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves settings (flags, config file, prompts)
//! 2. Calls the engine
//! 3. Formats and displays output
//!
//! Handlers do NOT touch the repository directly.

mod completion;
mod plan;
mod publish;

// Re-export command functions for testing and direct invocation
pub use completion::completion;
pub use plan::plan;
pub use publish::publish;

use anyhow::Result;

use crate::cli::args::Command;
use crate::core::config::{Config, ConfigLoadResult};
use crate::engine::Context;
use crate::ui::output;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Publish {
            source,
            repository,
            remote,
            dry_run,
            json,
        } => publish::publish(ctx, source, repository, remote, dry_run, json),
        Command::Plan { source, json } => plan::plan(ctx, source, json),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Load the config file and report what was found.
fn load_config(ctx: &Context) -> Result<Config> {
    let verbosity = ctx.verbosity();
    let ConfigLoadResult { config, warnings } = Config::load(ctx.config.as_deref())?;

    if let Some(path) = config.loaded_from() {
        output::debug(format!("loaded config from {}", path.display()), verbosity);
    }
    for warning in warnings {
        output::warn(warning.message, verbosity);
    }
    Ok(config)
}
