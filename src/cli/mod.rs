//! cli
//!
//! Command-line interface layer for bulkpush.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up diagnostic logging
//! - Delegate to command handlers
//! - Does NOT touch the repository directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap, resolves settings,
//! and dispatches to the [`crate::engine`] for execution.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::engine;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let ctx = engine::Context {
        config: cli.config.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        interactive: cli.interactive(),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the stderr tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise warnings only, or everything from
/// this crate at debug level under `--debug`.
fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            "bulkpush=debug,warn".into()
        } else {
            "warn".into()
        }
    });

    let fmt_layer = fmt::Layer::new()
        .with_target(debug)
        .with_level(true)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when embedded or under test.
    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
}
