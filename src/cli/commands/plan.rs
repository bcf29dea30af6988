//! plan command - Show how a folder would be split into chunks

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use serde::Serialize;

use super::load_config;
use crate::cli::args::SourceArgs;
use crate::core::config::ConfigError;
use crate::core::types::ChunkSize;
use crate::engine::{self, ChunkPreview, Context};
use crate::ui::output;
use crate::ui::prompts;

#[derive(Debug, Serialize)]
struct PlanSummary {
    source: PathBuf,
    chunk_size: usize,
    files: usize,
    chunks: Vec<ChunkPreview>,
}

/// Preview the chunk layout of a source folder.
///
/// Only the source and chunk size are needed; no repository is opened.
pub fn plan(ctx: &Context, args: SourceArgs, json: bool) -> Result<()> {
    let verbosity = ctx.verbosity();
    let config = load_config(ctx)?;

    let source = match args.source.or_else(|| config.file.source.clone()) {
        Some(source) => source,
        None if ctx.can_prompt() => PathBuf::from(prompts::input(
            "Source folder",
            None,
            ctx.interactive,
        )?),
        None => {
            return Err(ConfigError::Missing("source"))
                .context("pass --source or set 'source' in the config file")
        }
    };

    let raw_size = args
        .chunk_size
        .or_else(|| config.file.chunk_size.filter(|n| *n > 0).map(|n| n.to_string()));
    let chunk_size = match raw_size {
        Some(raw) => {
            let (size, rejected) = ChunkSize::parse_or_default(&raw);
            if let Some(reason) = rejected {
                output::warn(
                    format!("invalid chunk size {reason}; using default {}", ChunkSize::DEFAULT),
                    verbosity,
                );
            }
            size
        }
        None => ChunkSize::DEFAULT,
    };

    let plan = engine::plan_source(&source, chunk_size)?;
    let summary = PlanSummary {
        source,
        chunk_size: chunk_size.get(),
        files: plan.file_count(),
        chunks: plan.preview(),
    };

    if json {
        output::json(&summary)?;
        return Ok(());
    }

    output::print(
        format!(
            "{} files in {} chunk(s) of up to {}",
            summary.files,
            summary.chunks.len(),
            summary.chunk_size
        ),
        verbosity,
    );
    for chunk in &summary.chunks {
        output::print(
            format!(
                "{} {} files: {} .. {}",
                output::format_progress(chunk.index, chunk.total),
                chunk.files,
                chunk.first.display(),
                chunk.last.display()
            ),
            verbosity,
        );
    }
    Ok(())
}
