//! publish command - Publish a folder into a repository chunk by chunk

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use super::load_config;
use crate::cli::args::SourceArgs;
use crate::core::config::{ConfigError, PublishParams};
use crate::core::types::ChunkSize;
use crate::engine::{
    self, ChunkState, Context, RemoteAction, RepoOrigin, RunError, RunEvent, RunOptions,
    RunReport,
};
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts;

/// Publish a folder into a repository and push it chunk by chunk.
pub fn publish(
    ctx: &Context,
    source: SourceArgs,
    repository: Option<PathBuf>,
    remote: Option<String>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let verbosity = ctx.verbosity();
    let config = load_config(ctx)?;

    let mut params = config.merge(PublishParams {
        source: source.source,
        repository,
        remote,
        chunk_size: source.chunk_size,
    });
    prompt_missing(&mut params, ctx)?;

    let (settings, warnings) = params.validate()?;
    for warning in warnings {
        output::warn(warning.message, verbosity);
    }
    output::debug(
        format!(
            "source={} repository={} remote={} chunk_size={}",
            settings.source.display(),
            settings.repository.display(),
            settings.remote,
            settings.chunk_size
        ),
        verbosity,
    );

    // Keep stdout for the report in JSON mode.
    let progress_verbosity = if json { Verbosity::Quiet } else { verbosity };
    let label = settings.source_label();
    let mut observer = |event: RunEvent<'_>| show_event(event, &label, progress_verbosity);

    match engine::run(&settings, RunOptions { dry_run }, &mut observer) {
        Ok(report) => {
            if json {
                output::json(&report)?;
            } else {
                show_summary(&report, verbosity);
            }
            Ok(())
        }
        Err(RunError::Halted { report, error }) => {
            if json {
                output::json(&report)?;
            } else if let Some(rollback) = report.halted.as_ref().and_then(|h| h.rollback.as_ref()) {
                output::debug(format!("rollback: {}", rollback.summary()), verbosity);
            }
            bail!(
                "{error}\nRe-run the same command to resume; published chunks are not repeated."
            )
        }
        Err(err) => Err(err).context("publish failed"),
    }
}

/// Fill required values that are still unset from interactive prompts.
fn prompt_missing(params: &mut PublishParams, ctx: &Context) -> Result<()> {
    for key in params.missing() {
        if !ctx.can_prompt() {
            return Err(ConfigError::Missing(key))
                .with_context(|| format!("pass --{key} or set '{key}' in the config file"));
        }
        let answer = match key {
            "source" => prompts::input("Source folder", None, ctx.interactive),
            "repository" => prompts::input("Repository path", None, ctx.interactive),
            _ => prompts::input("Remote URL", None, ctx.interactive),
        }
        .map_err(|e| match e {
            prompts::PromptError::NotInteractive => anyhow::Error::new(ConfigError::Missing(key))
                .context(format!("pass --{key} or set '{key}' in the config file")),
            other => other.into(),
        })?;
        match key {
            "source" => params.source = Some(PathBuf::from(answer)),
            "repository" => params.repository = Some(PathBuf::from(answer)),
            _ => params.remote = Some(answer),
        }
    }

    // Optional: without a terminal the default applies silently.
    if params.chunk_size.is_none() && ctx.can_prompt() && prompts::stdin_is_terminal() {
        let stdin = io::stdin();
        fill_chunk_size(params, &mut stdin.lock(), &mut io::stderr())?;
    }
    Ok(())
}

/// Ask for the chunk size, offering the default.
fn fill_chunk_size<R: BufRead, W: Write>(
    params: &mut PublishParams,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), prompts::PromptError> {
    let default = ChunkSize::DEFAULT.to_string();
    let answer = prompts::input_from(reader, writer, "Chunk size", Some(&default))?;
    params.chunk_size = Some(answer);
    Ok(())
}

fn show_event(event: RunEvent<'_>, label: &str, verbosity: Verbosity) {
    match event {
        RunEvent::Planned(plan) if plan.is_empty() => {
            output::print(format!("Nothing to do: '{label}' contains no files"), verbosity);
        }
        RunEvent::Planned(plan) => {
            output::print(
                format!(
                    "Found {} files in '{label}': {} chunk(s) of up to {}",
                    plan.file_count(),
                    plan.len(),
                    plan.chunk_size()
                ),
                verbosity,
            );
        }
        RunEvent::Acquired(acquired) => {
            if acquired.origin == RepoOrigin::Created {
                output::print("Initialized new repository", verbosity);
            }
            match &acquired.remote {
                RemoteAction::Created => output::print("Added remote 'origin'", verbosity),
                RemoteAction::Updated { previous } => output::print(
                    format!("Updated remote 'origin' (was {previous})"),
                    verbosity,
                ),
                RemoteAction::Unchanged => {}
            }
            if let Some(status) = &acquired.dirty {
                output::warn(
                    format!(
                        "repository has uncommitted or untracked changes ({}); continuing",
                        status.describe()
                    ),
                    verbosity,
                );
            }
        }
        RunEvent::ChunkDone { result, progress } => {
            let tag = output::format_progress(result.chunk, result.total);
            for excluded in &result.excluded {
                output::warn(format!("{tag} skipped {excluded}"), verbosity);
            }
            match result.state {
                ChunkState::Pushed => {
                    let commit = match &result.commit {
                        Some(oid) => format!("commit {}", oid.short(7)),
                        None => "nothing new to commit".to_string(),
                    };
                    output::print(
                        format!(
                            "{tag} pushed {} files ({commit}); {} files committed so far",
                            result.staged, progress.files_committed
                        ),
                        verbosity,
                    );
                }
                ChunkState::Skipped => {
                    output::warn(format!("{tag} no publishable files; chunk skipped"), verbosity);
                }
                _ => {
                    if let Some(rollback) = result.rollback.as_ref().filter(|r| r.has_failures()) {
                        output::warn(format!("{tag} {}", rollback.summary()), verbosity);
                    }
                }
            }
        }
    }
}

fn show_summary(report: &RunReport, verbosity: Verbosity) {
    if report.nothing_to_do() {
        return;
    }
    if report.dry_run {
        for chunk in &report.preview {
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
        output::print("Dry run: repository not touched", verbosity);
        return;
    }

    let branch = report
        .branch
        .as_ref()
        .map(|b| b.to_string())
        .unwrap_or_default();
    output::success(
        format!(
            "Published {}/{} chunks to origin/{branch}: {} files committed, {} chunk(s) skipped",
            report.chunks_pushed, report.chunks_total, report.files_committed, report.chunks_skipped
        ),
        verbosity,
    );
}
