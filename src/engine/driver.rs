//! engine::driver
//!
//! Runs a whole publish: list, plan, acquire, then one cycle per chunk.
//!
//! # Lifecycle
//!
//! ```text
//! list files -> plan -> [empty? stop] -> [dry run? stop] -> acquire -> chunk 1..n
//! ```
//!
//! Nothing on disk is touched before acquisition, so an empty source or a
//! dry run never creates or initializes the repository. Chunks run strictly
//! in order and the first failed chunk halts the run; later chunks are never
//! attempted.
//!
//! Progress is reported through a caller-supplied observer so the driver
//! stays free of any console handling.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::handle::{AcquireReport, RemoteAction, RepoOrigin, RepositoryError, RepositoryHandle};
use super::plan::{ChunkPreview, Plan};
use super::publish::{self, PublishBackend, PublishError, PublishResult, Step};
use super::rollback::RollbackResult;
use crate::core::config::PublishSettings;
use crate::core::listing::{list_files, ListError};
use crate::core::types::{BranchName, ChunkSize, Oid};

/// Counters owned by the driver and advanced by each cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 1-based index of the chunk being processed.
    pub current_chunk: usize,
    pub chunks_pushed: usize,
    pub chunks_skipped: usize,
    pub commits_created: usize,
    pub files_committed: usize,
    pub files_excluded: usize,
    pub branch: BranchName,
}

impl Progress {
    pub fn new(branch: BranchName) -> Self {
        Self {
            current_chunk: 0,
            chunks_pushed: 0,
            chunks_skipped: 0,
            commits_created: 0,
            files_committed: 0,
            files_excluded: 0,
            branch,
        }
    }
}

/// Options that change how far a run goes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Stop after planning.
    pub dry_run: bool,
}

/// Notifications emitted while a run progresses.
#[derive(Debug)]
pub enum RunEvent<'a> {
    Planned(&'a Plan),
    Acquired(&'a AcquireReport),
    ChunkDone {
        result: &'a PublishResult,
        progress: &'a Progress,
    },
}

/// Where and why a run stopped early.
#[derive(Debug, Clone, Serialize)]
pub struct HaltInfo {
    pub chunk: usize,
    pub total: usize,
    pub step: Step,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<RollbackResult>,
}

/// Summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub source: PathBuf,
    pub repository: PathBuf,
    pub chunk_size: usize,
    pub dry_run: bool,
    pub files_listed: usize,
    pub chunks_total: usize,
    pub chunks_pushed: usize,
    pub chunks_skipped: usize,
    pub files_committed: usize,
    pub files_excluded: usize,
    pub commits: Vec<Oid>,
    pub branch: Option<BranchName>,
    pub repository_origin: Option<RepoOrigin>,
    pub remote: Option<RemoteAction>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<ChunkPreview>,
    pub halted: Option<HaltInfo>,
}

impl RunReport {
    pub fn new(run_id: Uuid, source: PathBuf, repository: PathBuf, chunk_size: ChunkSize) -> Self {
        Self {
            run_id: run_id.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            source,
            repository,
            chunk_size: chunk_size.get(),
            dry_run: false,
            files_listed: 0,
            chunks_total: 0,
            chunks_pushed: 0,
            chunks_skipped: 0,
            files_committed: 0,
            files_excluded: 0,
            commits: Vec::new(),
            branch: None,
            repository_origin: None,
            remote: None,
            warnings: Vec::new(),
            preview: Vec::new(),
            halted: None,
        }
    }

    /// True when every planned chunk was pushed or skipped.
    pub fn succeeded(&self) -> bool {
        self.halted.is_none()
    }

    /// Nothing was listed, so nothing was attempted.
    pub fn nothing_to_do(&self) -> bool {
        self.files_listed == 0
    }

    fn record_acquire(&mut self, acquired: &AcquireReport, branch: &BranchName) {
        self.branch = Some(branch.clone());
        self.repository_origin = Some(acquired.origin);
        self.remote = Some(acquired.remote.clone());
        if let Some(status) = &acquired.dirty {
            self.warnings.push(format!(
                "repository has uncommitted or untracked changes ({})",
                status.describe()
            ));
        }
    }

    fn record_chunk(&mut self, result: &PublishResult, progress: &Progress) {
        self.chunks_pushed = progress.chunks_pushed;
        self.chunks_skipped = progress.chunks_skipped;
        self.files_committed = progress.files_committed;
        self.files_excluded = progress.files_excluded;
        if let Some(oid) = &result.commit {
            self.commits.push(oid.clone());
        }
        self.warnings
            .extend(result.excluded.iter().map(|e| format!("skipped {e}")));
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }
}

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    List(#[from] ListError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// A chunk failed; the report covers everything up to and including it.
    #[error("run halted: {error}")]
    Halted {
        report: Box<RunReport>,
        error: PublishError,
    },
}

/// List and plan without touching any repository.
pub fn plan_source(source: &std::path::Path, chunk_size: ChunkSize) -> Result<Plan, RunError> {
    let files = list_files(source)?;
    Ok(Plan::build(files, chunk_size))
}

/// Publish `settings.source` into `settings.repository` chunk by chunk.
///
/// # Errors
///
/// - [`RunError::List`] if the source cannot be listed
/// - [`RunError::Repository`] if acquisition fails (including a held lock)
/// - [`RunError::Halted`] at the first chunk whose cycle fails
pub fn run(
    settings: &PublishSettings,
    options: RunOptions,
    observer: &mut dyn FnMut(RunEvent<'_>),
) -> Result<RunReport, RunError> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id);
    let _enter = span.enter();

    let mut report = RunReport::new(
        run_id,
        settings.source.clone(),
        settings.repository.clone(),
        settings.chunk_size,
    );
    report.dry_run = options.dry_run;

    let plan = plan_source(&settings.source, settings.chunk_size)?;
    report.files_listed = plan.file_count();
    report.chunks_total = plan.len();
    tracing::info!(files = plan.file_count(), chunks = plan.len(), "planned");
    observer(RunEvent::Planned(&plan));

    if plan.is_empty() {
        tracing::info!("source is empty; nothing to do");
        return Ok(report.finish());
    }
    if options.dry_run {
        report.preview = plan.preview();
        return Ok(report.finish());
    }

    let (mut handle, acquired) = RepositoryHandle::acquire(&settings.repository, &settings.remote)?;
    let branch = handle.current_branch().clone();
    report.record_acquire(&acquired, &branch);
    observer(RunEvent::Acquired(&acquired));

    publish_chunks(
        &mut handle,
        &plan,
        &settings.source_label(),
        branch,
        report,
        observer,
    )
}

/// Run the cycle over every chunk of `plan`, halting at the first failure.
pub fn publish_chunks<B: PublishBackend + ?Sized>(
    backend: &mut B,
    plan: &Plan,
    source_label: &str,
    branch: BranchName,
    mut report: RunReport,
    observer: &mut dyn FnMut(RunEvent<'_>),
) -> Result<RunReport, RunError> {
    let mut progress = Progress::new(branch);

    for chunk in plan.chunks() {
        let mut result = publish::execute(backend, chunk, source_label, &mut progress);
        report.record_chunk(&result, &progress);
        observer(RunEvent::ChunkDone {
            result: &result,
            progress: &progress,
        });

        if let Some(error) = result.error.take() {
            report.halted = Some(HaltInfo {
                chunk: result.chunk,
                total: result.total,
                step: error.step(),
                message: error.to_string(),
                rollback: result.rollback.take(),
            });
            return Err(RunError::Halted {
                report: Box::new(report.finish()),
                error,
            });
        }
    }

    Ok(report.finish())
}
