//! End-to-end publish runs against real repositories.
//!
//! Every test builds a source tree inside a fresh working tree and pushes to
//! a local bare repository standing in for the remote.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use uuid::Uuid;

use bulkpush::core::config::PublishSettings;
use bulkpush::core::types::{ChunkSize, Oid};
use bulkpush::engine::{
    self, plan_source, publish_chunks, ChunkState, PublishBackend, RepoOrigin, RepositoryError,
    RepositoryHandle, RunError, RunEvent, RunOptions, RunReport, Step,
};
use bulkpush::git::GitError;

/// A working tree with a `source/` folder and a bare remote next to it.
struct Fixture {
    _dir: TempDir,
    repo: PathBuf,
    source: PathBuf,
    remote: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let base = dir.path().canonicalize().unwrap();
        let repo = base.join("mirror");
        let source = repo.join("tiles");
        let remote = base.join("remote.git");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&remote).unwrap();
        run_git(&remote, &["init", "-q", "--bare"]);
        Self {
            _dir: dir,
            repo,
            source,
            remote,
        }
    }

    /// Write `count` small files under the source folder.
    fn populate(&self, count: usize) {
        for i in 0..count {
            let path = self.source.join(format!("{:02}/{i:05}.dat", i % 7));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, format!("file {i}")).unwrap();
        }
    }

    fn settings(&self, chunk_size: usize) -> PublishSettings {
        PublishSettings {
            source: self.source.clone(),
            repository: self.repo.clone(),
            remote: self.remote.display().to_string(),
            chunk_size: ChunkSize::new(chunk_size).unwrap(),
        }
    }

    fn run(&self, chunk_size: usize) -> Result<RunReport, RunError> {
        engine::run(&self.settings(chunk_size), RunOptions::default(), &mut |_| {})
    }

    fn local_messages(&self) -> Vec<String> {
        git_lines(&self.repo, &["log", "--format=%s"])
    }

    fn remote_messages(&self) -> Vec<String> {
        git_lines(&self.remote, &["log", "--format=%s", "main"])
    }

    fn tracked_files(&self) -> Vec<String> {
        git_lines(&self.repo, &["ls-files"])
    }

    /// Paths whose index entry differs from HEAD.
    fn staged_files(&self) -> Vec<String> {
        git_lines(&self.repo, &["diff", "--cached", "--name-only"])
    }

    /// Paths changed by a single commit.
    fn commit_files(&self, oid: &Oid) -> Vec<String> {
        git_lines(
            &self.repo,
            &["diff-tree", "--no-commit-id", "--name-only", "-r", oid.as_str()],
        )
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn git_lines(dir: &Path, args: &[&str]) -> Vec<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Wraps a real handle and fails one step of one chunk.
struct Faulty<'a> {
    inner: &'a mut RepositoryHandle,
    fail_step: Step,
    fail_chunk: usize,
    chunk: usize,
}

impl Faulty<'_> {
    fn injected(&self, step: Step) -> bool {
        self.fail_step == step && self.chunk == self.fail_chunk
    }
}

impl PublishBackend for Faulty<'_> {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    fn stage(&mut self, paths: &[PathBuf]) -> Result<(), GitError> {
        self.chunk += 1;
        let result = self.inner.stage(paths);
        if self.injected(Step::Stage) {
            return Err(GitError::Internal {
                message: "injected stage failure".into(),
            });
        }
        result
    }

    fn has_staged_changes(&self, paths: &[PathBuf]) -> Result<bool, GitError> {
        self.inner.has_staged_changes(paths)
    }

    fn commit(&mut self, paths: &[PathBuf], message: &str) -> Result<Oid, GitError> {
        if self.injected(Step::Commit) {
            return Err(GitError::Internal {
                message: "injected commit failure".into(),
            });
        }
        self.inner.commit(paths, message)
    }

    fn push(&mut self) -> Result<(), GitError> {
        if self.injected(Step::Push) {
            return Err(GitError::PushRejected {
                remote: "origin".into(),
                refspec: "main:main".into(),
                stderr: "injected push failure".into(),
            });
        }
        self.inner.push()
    }

    fn reset_index(&mut self, paths: &[PathBuf]) -> Result<(), GitError> {
        self.inner.reset_index(paths)
    }
}

fn run_faulty(fx: &Fixture, chunk_size: usize, fail_step: Step, fail_chunk: usize) -> RunError {
    let settings = fx.settings(chunk_size);
    let plan = plan_source(&settings.source, settings.chunk_size).unwrap();
    let (mut handle, _) = RepositoryHandle::acquire(&settings.repository, &settings.remote).unwrap();
    let branch = handle.current_branch().clone();
    let report = RunReport::new(
        Uuid::new_v4(),
        settings.source.clone(),
        settings.repository.clone(),
        settings.chunk_size,
    );
    let mut faulty = Faulty {
        inner: &mut handle,
        fail_step,
        fail_chunk,
        chunk: 0,
    };
    publish_chunks(
        &mut faulty,
        &plan,
        &settings.source_label(),
        branch,
        report,
        &mut |_| {},
    )
    .unwrap_err()
}

// =============================================================================
// Happy Path
// =============================================================================

#[test]
fn publishes_every_chunk_in_order() {
    let fx = Fixture::new();
    fx.populate(25);

    let mut done = Vec::new();
    let report = engine::run(&fx.settings(10), RunOptions::default(), &mut |event| {
        if let RunEvent::ChunkDone { result, progress } = event {
            done.push((result.chunk, result.state, progress.files_committed));
        }
    })
    .unwrap();

    assert!(report.succeeded());
    assert_eq!(report.repository_origin, Some(RepoOrigin::Created));
    assert_eq!(report.chunks_total, 3);
    assert_eq!(report.chunks_pushed, 3);
    assert_eq!(report.files_committed, 25);
    assert_eq!(
        done,
        vec![
            (1, ChunkState::Pushed, 10),
            (2, ChunkState::Pushed, 20),
            (3, ChunkState::Pushed, 25),
        ]
    );

    let expected = vec![
        "Add files from chunk 3/3 (Source: tiles)".to_string(),
        "Add files from chunk 2/3 (Source: tiles)".to_string(),
        "Add files from chunk 1/3 (Source: tiles)".to_string(),
        "Initial repository setup".to_string(),
    ];
    assert_eq!(fx.local_messages(), expected);
    assert_eq!(fx.remote_messages(), expected);
    assert_eq!(fx.tracked_files().len(), 25);
    assert!(fx.tracked_files().iter().all(|f| f.starts_with("tiles/")));
}

#[test]
fn default_chunk_size_splits_twelve_thousand_five_hundred_files() {
    let fx = Fixture::new();
    fx.populate(12_500);

    let report = fx.run(ChunkSize::DEFAULT.get()).unwrap();

    assert_eq!(report.chunks_total, 3);
    assert_eq!(report.commits.len(), 3);
    let sizes: Vec<usize> = report
        .commits
        .iter()
        .map(|oid| fx.commit_files(oid).len())
        .collect();
    assert_eq!(sizes, vec![6000, 6000, 500]);
}

#[test]
fn empty_source_creates_nothing() {
    let fx = Fixture::new();

    let report = fx.run(10).unwrap();

    assert!(report.succeeded());
    assert!(report.nothing_to_do());
    assert!(report.repository_origin.is_none());
    assert!(!fx.repo.join(".git").exists());
}

#[test]
fn dry_run_leaves_repository_alone() {
    let fx = Fixture::new();
    fx.populate(5);

    let report = engine::run(&fx.settings(2), RunOptions { dry_run: true }, &mut |_| {}).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.preview.len(), 3);
    assert!(!fx.repo.join(".git").exists());
}

#[test]
fn missing_source_is_a_list_error() {
    let fx = Fixture::new();
    let mut settings = fx.settings(10);
    settings.source = fx.repo.join("absent");

    let err = engine::run(&settings, RunOptions::default(), &mut |_| {}).unwrap_err();
    assert!(matches!(err, RunError::List(_)));
}

// =============================================================================
// Resumability
// =============================================================================

#[test]
fn second_run_creates_no_commits() {
    let fx = Fixture::new();
    fx.populate(12);
    fx.run(5).unwrap();
    let before = fx.local_messages();

    let report = fx.run(5).unwrap();

    assert!(report.succeeded());
    assert!(report.commits.is_empty());
    assert_eq!(report.chunks_pushed, 3);
    assert_eq!(report.repository_origin, Some(RepoOrigin::Loaded));
    assert_eq!(fx.local_messages(), before);
}

#[test]
fn new_files_are_picked_up_on_rerun() {
    let fx = Fixture::new();
    fx.populate(4);
    fx.run(10).unwrap();

    fs::write(fx.source.join("late.dat"), "late").unwrap();
    let report = fx.run(10).unwrap();

    assert_eq!(report.commits.len(), 1);
    assert!(fx.tracked_files().contains(&"tiles/late.dat".to_string()));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn push_failure_on_second_of_three_chunks_halts() {
    let fx = Fixture::new();
    fx.populate(9);

    let err = run_faulty(&fx, 3, Step::Push, 2);

    let RunError::Halted { report, error } = err else {
        panic!("expected halt, got {err:?}");
    };
    assert_eq!(error.step(), Step::Push);
    assert_eq!(error.chunk(), 2);
    let halted = report.halted.as_ref().unwrap();
    assert_eq!((halted.chunk, halted.total), (2, 3));

    // Chunk 2 is committed locally but never reached the remote; chunk 3
    // was never attempted.
    let local = fx.local_messages();
    assert_eq!(local.len(), 3);
    assert_eq!(local[0], "Add files from chunk 2/3 (Source: tiles)");
    assert_eq!(fx.remote_messages().len(), 2);
    assert_eq!(fx.tracked_files().len(), 6);
}

#[test]
fn rerun_after_push_failure_pushes_pending_commit() {
    let fx = Fixture::new();
    fx.populate(9);
    run_faulty(&fx, 3, Step::Push, 2);

    let report = fx.run(3).unwrap();

    assert_eq!(report.commits.len(), 1);
    assert_eq!(fx.local_messages(), fx.remote_messages());
    assert_eq!(fx.remote_messages().len(), 4);
}

#[test]
fn commit_failure_rolls_back_index() {
    let fx = Fixture::new();
    fx.populate(6);

    let err = run_faulty(&fx, 3, Step::Commit, 2);

    let RunError::Halted { report, error } = err else {
        panic!("expected halt, got {err:?}");
    };
    assert_eq!(error.step(), Step::Commit);
    assert!(report.halted.as_ref().unwrap().rollback.as_ref().unwrap().complete);

    assert!(fx.staged_files().is_empty());
    assert_eq!(fx.tracked_files().len(), 3);
    assert_eq!(fx.local_messages().len(), 2);
    // Files stay on disk for the next run.
    assert_eq!(fs::read_dir(fx.source.join("00")).unwrap().count(), 1);
}

#[test]
fn stage_failure_rolls_back_index() {
    let fx = Fixture::new();
    fx.populate(4);

    let err = run_faulty(&fx, 4, Step::Stage, 1);

    let RunError::Halted { report, .. } = err else {
        panic!("expected halt");
    };
    assert_eq!(report.halted.as_ref().unwrap().step, Step::Stage);
    assert!(fx.staged_files().is_empty());
    assert!(fx.tracked_files().is_empty());
}

#[test]
fn unreachable_remote_halts_with_push_error() {
    let fx = Fixture::new();
    fx.populate(3);
    let mut settings = fx.settings(2);
    settings.remote = fx.remote.join("missing").display().to_string();

    let err = engine::run(&settings, RunOptions::default(), &mut |_| {}).unwrap_err();

    match err {
        RunError::Halted { error, report } => {
            assert_eq!(error.step(), Step::Push);
            assert_eq!(error.chunk(), 1);
            assert_eq!(report.commits.len(), 1);
        }
        other => panic!("expected halt, got {other:?}"),
    }
}

#[test]
fn concurrent_run_is_rejected() {
    let fx = Fixture::new();
    fx.populate(2);
    let (_held, _) = RepositoryHandle::acquire(&fx.repo, &fx.remote.display().to_string()).unwrap();

    let err = fx.run(10).unwrap_err();
    assert!(matches!(
        err,
        RunError::Repository(RepositoryError::Locked(_))
    ));
}

// =============================================================================
// Path Safety
// =============================================================================

#[test]
fn source_outside_repository_is_never_committed() {
    let fx = Fixture::new();
    let outside = fx.repo.parent().unwrap().join("outside");
    fs::create_dir_all(&outside).unwrap();
    fs::write(outside.join("secret.txt"), "s").unwrap();
    let mut settings = fx.settings(10);
    settings.source = outside;

    let report = engine::run(&settings, RunOptions::default(), &mut |_| {}).unwrap();

    assert!(report.succeeded());
    assert_eq!(report.chunks_skipped, 1);
    assert_eq!(report.files_excluded, 1);
    assert!(report.commits.is_empty());
    assert!(fx.tracked_files().is_empty());
    assert_eq!(fx.local_messages(), vec!["Initial repository setup".to_string()]);
}

#[test]
fn dirty_tree_warns_and_continues() {
    let fx = Fixture::new();
    fx.populate(2);
    fx.run(10).unwrap();
    fs::write(fx.repo.join("notes.txt"), "scratch").unwrap();

    let report = fx.run(10).unwrap();

    assert!(report.succeeded());
    assert!(report.warnings.iter().any(|w| w.contains("untracked")));
    assert!(!fx.tracked_files().contains(&"notes.txt".to_string()));
}

#[test]
fn nested_gitfile_is_excluded_not_fatal() {
    let fx = Fixture::new();
    fx.populate(2);
    let vendored = fx.source.join("vendor/sub");
    fs::create_dir_all(&vendored).unwrap();
    fs::write(vendored.join(".git"), "gitdir: ../../.git/modules/sub\n").unwrap();

    let report = fx.run(10).unwrap();

    assert!(report.succeeded());
    assert_eq!(report.chunks_pushed, 1);
    assert_eq!(report.files_excluded, 1);
    assert_eq!(report.files_committed, 2);
    assert!(report.warnings.iter().any(|w| w.contains("vendor/sub/.git")));
    assert!(!fx.tracked_files().iter().any(|f| f.ends_with("/.git")));
}

// =============================================================================
// Operator Changes In The Index
// =============================================================================

#[test]
fn prestaged_file_stays_out_of_chunk_commit() {
    let fx = Fixture::new();
    fx.populate(2);
    fx.run(10).unwrap();

    fs::write(fx.repo.join("notes.txt"), "scratch").unwrap();
    run_git(&fx.repo, &["add", "notes.txt"]);
    fs::write(fx.source.join("new.dat"), "new").unwrap();

    let report = fx.run(10).unwrap();

    assert_eq!(report.commits.len(), 1);
    assert_eq!(fx.commit_files(&report.commits[0]), vec!["tiles/new.dat".to_string()]);
    assert_eq!(fx.staged_files(), vec!["notes.txt".to_string()]);
    assert_eq!(fx.local_messages(), fx.remote_messages());
}

#[test]
fn prestaged_file_does_not_cause_rerun_commit() {
    let fx = Fixture::new();
    fx.populate(3);
    fx.run(10).unwrap();
    let before = fx.local_messages();

    fs::write(fx.repo.join("notes.txt"), "scratch").unwrap();
    run_git(&fx.repo, &["add", "notes.txt"]);

    let report = fx.run(10).unwrap();

    assert!(report.succeeded());
    assert!(report.commits.is_empty());
    assert_eq!(fx.local_messages(), before);
    assert_eq!(fx.staged_files(), vec!["notes.txt".to_string()]);
}

#[test]
fn rollback_keeps_prestaged_file() {
    let fx = Fixture::new();
    fx.populate(2);
    fx.run(10).unwrap();
    fs::write(fx.repo.join("notes.txt"), "scratch").unwrap();
    run_git(&fx.repo, &["add", "notes.txt"]);
    fs::write(fx.source.join("new.dat"), "new").unwrap();

    let err = run_faulty(&fx, 10, Step::Commit, 1);

    assert!(matches!(err, RunError::Halted { .. }));
    assert_eq!(fx.staged_files(), vec!["notes.txt".to_string()]);
    assert!(!fx.tracked_files().contains(&"tiles/new.dat".to_string()));
}
