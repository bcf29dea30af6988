//! Integration tests for the bulkpush binary.
//!
//! These tests exercise the full CLI and verify behavior against real Git repos.

use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for running bulkpush with no ambient config.
fn bulkpush(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("bulkpush").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("BULKPUSH_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn init_bare(path: &Path) {
    fs::create_dir_all(path).unwrap();
    let status = StdCommand::new("git")
        .args(["init", "-q", "--bare"])
        .current_dir(path)
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn version_flag_works() {
    let home = TempDir::new().unwrap();
    bulkpush(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bulkpush"));
}

#[test]
fn help_flag_works() {
    let home = TempDir::new().unwrap();
    bulkpush(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("publish"))
        .stdout(predicate::str::contains("plan"));
}

#[test]
fn completion_generates_script() {
    let home = TempDir::new().unwrap();
    bulkpush(home.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bulkpush"));
}

#[test]
fn plan_previews_chunks() {
    let home = TempDir::new().unwrap();
    let source = home.path().join("data");
    fs::create_dir_all(&source).unwrap();
    for i in 0..5 {
        fs::write(source.join(format!("{i}.txt")), "x").unwrap();
    }

    bulkpush(home.path())
        .args(["plan", "--no-interactive", "--chunk-size", "2", "--source"])
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("5 files in 3 chunk(s) of up to 2"))
        .stdout(predicate::str::contains("[3/3] 1 files"));
}

#[test]
fn plan_json_output() {
    let home = TempDir::new().unwrap();
    let source = home.path().join("data");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "x").unwrap();

    let output = bulkpush(home.path())
        .args(["plan", "--json", "--source"])
        .arg(&source)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["files"], 1);
    assert_eq!(json["chunk_size"], 6000);
    assert_eq!(json["chunks"].as_array().unwrap().len(), 1);
}

#[test]
fn invalid_chunk_size_warns_and_uses_default() {
    let home = TempDir::new().unwrap();
    let source = home.path().join("data");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "x").unwrap();

    bulkpush(home.path())
        .args(["plan", "--chunk-size", "-4", "--source"])
        .arg(&source)
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: invalid chunk size"))
        .stdout(predicate::str::contains("of up to 6000"));
}

#[test]
fn missing_source_fails_with_exit_code_one() {
    let home = TempDir::new().unwrap();
    bulkpush(home.path())
        .args(["publish", "--no-interactive", "--repository", "/tmp/x", "--remote", "r"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--source"));
}

#[test]
fn nonexistent_source_fails() {
    let home = TempDir::new().unwrap();
    bulkpush(home.path())
        .args(["publish", "--no-interactive", "--remote", "r", "--source"])
        .arg(home.path().join("absent"))
        .arg("--repository")
        .arg(home.path().join("repo"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn publish_end_to_end_with_config_file() {
    let home = TempDir::new().unwrap();
    let base = home.path().canonicalize().unwrap();
    let repo = base.join("mirror");
    let source = repo.join("assets");
    let remote = base.join("remote.git");
    fs::create_dir_all(&source).unwrap();
    for i in 0..3 {
        fs::write(source.join(format!("{i}.bin")), format!("{i}")).unwrap();
    }
    init_bare(&remote);

    let config = base.join("bulkpush.toml");
    fs::write(
        &config,
        format!(
            "repository = {:?}\nremote = {:?}\nchunk_size = 2\n",
            repo.display().to_string(),
            remote.display().to_string()
        ),
    )
    .unwrap();

    bulkpush(home.path())
        .arg("--config")
        .arg(&config)
        .args(["publish", "--no-interactive", "--source"])
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("[1/2] pushed 2 files"))
        .stdout(predicate::str::contains("Published 2/2 chunks to origin/main"));

    let log = StdCommand::new("git")
        .args(["log", "--format=%s", "main"])
        .current_dir(&remote)
        .output()
        .unwrap();
    let log = String::from_utf8(log.stdout).unwrap();
    assert!(log.contains("Add files from chunk 2/2 (Source: assets)"));
}

#[test]
fn publish_json_reports_halt_and_exits_one() {
    let home = TempDir::new().unwrap();
    let base = home.path().canonicalize().unwrap();
    let repo = base.join("mirror");
    let source = repo.join("assets");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.bin"), "a").unwrap();

    let output = bulkpush(home.path())
        .args(["publish", "--json", "--no-interactive", "--remote"])
        .arg(base.join("no-such-remote"))
        .arg("--source")
        .arg(&source)
        .arg("--repository")
        .arg(&repo)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["halted"]["step"], "push");
    assert_eq!(json["halted"]["chunk"], 1);
    assert!(String::from_utf8_lossy(&output.stderr).contains("push failed"));
}

#[test]
fn empty_source_is_success_without_repository() {
    let home = TempDir::new().unwrap();
    let source = home.path().join("empty");
    let repo = home.path().join("repo");
    fs::create_dir_all(&source).unwrap();

    bulkpush(home.path())
        .args(["publish", "--no-interactive", "--remote", "r", "--source"])
        .arg(&source)
        .arg("--repository")
        .arg(&repo)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do"));

    assert!(!repo.exists());
}
