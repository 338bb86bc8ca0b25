#![cfg(unix)]

use assert_cmd::Command;
use lockyard::locking::{FlockLock, LockWait, MutexLock};
use predicates::prelude::*;
use tempfile::TempDir;

fn lockyard(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lockyard").unwrap();
    cmd.env_remove("LOCKYARD_WAIT")
        .env_remove("LOCKYARD_LOCK_DIR")
        .arg("--config")
        .arg(temp.path().join("lockyard.toml"));
    std::fs::write(temp.path().join("lockyard.toml"), "").unwrap();
    cmd
}

#[test]
fn status_reports_unlocked() {
    let temp = TempDir::new().unwrap();
    lockyard(&temp)
        .args(["status", "job", "--dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("unlocked\n"));
}

#[test]
fn exec_runs_command_and_propagates_exit_code() {
    let temp = TempDir::new().unwrap();
    lockyard(&temp)
        .args(["exec", "job", "--dir"])
        .arg(temp.path())
        .args(["--", "sh", "-c", "echo inside; exit 4"])
        .assert()
        .code(4)
        .stdout(predicate::str::contains("inside"));

    assert!(!FlockLock::new(temp.path()).is_locked("job").unwrap());
}

#[test]
fn exec_gives_up_on_contended_lock() {
    let temp = TempDir::new().unwrap();
    let holder = FlockLock::new(temp.path());
    assert!(holder.acquire_lock("job", LockWait::NONE));

    lockyard(&temp)
        .args(["exec", "job", "--wait", "0", "--dir"])
        .arg(temp.path())
        .args(["--", "true"])
        .assert()
        .code(75)
        .stderr(predicate::str::contains("held elsewhere"));

    lockyard(&temp)
        .args(["status", "job", "--json", "--dir"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"locked\": true"));

    assert!(holder.release_lock("job"));
}

#[test]
fn invalid_wait_is_rejected() {
    let temp = TempDir::new().unwrap();
    lockyard(&temp)
        .args(["exec", "job", "--wait", "soon", "--dir"])
        .arg(temp.path())
        .args(["--", "true"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("infinite"));
}

#[test]
fn missing_config_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    Command::cargo_bin("lockyard")
        .unwrap()
        .arg("--config")
        .arg(temp.path().join("absent.toml"))
        .args(["status", "job"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}
