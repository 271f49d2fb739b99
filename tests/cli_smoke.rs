//! CLI surface smoke tests

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("askdoc").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("pdfs"))
        .stdout(predicate::str::contains("login"));
}

#[test]
fn test_version_runs() {
    let mut cmd = Command::cargo_bin("askdoc").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("askdoc"));
}

#[test]
fn test_sessions_requires_subcommand() {
    let mut cmd = Command::cargo_bin("askdoc").unwrap();
    cmd.arg("sessions").assert().failure();
}
