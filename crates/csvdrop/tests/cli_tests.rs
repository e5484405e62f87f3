//! CLI behaviour that does not need a database
//!
//! The database is only contacted once eligible files exist, so startup
//! validation and the empty-folder path can run anywhere.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command with logging forced to plain console output and no stray DB settings
fn csvdrop() -> Command {
    let mut cmd = Command::cargo_bin("csvdrop").unwrap();
    cmd.env("LOG_LEVEL", "info")
        .env("LOG_OUTPUT", "console")
        .env("LOG_FORMAT", "text")
        .env("NO_COLOR", "1")
        .env_remove("DATABASE_URL")
        .env_remove("CSVDROP_TABLE")
        .env_remove("CSVDROP_MAX_IN_FLIGHT");
    cmd
}

#[test]
fn test_missing_folder_argument_fails() {
    let dir = TempDir::new().unwrap();

    csvdrop()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("<FOLDER>"));
}

#[test]
fn test_nonexistent_folder_fails_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("inbox");

    csvdrop()
        .current_dir(dir.path())
        .arg(&missing)
        .assert()
        .code(255)
        .stderr(predicate::str::contains("does not exist"))
        .stderr(predicate::str::contains(missing.to_string_lossy().into_owned()));

    assert!(!missing.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_folder_reported_before_bad_config() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("inbox");

    csvdrop()
        .env("CSVDROP_DB_PORT", "abc")
        .arg(&missing)
        .assert()
        .code(255)
        .stderr(predicate::str::contains("does not exist"))
        .stderr(predicate::str::contains(missing.to_string_lossy().into_owned()));
}

#[test]
fn test_bad_config_is_a_precondition_error() {
    let dir = TempDir::new().unwrap();

    csvdrop()
        .env("CSVDROP_DB_PORT", "abc")
        .arg(dir.path())
        .assert()
        .code(255)
        .stderr(predicate::str::contains("CSVDROP_DB_PORT"));
}

#[test]
fn test_empty_folder_exits_cleanly() {
    let dir = TempDir::new().unwrap();

    csvdrop()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No files to consume"));

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_only_non_matching_files_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "not data").unwrap();
    fs::create_dir(dir.path().join("archive.csv")).unwrap();

    csvdrop()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No files to consume"));

    assert!(dir.path().join("notes.txt").is_file());
    assert!(dir.path().join("archive.csv").is_dir());
    assert!(!dir.path().join("done").exists());
    assert!(!dir.path().join("error").exists());
}

#[test]
fn test_invalid_table_is_a_usage_error() {
    let dir = TempDir::new().unwrap();

    csvdrop()
        .arg(dir.path())
        .arg("--table")
        .arg("csvdata; drop table users")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid table name"));
}
