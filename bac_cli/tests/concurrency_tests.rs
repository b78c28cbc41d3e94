//! Concurrency tests for bactrack.
//!
//! These tests verify that multiple processes can safely append to the
//! drink log and read it back at the same time.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bactrack"));
    cmd.env("XDG_CONFIG_HOME", data_dir.join("config"))
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn spawn_log(data_dir: PathBuf, minute: u32) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let at = format!("2024-06-01T20:{:02}:00Z", minute);
        cli(&data_dir)
            .args(["log", "--volume-ml", "330", "--abv", "5", "--at", &at])
            .assert()
            .success();
    })
}

#[test]
fn test_concurrent_drink_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let handles: Vec<_> = (0..8).map(|i| spawn_log(data_dir.clone(), i)).collect();
    for handle in handles {
        handle.join().expect("logging thread panicked");
    }

    let content = std::fs::read_to_string(data_dir.join("drinks.jsonl"))
        .expect("Failed to read drink log");
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 8, "Expected 8 drinks, got {}", lines.len());

    // Every line is intact JSON
    for line in lines {
        serde_json::from_str::<serde_json::Value>(line).expect("torn log line");
    }
}

#[test]
fn test_concurrent_reads_and_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let writers: Vec<_> = (0..4).map(|i| spawn_log(data_dir.clone(), i)).collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                cli(&data_dir)
                    .args(["status", "--json", "--at", "2024-06-01T21:30:00Z"])
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().expect("thread panicked");
    }

    cli(&data_dir)
        .args(["stats", "--today", "2024-06-01"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Drinks logged:        4"));
}

#[test]
fn test_delete_while_logging() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    let output = cli(&data_dir)
        .args(["log", "--volume-ml", "40", "--abv", "40", "--at", "2024-06-01T19:00:00Z"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let start = stdout.find('(').unwrap() + 1;
    let end = stdout.find(')').unwrap();
    let doomed = stdout[start..end].to_string();

    let mut handles: Vec<_> = (0..6).map(|i| spawn_log(data_dir.clone(), i)).collect();
    {
        let data_dir = data_dir.clone();
        let doomed = doomed.clone();
        handles.push(thread::spawn(move || {
            cli(&data_dir)
                .args(["delete", &doomed])
                .assert()
                .success()
                .stdout(predicates::str::contains("deleted"));
        }));
    }
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let content = std::fs::read_to_string(data_dir.join("drinks.jsonl"))
        .expect("Failed to read drink log");
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 6, "Expected 6 drinks, got {}", lines.len());
    assert!(!content.contains(&doomed));
}
