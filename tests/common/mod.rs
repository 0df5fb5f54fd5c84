//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use casebook::core::team::hash_secret;
use std::fs;
use tempfile::TempDir;

pub const OFFICER_SECRET: &str = "officer-secret";
pub const SUPERVISOR_SECRET: &str = "supervisor-secret";
pub const VIEWER_SECRET: &str = "viewer-secret";

/// Helper to get a casebook command isolated from the caller's environment
pub fn casebook() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("casebook"));
    cmd.env_remove("CASEBOOK_CONFIG")
        .env_remove("CASEBOOK_SECRET")
        .env_remove("CASEBOOK_UNLOCK_SECRET")
        .env_remove("RUST_LOG")
        .write_stdin("");
    cmd
}

/// Config with an officer, a supervisor and a read-only viewer
pub fn test_config_yaml() -> String {
    format!(
        "store:
  backend: csv
  path: cases.csv
retry:
  max_attempts: 3
  base_delay_ms: 0
  max_delay_ms: 0
credentials:
  - name: Officer Mali
    role: officer
    secret_sha256: {}
  - name: Supervisor Reyes
    role: officer
    secret_sha256: {}
    can_unlock: true
  - name: Viewer
    role: readonly
    secret_sha256: {}
",
        hash_secret(OFFICER_SECRET),
        hash_secret(SUPERVISOR_SECRET),
        hash_secret(VIEWER_SECRET)
    )
}

/// Helper to create a test project in a temp directory
pub fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("casebook.yaml"), test_config_yaml()).unwrap();
    tmp
}

/// Helper to submit a report and return its case id
pub fn submit_case(tmp: &TempDir, incident_type: &str, location: &str, details: &str) -> String {
    let output = casebook()
        .current_dir(tmp.path())
        .args([
            "-q",
            "submit",
            "--type",
            incident_type,
            "--location",
            location,
            "--details",
            details,
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "submit failed: {:?}", output);

    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Helper to run an officer update
pub fn update_case(tmp: &TempDir, id: &str, extra: &[&str]) -> assert_cmd::assert::Assert {
    casebook()
        .current_dir(tmp.path())
        .env("CASEBOOK_SECRET", OFFICER_SECRET)
        .arg("update")
        .arg(id)
        .args(extra)
        .assert()
}
