//! CLI integration tests for the flagctl binary.
//!
//! These tests verify the CLI commands work correctly end-to-end.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const MANIFEST: &str = r#"```json
// Generated by the manifest generator
[
  {"serviceName": "auth-service", "featureFlagName": "auth_enable_registration", "featureFlagState": "enabled"},
  {"serviceName": "auth-service", "featureFlagName": "auth_enable_sso", "featureFlagState": "disabled"},
  {"serviceName": "shopping-cart", "featureFlagName": "cart_enable_checkout", "featureFlagState": "ENABLED"}
]
```
"#;

/// Get the path to the CLI binary.
fn cmd() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("flagctl").expect("Failed to find flagctl binary");
    cmd.env("NO_COLOR", "1");
    cmd
}

fn manifest(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("featureflags.json");
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("flagctl"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn test_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("flagctl"));
}

// ============================================================================
// Check Command Tests
// ============================================================================

#[test]
fn test_check_summary() {
    let dir = TempDir::new().unwrap();
    let path = manifest(&dir, MANIFEST);

    cmd()
        .arg("check")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 3 flags"))
        .stdout(predicate::str::contains("Enabled: 2"))
        .stdout(predicate::str::contains("auth-service: 2"))
        .stdout(predicate::str::contains("shopping-cart: 1"));
}

#[test]
fn test_check_json() {
    let dir = TempDir::new().unwrap();
    let path = manifest(&dir, MANIFEST);

    let output = cmd().arg("check").arg(&path).arg("--json").output().unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["flags"], 3);
    assert_eq!(summary["enabled"], 2);
    assert_eq!(summary["services"]["auth-service"], 2);
}

#[test]
fn test_check_missing_file() {
    let dir = TempDir::new().unwrap();

    cmd()
        .arg("check")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("SourceUnavailable"));
}

#[test]
fn test_check_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = manifest(&dir, r#"{"flags": {}}"#);

    cmd()
        .arg("check")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MalformedSource"));
}

#[test]
fn test_check_unknown_format() {
    let dir = TempDir::new().unwrap();
    let path = manifest(&dir, MANIFEST);

    cmd()
        .args(["check", "--format", "toml"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown source format"));
}

#[test]
fn test_check_yaml_keyed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("flags.yaml");
    fs::write(&path, "billing_enable_tax_report: ENABLED\nbilling_tax_reporting: off\n").unwrap();

    cmd()
        .args(["check", "--format", "yaml", "--keyed"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 2 flags"))
        .stdout(predicate::str::contains("Enabled: 1"));
}

// ============================================================================
// Query and List Command Tests
// ============================================================================

#[test]
fn test_query_flags() {
    let dir = TempDir::new().unwrap();
    let path = manifest(&dir, MANIFEST);

    cmd()
        .arg("query")
        .arg(&path)
        .args(["cart_enable_checkout", "auth_enable_sso", "unknown_flag"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cart_enable_checkout: enabled"))
        .stdout(predicate::str::contains("auth_enable_sso: disabled"))
        .stdout(predicate::str::contains("unknown_flag: disabled (not declared)"));
}

#[test]
fn test_query_requires_names() {
    let dir = TempDir::new().unwrap();
    let path = manifest(&dir, MANIFEST);

    cmd().arg("query").arg(&path).assert().failure();
}

#[test]
fn test_list_by_service() {
    let dir = TempDir::new().unwrap();
    let path = manifest(&dir, MANIFEST);

    cmd()
        .arg("list")
        .arg(&path)
        .args(["--service", "auth-service"])
        .assert()
        .success()
        .stdout(predicate::str::contains("auth_enable_registration enabled"))
        .stdout(predicate::str::contains("auth_enable_sso disabled"))
        .stdout(predicate::str::contains("cart_enable_checkout").not())
        .stdout(predicate::str::contains("2 flag(s)"));
}

#[test]
fn test_list_enabled_only_json() {
    let dir = TempDir::new().unwrap();
    let path = manifest(&dir, MANIFEST);

    let output = cmd()
        .arg("list")
        .arg(&path)
        .args(["--enabled-only", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let flags: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = flags
        .as_array()
        .unwrap()
        .iter()
        .map(|flag| flag["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["auth_enable_registration", "cart_enable_checkout"]);
    assert_eq!(flags[1]["service"], "shopping-cart");
}

// ============================================================================
// Watch Command Tests
// ============================================================================

#[test]
fn test_watch_bounded_iterations() {
    let dir = TempDir::new().unwrap();
    let path = manifest(&dir, MANIFEST);

    cmd()
        .arg("watch")
        .arg(&path)
        .args(["--interval-ms", "10", "--iterations", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Watching"))
        .stdout(predicate::str::contains("generation 1"));
}
