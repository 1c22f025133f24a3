#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

const CREDENTIALS: [&str; 3] = [
    "APP_STORE_CONNECT_API_KEY_ID",
    "APP_STORE_CONNECT_ISSUER_ID",
    "APPLE_TEAM_ID",
];

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Binary with a clean credential environment.
fn storegate_cmd() -> Command {
    let mut cmd = Command::cargo_bin("storegate").expect("binary should be built");
    for name in CREDENTIALS {
        cmd.env_remove(name);
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

fn json_report(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--format").arg("json").output().expect("command should run");
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

#[test]
fn approved_project_exits_0() {
    storegate_cmd()
        .arg(fixtures_dir().join("approved"))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Verdict: APPROVED"));
}

#[test]
fn health_entitlement_without_usage_exits_1() {
    storegate_cmd()
        .arg(fixtures_dir().join("health_without_usage"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("‼ HealthKit: missing"))
        .stdout(predicate::str::contains("Verdict: CRITICAL"));
}

#[test]
fn empty_directory_exits_1() {
    let dir = TempDir::new().unwrap();

    storegate_cmd()
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("✗ manifest not found"))
        .stdout(predicate::str::contains("Verdict: FAILED"));
}

#[test]
fn root_defaults_to_current_directory() {
    storegate_cmd()
        .current_dir(fixtures_dir().join("approved"))
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Target: ."));
}

#[test]
fn nonexistent_root_is_critical() {
    storegate_cmd()
        .arg("/tmp/does_not_exist_storegate_test")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("does not exist or is not a directory"))
        .stdout(predicate::str::contains("Verdict: CRITICAL"));
}

#[test]
fn json_output_is_valid() {
    let parsed = json_report(storegate_cmd().arg(fixtures_dir().join("approved")));

    for key in ["schema_version", "tool", "target", "profile", "findings", "summary", "verdict"] {
        assert!(parsed.get(key).is_some(), "missing {key}");
    }
    assert_eq!(parsed["schema_version"], "0.1.0");
    assert_eq!(parsed["tool"]["name"], "storegate-cli");
    assert_eq!(parsed["verdict"]["verdict"], "APPROVED");
    assert_eq!(parsed["verdict"]["exit_code"], 0);
    assert_eq!(parsed["summary"]["warning_count"], 1);
}

#[test]
fn credentials_are_reported_by_name_only() {
    let parsed = json_report(
        storegate_cmd()
            .arg(fixtures_dir().join("approved"))
            .env("APP_STORE_CONNECT_API_KEY_ID", "KEY-VALUE-XYZ")
            .env("APP_STORE_CONNECT_ISSUER_ID", "ISSUER-VALUE-XYZ")
            .env("APPLE_TEAM_ID", "TEAM-VALUE-XYZ"),
    );

    assert_eq!(parsed["summary"]["warning_count"], 0);
    let text = parsed.to_string();
    assert!(text.contains("APPLE_TEAM_ID"));
    assert!(!text.contains("VALUE-XYZ"));
}

#[test]
fn json_findings_follow_declaration_order() {
    let parsed = json_report(storegate_cmd().arg(fixtures_dir().join("approved")));

    let first = &parsed["findings"][0];
    assert_eq!(first["category"], "Project Metadata");
    assert_eq!(first["rule"], "manifest-present");
    assert_eq!(first["severity"], "success");

    let categories: Vec<&str> = parsed["summary"]["findings_by_category"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["category"].as_str().unwrap())
        .collect();
    assert_eq!(
        categories,
        vec![
            "Project Metadata",
            "App Identity",
            "Privacy Compliance",
            "Code Signing",
            "CI/CD",
            "Store Metadata",
            "Secrets",
            "Credentials",
        ]
    );
}

#[test]
fn json_artifacts_have_hashes() {
    let parsed = json_report(storegate_cmd().arg(fixtures_dir().join("approved")));

    let artifacts = parsed["target"]["artifacts"].as_array().unwrap();
    assert!(!artifacts.is_empty());
    for artifact in artifacts {
        assert_eq!(artifact["present"], true);
        assert_eq!(artifact["hash"]["algorithm"], "sha256");
        assert_eq!(artifact["hash"]["value"].as_str().unwrap().len(), 64);
    }
}

#[test]
fn strict_profile_blocks_on_any_warning() {
    storegate_cmd()
        .arg(fixtures_dir().join("approved"))
        .arg("--profile")
        .arg("strict")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Verdict: ATTENTION"));
}

#[test]
fn lenient_profile_tolerates_errors() {
    let dir = TempDir::new().unwrap();

    storegate_cmd()
        .arg(dir.path())
        .arg("--profile")
        .arg("lenient")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Verdict: FAILED"));
}

#[test]
fn config_file_sets_thresholds_and_exit_codes() {
    storegate_cmd()
        .arg(fixtures_dir().join("approved"))
        .arg("--config")
        .arg(fixtures_dir().join("strict.toml"))
        .assert()
        .code(3)
        .stdout(predicate::str::contains("Profile: release-train"));
}

#[test]
fn unreadable_config_fails() {
    storegate_cmd()
        .arg(fixtures_dir().join("approved"))
        .arg("--config")
        .arg("/tmp/does_not_exist_storegate.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("read profile"));
}

#[test]
fn out_flag_writes_to_file() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let out_path = tmp.path().to_path_buf();

    storegate_cmd()
        .arg(fixtures_dir().join("health_without_usage"))
        .arg("--format")
        .arg("json")
        .arg("--out")
        .arg(&out_path)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty());

    let contents = std::fs::read_to_string(&out_path).expect("read output file");
    let parsed: serde_json::Value = serde_json::from_str(&contents).expect("file should be JSON");
    assert_eq!(parsed["verdict"]["verdict"], "CRITICAL");
}

#[test]
fn deterministic_output_across_runs() {
    let fixture = fixtures_dir().join("health_without_usage");

    let a = storegate_cmd().arg(&fixture).output().expect("first run");
    let b = storegate_cmd().arg(&fixture).output().expect("second run");

    assert_eq!(a.stdout, b.stdout);
}

#[test]
fn debug_flag_logs_rule_evaluations() {
    storegate_cmd()
        .arg(fixtures_dir().join("approved"))
        .arg("--debug")
        .assert()
        .code(0)
        .stderr(predicate::str::contains("rule evaluated"));
}

#[test]
fn invalid_format_flag_fails() {
    storegate_cmd()
        .arg(fixtures_dir().join("approved"))
        .arg("--format")
        .arg("xml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn help_flag_prints_usage() {
    storegate_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("App Store submission readiness"));
}

#[test]
fn version_flag_prints_version() {
    storegate_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("storegate"));
}
