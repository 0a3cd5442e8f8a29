//! Command-line behavior of the `bound-sentinel` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn sources() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test_sources")
}

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("bound-sentinel").unwrap();
    cmd.env("NO_COLOR", "1").env("RUST_LOG", "off");
    cmd
}

fn scan_json(args: &[&str]) -> serde_json::Value {
    let output = bin()
        .arg("scan")
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn list_shows_every_check() {
    bin()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("B001"))
        .stdout(predicate::str::contains("B010"))
        .stdout(predicate::str::contains("10 check(s) available"));
}

#[test]
fn version_prints_package_version() {
    bin()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_path_fails() {
    bin()
        .args(["scan", "does/not/exist.c"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path does not exist"));
}

#[test]
fn json_report_for_single_file() {
    let path = sources().join("overflow.c");
    let report = scan_json(&[path.to_str().unwrap()]);

    let suggestions = report["files"][0]["suggestions"].as_array().unwrap();
    let ids: Vec<&str> = suggestions
        .iter()
        .map(|s| s["check_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["B002", "B002", "B001", "B004"]);
    assert_eq!(suggestions[0]["function_name"], "fill");
    assert!(suggestions[0]["code"].as_str().unwrap().contains("char buf[11];"));
    assert_eq!(report["summary"]["total"], 4);
}

#[test]
fn parse_failure_does_not_stop_the_scan() {
    let report = scan_json(&[sources().to_str().unwrap()]);

    let files = report["files"].as_array().unwrap();
    let paths: Vec<&str> = files
        .iter()
        .map(|f| f["file_path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, ["broken.c", "clean.c", "overflow.c"]);
    assert!(files[0]["error"].as_str().unwrap().contains("syntax error"));
    assert!(files[1]["suggestions"].as_array().unwrap().is_empty());
    assert_eq!(report["metadata"]["files_failed"], 1);
}

#[test]
fn recursive_scan_honors_ignore_globs() {
    let report = scan_json(&[
        sources().to_str().unwrap(),
        "--recursive",
        "--ignore",
        "vendor/**",
    ]);

    let paths: Vec<&str> = report["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["file_path"].as_str().unwrap())
        .collect();
    assert!(paths.iter().any(|p| p.ends_with("copy.c")));
    assert!(!paths.iter().any(|p| p.ends_with("input.c")));
}

#[test]
fn only_filter_keeps_selected_checks() {
    let path = sources().join("overflow.c");
    let report = scan_json(&[path.to_str().unwrap(), "--only", "b001"]);

    let suggestions = report["files"][0]["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["check_id"], "B001");
}

#[test]
fn severity_and_unchecked_flags_filter_results() {
    let path = sources().join("overflow.c");
    let high = scan_json(&[path.to_str().unwrap(), "--severity", "high"]);
    assert_eq!(high["summary"]["total"], 3);

    let quiet = scan_json(&[path.to_str().unwrap(), "--no-unchecked-indices"]);
    assert_eq!(quiet["summary"]["medium"], 0);
}

#[test]
fn markdown_report_written_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report.md");

    bin()
        .args(["scan", sources().join("overflow.c").to_str().unwrap()])
        .args(["--format", "markdown", "--output", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));

    let markdown = std::fs::read_to_string(&out).unwrap();
    assert!(markdown.starts_with("# Bound-Sentinel Report"));
    assert!(markdown.contains("[B001] Constant Index Out of Bounds"));
    assert!(markdown.contains("buf[9] = 'x';"));
}

#[test]
fn terminal_output_shows_corrections() {
    bin()
        .args(["scan", sources().join("overflow.c").to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Example code with correction:"))
        .stdout(predicate::str::contains("Total: 4 issue(s) found"));
}

#[test]
fn threshold_only_severities_are_accepted() {
    let path = sources().join("overflow.c");
    let low = scan_json(&[path.to_str().unwrap(), "--severity", "low"]);
    assert_eq!(low["summary"]["total"], 4);

    let critical = scan_json(&[path.to_str().unwrap(), "--severity", "critical"]);
    assert_eq!(critical["summary"]["total"], 0);
}
