#![cfg(target_os = "linux")]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;

fn inspect_json(pid: u32) -> Value {
    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.arg("--log-level")
        .arg("error")
        .arg("inspect")
        .arg("--json")
        .arg("--pid")
        .arg(pid.to_string());

    let output = cmd.output().expect("inspect should run");
    assert!(
        output.status.success(),
        "expected success, stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    serde_json::from_str(&stdout).expect("stdout should be valid json")
}

/// A proc tree with a boot time and one sleeping process.
fn fake_proc_root(root: &Path) {
    fs::write(root.join("stat"), "btime 1600000000\n").unwrap();
    fs::create_dir(root.join("300")).unwrap();
    fs::write(
        root.join("300/stat"),
        "300 (worker) S 0 300 300 0 -1 0 0 0 0 0 12 8 0 0 20 0 1 0 500 1000 50\n",
    )
    .unwrap();
    fs::write(root.join("300/cmdline"), b"worker\0--once\0").unwrap();
    fs::write(root.join("300/statm"), "100 20 5 1 0 30 0\n").unwrap();
}

#[test]
fn inspect_self_json_uses_report_envelope() {
    let pid = std::process::id();
    let report = inspect_json(pid);

    let schema_id = report
        .get("schema_id")
        .and_then(Value::as_str)
        .expect("schema_id should be present");
    assert!(
        schema_id.contains("process-report.schema.json"),
        "unexpected schema_id: {schema_id}"
    );
    assert_eq!(report["pid"].as_u64(), Some(pid as u64));
    assert_eq!(
        report["ppid"].as_u64(),
        Some(std::os::unix::process::parent_id() as u64)
    );
    assert!(report["create_time"].as_f64().is_some());
    assert!(report["cmdline"].as_array().is_some());
    assert!(report.get("environ").is_none());
    assert!(report["warnings"].as_array().is_some());
}

#[test]
fn inspect_table_output() {
    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.arg("inspect")
        .arg("--table")
        .arg("--pid")
        .arg(std::process::id().to_string());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("FIELD"))
        .stdout(predicate::str::contains(format!("{:<10} {}", "PID", std::process::id())));
}

#[test]
fn inspect_missing_pid_fails() {
    let root = tempfile::tempdir().unwrap();
    fake_proc_root(root.path());

    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.arg("--proc-root")
        .arg(root.path())
        .arg("inspect")
        .arg("--pid")
        .arg("301");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("No such process: PID 301"));
}

#[test]
fn inspect_pid_zero_is_invalid() {
    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.arg("inspect").arg("--pid").arg("0");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("PID 0 is not valid"));
}

#[test]
fn inspect_fake_tree_reports_partial_data() {
    let root = tempfile::tempdir().unwrap();
    fake_proc_root(root.path());

    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.env("PSHANDLE_PROC_ROOT", root.path())
        .arg("--log-level")
        .arg("error")
        .arg("inspect")
        .arg("--pid")
        .arg("300");

    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(report["name"], "worker");
    assert_eq!(report["status"], "sleeping");
    assert_eq!(report["ppid"], 0);
    assert_eq!(report["cmdline"], serde_json::json!(["worker", "--once"]));
    assert_eq!(report["num_threads"], 1);
    assert!(report.get("terminal").is_none());

    // No status file, no links: those accessors warn instead of failing.
    let warnings: Vec<&str> = report["warnings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(warnings.iter().any(|w| w.starts_with("uids:")), "{warnings:?}");
    assert!(warnings.iter().any(|w| w.starts_with("cwd:")), "{warnings:?}");
    assert!(report.get("uids").is_none());
}

#[test]
fn running_round_trip_with_inspected_create_time() {
    let pid = std::process::id();
    let report = inspect_json(pid);
    let create_time = report["create_time"].to_string();

    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.arg("--log-level")
        .arg("error")
        .arg("running")
        .arg("--json")
        .arg("--pid")
        .arg(pid.to_string())
        .arg("--create-time")
        .arg(&create_time);

    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["running"], true);
    assert!(result["schema_id"]
        .as_str()
        .unwrap()
        .contains("running-result.schema.json"));
}

#[test]
fn running_with_stale_create_time_exits_one() {
    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.arg("running")
        .arg("--pid")
        .arg(std::process::id().to_string())
        .arg("--create-time")
        .arg("12.5");

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("is not running"));
}

#[test]
fn ancestors_json_starts_with_parent() {
    let pid = std::process::id();

    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.arg("--log-level")
        .arg("error")
        .arg("ancestors")
        .arg("--json")
        .arg("--pid")
        .arg(pid.to_string());

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(result["process"]["pid"].as_u64(), Some(pid as u64));
    let ancestors = result["ancestors"].as_array().unwrap();
    assert_eq!(
        ancestors[0]["pid"].as_u64(),
        Some(std::os::unix::process::parent_id() as u64)
    );
}

#[test]
fn ancestors_text_of_root_process() {
    let root = tempfile::tempdir().unwrap();
    fake_proc_root(root.path());

    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.arg("--proc-root")
        .arg(root.path())
        .arg("ancestors")
        .arg("--pid")
        .arg("300");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("PID=300, NAME=worker, AT=2020-09-13T"))
        .stdout(predicate::str::contains("└─").not());
}

#[test]
fn unreadable_config_fails() {
    let mut cmd = cargo_bin_cmd!("pshandle");
    cmd.arg("--config")
        .arg("/nonexistent/pshandle.json")
        .arg("inspect")
        .arg("--pid")
        .arg("1");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("read config"));
}
