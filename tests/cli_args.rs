//! Integration tests for the vehcache binary
//!
//! Runs the binary with short intervals and checks what it prints.

use std::process::Command;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_vehcache"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute vehcache")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("vehcache"), "Help should mention vehcache");
    assert!(stdout.contains("--reset-every"), "Help should mention --reset-every");
    assert!(stdout.contains("--cache"), "Help should mention --cache");
}

#[test]
fn test_invalid_polls_prints_error_and_exits() {
    let output = run_cli(&["--polls", "0"]);
    assert!(!output.status.success(), "Expected zero polls to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("polls"),
        "Should print error message about polls: {}",
        stderr
    );
}

#[test]
fn test_missing_config_file_fails() {
    let output = run_cli(&["--config", "/nonexistent/vehcache.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config"), "stderr: {}", stderr);
}

#[test]
fn test_cached_polls_repeat_the_same_reading() {
    let output = run_cli(&["--polls", "3", "--interval", "1", "--cache", "600"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "stdout: {}", stdout);
    assert!(lines.iter().all(|l| l.contains("soc 40%")), "stdout: {}", stdout);
}

#[test]
fn test_zero_cache_reads_upstream_every_poll() {
    let output = run_cli(&["--polls", "2", "--interval", "1", "--cache", "0"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("poll 1: soc 40%"), "stdout: {}", stdout);
    assert!(stdout.contains("poll 2: soc 45%"), "stdout: {}", stdout);
}

#[test]
fn test_reset_forces_refresh_within_ttl() {
    let output = run_cli(&[
        "--polls",
        "2",
        "--interval",
        "1",
        "--cache",
        "600",
        "--reset-every",
        "1",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("poll 1: reset 2 caches"), "stdout: {}", stdout);
    assert!(stdout.contains("poll 2: soc 45%"), "stdout: {}", stdout);
}

#[test]
fn test_json_output_is_one_object_per_poll() {
    let output = run_cli(&["--polls", "2", "--interval", "1", "--json"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "stdout: {}", stdout);

    for (i, line) in lines.iter().enumerate() {
        let value: serde_json::Value = serde_json::from_str(line).expect("Each line should be JSON");
        assert_eq!(value["poll"], (i + 1) as u64);
        assert_eq!(value["snapshot"]["status"], "C");
    }
}

#[test]
fn test_failures_go_to_stderr() {
    let output = run_cli(&["--polls", "1", "--interval", "1", "--fail-every", "1"]);
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("poll 1: request failed"), "stderr: {}", stderr);
}

#[test]
fn test_endpoint_is_read_once_after_polling() {
    let output = run_cli(&[
        "--polls",
        "2",
        "--interval",
        "1",
        "--endpoint",
        "rolesrights/operations",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| l.starts_with("endpoint rolesrights/operations: "))
        .unwrap_or_else(|| panic!("missing endpoint line: {}", stdout));
    let json = line.trim_start_matches("endpoint rolesrights/operations: ");
    let value: serde_json::Value = serde_json::from_str(json).expect("endpoint value should be JSON");
    assert_eq!(value["path"], "rolesrights/operations");
    assert_eq!(value["call"], 1);
}

#[test]
fn test_endpoint_cache_joins_the_reset() {
    let output = run_cli(&[
        "--polls",
        "1",
        "--interval",
        "1",
        "--reset-every",
        "1",
        "--endpoint",
        "rolesrights/operations",
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("poll 1: reset 3 caches"), "stdout: {}", stdout);
}

#[test]
fn test_summary_logs_both_caches() {
    let output = Command::new(env!("CARGO_BIN_EXE_vehcache"))
        .args(["--polls", "1", "--interval", "1"])
        .env("RUST_LOG", "info")
        .output()
        .expect("Failed to execute vehcache");
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("charger cache summary"), "stderr: {}", stderr);
    assert!(stderr.contains("climater cache summary"), "stderr: {}", stderr);
}
