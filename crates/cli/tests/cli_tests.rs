//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};

fn pulse(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "pulse-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

fn pulse_with_settings(settings_file: &Path, args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "pulse-cli", "--"])
        .args(args)
        .env("PULSE_SETTINGS_FILE", settings_file)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = pulse(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Live process dashboard"),
        "Should show app description"
    );
    assert!(stdout.contains("watch"), "Should show watch command");
    assert!(stdout.contains("snapshot"), "Should show snapshot command");
    assert!(stdout.contains("search"), "Should show search command");
    assert!(stdout.contains("details"), "Should show details command");
    assert!(stdout.contains("apps"), "Should show apps command");
    assert!(stdout.contains("settings"), "Should show settings command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = pulse(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("pulse"), "Should show binary name");
}

/// Test snapshot subcommand help
#[test]
fn test_snapshot_help() {
    let output = pulse(&["snapshot", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Snapshot help should succeed");
    assert!(stdout.contains("--search"), "Should show search option");
    assert!(stdout.contains("--min-cpu"), "Should show min-cpu option");
    assert!(
        stdout.contains("--min-memory"),
        "Should show min-memory option"
    );
    assert!(stdout.contains("--sort"), "Should show sort option");
    assert!(stdout.contains("--export"), "Should show export option");
}

/// Test watch subcommand help
#[test]
fn test_watch_help() {
    let output = pulse(&["watch", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Watch help should succeed");
    assert!(stdout.contains("--interval"), "Should show interval option");
}

/// Test settings set subcommand help
#[test]
fn test_settings_set_help() {
    let output = pulse(&["settings", "set", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Settings set help should succeed");
    assert!(stdout.contains("--cpu-yellow"), "Should show cpu-yellow option");
    assert!(stdout.contains("--ram-red"), "Should show ram-red option");
    assert!(stdout.contains("--interval"), "Should show interval option");
}

/// Test format option
#[test]
fn test_format_option() {
    let output = pulse(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test api-url option
#[test]
fn test_api_url_option() {
    let output = pulse(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("PULSE_API_URL"), "Should show env var");
}

/// Test settings round-trip through a settings file
#[test]
fn test_settings_set_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let settings_file = dir.path().join("settings.json");

    let output = pulse_with_settings(
        &settings_file,
        &["--format", "json", "settings", "set", "--cpu-red", "90", "--interval", "15"],
    );
    assert!(output.status.success(), "Settings set should succeed");
    assert!(settings_file.exists(), "Settings file should be written");

    let output = pulse_with_settings(&settings_file, &["--format", "json", "settings", "show"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Settings show should succeed");
    assert!(
        stdout.contains("\"cpuRed\": 90.0"),
        "Should show updated threshold"
    );
    assert!(
        stdout.contains("\"refreshIntervalSecs\": 15"),
        "Should show updated interval"
    );
}

/// Test that a zero interval is refused and nothing is stored
#[test]
fn test_settings_rejects_zero_interval() {
    let dir = tempfile::tempdir().unwrap();
    let settings_file = dir.path().join("settings.json");

    let output = pulse_with_settings(&settings_file, &["settings", "set", "--interval", "0"]);

    assert!(!output.status.success(), "Zero interval should fail");
    assert!(!settings_file.exists(), "Nothing should be persisted");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = pulse(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = pulse(&["details"]);

    assert!(!output.status.success(), "Missing argument should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}
