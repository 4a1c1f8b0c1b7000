//! CLI integration tests

use std::process::Command;

fn thermo(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "thermal-cli", "--"])
        .args(args)
        .env_remove("THERMO_USER")
        .env_remove("THERMO_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = thermo(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Thermal Load Predictor"), "Should show app name");
    for command in [
        "predict",
        "history",
        "show",
        "delete",
        "dashboard",
        "insights",
        "sweep",
        "schema",
    ] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = thermo(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("thermo"), "Should show binary name");
}

#[test]
fn test_predict_help() {
    let output = thermo(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--feature"), "Should show feature option");
}

#[test]
fn test_sweep_help() {
    let output = thermo(&["sweep", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--start"));
    assert!(stdout.contains("--end"));
    assert!(stdout.contains("--step"));
    assert!(stdout.contains("--baseline"));
}

#[test]
fn test_insights_rejects_unknown_baseline() {
    let output = thermo(&["--user", "alice", "insights", "--baseline", "median"]);
    assert!(!output.status.success());
}

#[test]
fn test_format_option() {
    let output = thermo(&["--format", "yaml", "history"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Unknown format should fail");
    assert!(stderr.contains("invalid value"), "Should explain the bad value");
}

#[test]
fn test_invalid_command() {
    let output = thermo(&["calibrate"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_missing_argument() {
    let output = thermo(&["show"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Missing argument should fail");
    assert!(stderr.contains("<ID>"), "Should name the missing argument");
}

#[test]
fn test_unreachable_server_fails_cleanly() {
    let output = thermo(&[
        "--api-url",
        "http://127.0.0.1:9",
        "--user",
        "alice",
        "history",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Failed to send request"), "{}", stderr);
}
