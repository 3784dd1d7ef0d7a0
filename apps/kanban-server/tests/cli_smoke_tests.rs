//! CLI smoke tests for the kanban-server binary
//!
//! These tests drive the compiled binary: help output, configuration
//! validation and a short server start.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

/// Helper to run the kanban-server binary with given arguments
fn run_kanban_server(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_kanban-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute kanban-server")
}

/// Write a config whose home_dir lives inside `dir`, with `extra` appended
fn write_config(dir: &Path, name: &str, extra: &str) -> String {
    let config_path = dir.join(name);
    let content = format!(
        r#"
server:
  home_dir: "{}"
  host: "127.0.0.1"
  port: 0

logging:
  default:
    console_level: info
    file: "logs/kanban.log"
    file_level: debug
    max_backups: 2
    max_size_mb: 10
{extra}"#,
        dir.join("home").to_string_lossy().replace('\\', "/")
    );
    std::fs::write(&config_path, content).expect("Failed to write config file");
    config_path.to_string_lossy().to_string()
}

#[test]
fn test_cli_help_command() {
    let output = run_kanban_server(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kanban-server"), "Should contain binary name");
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("run"), "Should contain 'run' subcommand");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(stdout.contains("--config"), "Should mention config option");
    assert!(stdout.contains("--print-config"));
}

#[test]
fn test_cli_version_command() {
    let output = run_kanban_server(&["--version"]);

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("kanban-server"));
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_kanban_server(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "Should report the invalid command: {stderr}");
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_kanban_server(&["--config", "/nonexistent/config.yaml", "check"]);

    assert!(!output.status.success(), "Should fail with missing config");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("config file not found"),
        "Should mention config file issue: {stderr}"
    );
}

#[test]
fn test_cli_config_flag_short_form() {
    let output = run_kanban_server(&["-c", "/nonexistent/config.yaml", "check"]);
    assert!(!output.status.success(), "Should fail with missing config file");
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("invalid.yaml");
    std::fs::write(&config_path, "invalid: yaml: content: [unclosed")
        .expect("Failed to write file");

    let output = run_kanban_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "Should fail with invalid YAML");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("config"),
        "Should mention the config failure: {stderr}"
    );
}

#[test]
fn test_cli_config_validation_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "valid.yaml",
        r#"
modules:
  kanban_board:
    sse_keepalive_secs: 5
    allow_unknown_users: false
    users:
      - user_id: alice
        display_name: Alice
"#,
    );

    let output = run_kanban_server(&["--config", &config_path, "check"]);

    if !output.status.success() {
        eprintln!("STDERR: {}", String::from_utf8_lossy(&output.stderr));
    }
    assert!(output.status.success(), "Should succeed with valid config");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration check passed"));
}

#[test]
fn test_cli_rejects_invalid_module_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        temp_dir.path(),
        "bad_module.yaml",
        r#"
modules:
  kanban_board:
    keepalive: 5
"#,
    );

    let output = run_kanban_server(&["--config", &config_path, "check"]);

    assert!(!output.status.success(), "Unknown module keys should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("kanban_board"), "Should name the module: {stderr}");
}

#[test]
fn test_cli_rejects_invalid_bind_address() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("bad_host.yaml");
    let content = format!(
        "server:\n  home_dir: \"{}\"\n  host: \"not a host\"\n  port: 8087\n",
        temp_dir.path().join("home").to_string_lossy().replace('\\', "/")
    );
    std::fs::write(&config_path, content).expect("Failed to write config file");

    let output = run_kanban_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "Should fail with invalid bind address");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("address"), "Should mention the address: {stderr}");
}

#[test]
fn test_cli_print_config_applies_port_override() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), "print.yaml", "");

    let output = run_kanban_server(&["--config", &config_path, "--port", "9191", "--print-config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 9191"), "Override missing: {stdout}");
}

#[test]
fn test_cli_subcommand_help() {
    let output = run_kanban_server(&["run", "--help"]);
    assert!(output.status.success(), "Run subcommand help should succeed");
    assert!(String::from_utf8_lossy(&output.stdout).contains("server"));

    let output = run_kanban_server(&["check", "--help"]);
    assert!(output.status.success(), "Check subcommand help should succeed");
    assert!(String::from_utf8_lossy(&output.stdout).contains("configuration"));
}

#[tokio::test]
async fn test_cli_run_command_starts_server() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(temp_dir.path(), "run.yaml", "");

    let mut cmd = tokio::process::Command::new(env!("CARGO_BIN_EXE_kanban-server"));
    cmd.args(["--config", &config_path, "run"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Still running after the timeout means startup succeeded
    match timeout(Duration::from_secs(5), cmd.output()).await {
        Err(_elapsed) => {}
        Ok(Ok(output)) => panic!(
            "Server exited early: {}",
            String::from_utf8_lossy(&output.stderr)
        ),
        Ok(Err(e)) => panic!("Failed to spawn server: {e}"),
    }
}
