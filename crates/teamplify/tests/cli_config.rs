//! Integration tests for configuration handling in the CLI.
//!
//! None of these reach the container engine: they either stop at
//! validation or only rewrite the configuration file.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn run_teamplify(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_teamplify"))
        .args(args)
        .env("HOME", home)
        .env_remove("XDG_DATA_HOME")
        .env_remove("TEAMPLIFY_CONF")
        .output()
        .expect("Failed to execute 'teamplify'")
}

#[test]
fn test_invalid_configuration_aborts_command() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("teamplify.ini");
    fs::write(&config, "[main]\nproduct_key = 42\n").unwrap();

    let output = run_teamplify(temp.path(), &["--config", config.to_str().unwrap(), "start"]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stdout.contains("Using the configuration file at"),
        "stdout: {}",
        stdout
    );
    assert!(stderr.contains("Configuration problem"), "stderr: {}", stderr);
    assert!(
        stderr.contains("[main] product_key: Invalid product key: 42"),
        "stderr: {}",
        stderr
    );
    assert!(stderr.trim_end().ends_with("Command aborted."), "stderr: {}", stderr);
}

#[test]
fn test_configure_strips_unknown_entries() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("teamplify.ini");
    fs::write(
        &config,
        "[main]\nproduct_key = 42\n\n[web]\nhost = teamplify.example.com\nobsolete = 1\n\n[legacy]\nkey = value\n",
    )
    .unwrap();

    let output = run_teamplify(temp.path(), &["--config", config.to_str().unwrap(), "configure"]);

    assert!(
        output.status.success(),
        "configure failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Current configuration saved to:"), "stdout: {}", stdout);
    assert!(stdout.contains(config.to_str().unwrap()), "stdout: {}", stdout);

    let text = fs::read_to_string(&config).unwrap();
    assert!(!text.contains("[legacy]"));
    assert!(!text.contains("obsolete"));
    assert!(text.contains("host = teamplify.example.com"));
    assert!(text.contains("[crypto]"));
}

#[test]
fn test_missing_config_file_is_a_usage_error() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("nope.ini");

    let output = run_teamplify(temp.path(), &["--config", missing.to_str().unwrap(), "start"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {}", stderr);
}

#[test]
fn test_stdout_has_no_json_logs() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("teamplify.ini");
    fs::write(&config, "[main]\nproduct_key = 42\n").unwrap();

    let output = run_teamplify(temp.path(), &["--config", config.to_str().unwrap(), "stop"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        !stdout.contains(r#""event":"#),
        "stdout should not contain JSON logs, got: {}",
        stdout
    );
}

#[test]
fn test_verbose_logs_go_to_stderr() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("teamplify.ini");
    fs::write(&config, "[main]\nproduct_key = 42\n").unwrap();

    let output = run_teamplify(temp.path(), &["-v", "--config", config.to_str().unwrap(), "configure"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stdout.contains(r#""event":"#));
    assert!(stderr.contains("cli.configure_completed"), "stderr: {}", stderr);
}

fn config_source(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Using the configuration file at "))
}

#[test]
fn test_env_override_wins_over_home_config() {
    let temp = TempDir::new().unwrap();
    let home_config = temp.path().join(".teamplify.ini");
    let env_config = temp.path().join("override.ini");
    fs::write(&home_config, "[main]\nproduct_key = home\n").unwrap();
    fs::write(&env_config, "[main]\nproduct_key = override\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_teamplify"))
        .arg("start")
        .env("HOME", temp.path())
        .env_remove("XDG_DATA_HOME")
        .env("TEAMPLIFY_CONF", &env_config)
        .output()
        .expect("Failed to execute 'teamplify start'");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(config_source(&stdout), env_config.to_str(), "stdout: {}", stdout);
    assert!(stderr.contains("Invalid product key: override"), "stderr: {}", stderr);
}

#[test]
fn test_home_config_used_without_env_override() {
    let temp = TempDir::new().unwrap();
    let home_config = temp.path().join(".teamplify.ini");
    fs::write(&home_config, "[main]\nproduct_key = home\n").unwrap();

    let output = run_teamplify(temp.path(), &["start"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(config_source(&stdout), home_config.to_str(), "stdout: {}", stdout);
    assert!(stderr.contains("Invalid product key: home"), "stderr: {}", stderr);
}
