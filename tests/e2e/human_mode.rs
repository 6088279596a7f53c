//! Human-mode end-to-end tests.

use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::cli::CliRunner;
use crate::common::init_test_logging;

#[test]
fn human_quick_start_lists_commands() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run(&["--no-color"]);
    result
        .assert_success()
        .assert_stdout_contains("ccm show v1")
        .assert_stdout_contains("--robot");
    assert!(serde_json::from_str::<serde_json::Value>(&result.stdout).is_err());
}

#[test]
fn no_color_output_has_no_ansi() {
    init_test_logging();
    let cli = CliRunner::new().with_env("NO_COLOR", "1");
    let result = cli.run(&["registry"]);
    result
        .assert_success()
        .assert_stdout_contains("Schema v2")
        .assert_stdout_contains("content_control_settings");
    assert!(!result.stdout.contains('\u{1b}'), "found ANSI escapes");
}

#[test]
fn human_errors_carry_a_suggestion() {
    init_test_logging();
    let cli = CliRunner::new();
    std::fs::write(cli.root().join("notes.txt"), "{}").unwrap();
    cli.run(&["--no-color", "load", "v2", "--file", "notes.txt"])
        .assert_exit_code(1)
        .assert_stderr_contains("[ERR]")
        .assert_stderr_contains("Upload a .json file");
}

#[test]
fn version_shows_package_version() {
    let cli = CliRunner::new();
    Command::new(env!("CARGO_BIN_EXE_ccm"))
        .args(["--no-color", "version"])
        .env("CCM_CONFIG", cli.root().join("config.toml"))
        .env("RUST_LOG", "off")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn completions_are_generated() {
    Command::new(env!("CARGO_BIN_EXE_ccm"))
        .args(["completions", "bash"])
        .env("RUST_LOG", "off")
        .assert()
        .success()
        .stdout(predicate::str::contains("ccm").and(predicate::str::contains("clear-upgrades")));
}

#[test]
fn missing_named_config_fails() {
    Command::new(env!("CARGO_BIN_EXE_ccm"))
        .args(["--no-color", "--config", "/nonexistent/ccm.toml", "config"])
        .env("RUST_LOG", "off")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--config"));
}
