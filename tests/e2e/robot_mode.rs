//! Robot-mode end-to-end tests.

use std::time::Duration;

use serde_json::{Value, json};

use crate::common::cli::CliRunner;
use crate::common::init_test_logging;

#[test]
fn robot_quick_start_outputs_json() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run(&["--robot"]);
    result
        .assert_success()
        .assert_json_field("/name", &json!("ccm"))
        .assert_json_field_exists("/commands/load")
        .assert_duration_under(Duration::from_secs(10));
}

#[test]
fn robot_registry_lists_both_schemas() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run_robot(&["registry"]);
    result
        .assert_success()
        .assert_json_array_len("/schemas", 2)
        .assert_json_field("/schemas/0/settings_key", &json!("jp_cc_settings"))
        .assert_json_field("/schemas/1/content_types/0", &json!("cc_restriction"));

    let json = result.json();
    let actions = json["actions"].as_array().unwrap();
    assert!(actions.contains(&json!("reset")));
    assert!(actions.contains(&json!("load_v2")));
}

#[test]
fn robot_format_flag_outputs_json() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run(&["version", "--format=json"]);
    result.assert_success();

    let json = result.json();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json.get("git_dirty").is_some());
}

#[test]
fn compact_format_is_single_line() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run(&["--format=json-compact", "registry"]);
    result.assert_success();
    assert_eq!(result.stdout.trim().lines().count(), 1);
}

#[test]
fn format_can_come_from_environment() {
    init_test_logging();
    let cli = CliRunner::new().with_env("CCM_FORMAT", "json");
    let result = cli.run(&["marker"]);
    result
        .assert_success()
        .assert_json_field("/marker", &Value::Null)
        .assert_json_field("/active", &Value::Null);
}

#[test]
fn robot_config_reports_resolved_paths() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run_robot(&["config"]);
    result
        .assert_success()
        .assert_json_field("/settings/user_id", &json!(1))
        .assert_json_field("/auth", &json!(false));

    let json = result.json();
    let database = json["settings"]["database"].as_str().unwrap();
    assert!(database.ends_with("host.db"), "database was {database}");
    assert!(json["settings"].get("secret").is_none());
}

#[test]
fn robot_errors_go_to_stderr_as_json() {
    init_test_logging();
    let cli = CliRunner::new();
    let result = cli.run_robot(&["load", "v1"]);
    result.assert_exit_code(1);
    assert!(result.stdout.trim().is_empty(), "stdout: {}", result.stdout);

    let error = result.error_json();
    assert_eq!(error["error"], true);
    assert_eq!(error["recoverable"], true);
    assert!(error["message"].as_str().unwrap().contains("v1_data.json"));
}

#[test]
fn unknown_schema_is_a_usage_error() {
    init_test_logging();
    let cli = CliRunner::new();
    cli.run_robot(&["delete", "v3"])
        .assert_exit_code(2)
        .assert_stderr_contains("v3");
}
