//! Full command sequences against one database.

use serde_json::{Value, json};

use ccm::store::{ContentStatus, HostDb};

use crate::common::cli::CliRunner;
use crate::common::fixtures::{seed_v1, seed_v2};
use crate::common::init_test_logging;

fn seeded() -> CliRunner {
    let cli = CliRunner::new();
    let mut db = HostDb::open(cli.db_path()).unwrap();
    seed_v1(&mut db);
    seed_v2(&mut db);
    db.insert_item("cc_restriction", ContentStatus::Publish).unwrap();
    db.insert_item("cc_restriction", ContentStatus::Trash).unwrap();
    cli
}

#[test]
fn show_empty_install() {
    init_test_logging();
    let cli = CliRunner::new();
    cli.run_robot(&["show", "v1"])
        .assert_success()
        .assert_json_field("/schema", &json!("v1"))
        .assert_json_field("/empty", &json!(true))
        .assert_json_field("/snapshot/settings", &json!({}));
}

#[test]
fn save_delete_load_cycle() {
    init_test_logging();
    let cli = seeded();

    cli.run_robot(&["save", "v1"])
        .assert_success()
        .assert_json_field("/action", &json!("saved"))
        .assert_json_field("/schema", &json!("v1"));
    assert!(cli.data_dir().join("v1_data.json").is_file());

    cli.run_robot(&["delete", "v1"])
        .assert_success()
        .assert_json_field("/action", &json!("deleted"))
        .assert_json_field("/marker/settings", &json!(2));
    cli.run_robot(&["show", "v1"])
        .assert_success()
        .assert_json_field("/empty", &json!(true));

    cli.run_robot(&["load", "v1"])
        .assert_success()
        .assert_json_field("/action", &json!("loaded"))
        .assert_json_array_len("/reset", 2)
        .assert_json_field("/reset/1/items_removed", &json!(2));

    cli.run_robot(&["show", "v1"])
        .assert_success()
        .assert_json_field("/snapshot/settings/theme", &json!("dark"))
        .assert_json_field(
            "/snapshot/user_meta/_jp_cc_reviews_already_did",
            &json!("yes"),
        );
    cli.run_robot(&["show", "v2"])
        .assert_success()
        .assert_json_field("/empty", &json!(true));
}

#[test]
fn export_prints_raw_document() {
    init_test_logging();
    let cli = seeded();
    let result = cli.run_robot(&["export", "v2"]);
    result
        .assert_success()
        .assert_json_field("/settings/permissions/viewBlockControls", &json!("edit_posts"))
        .assert_json_field("/user_meta", &json!({}));
    assert!(result.json().get("action").is_none());
}

#[test]
fn export_to_file_then_upload() {
    init_test_logging();
    let cli = seeded();
    cli.run_robot(&["export", "v2", "-o", "backup.json"])
        .assert_success()
        .assert_json_field("/action", &json!("exported"));
    let backup = cli.root().join("backup.json");
    assert!(backup.is_file());

    cli.run_robot(&["reset"])
        .assert_success()
        .assert_json_array_len("/reports", 2);
    cli.run_robot(&["load", "v2", "--file", "backup.json"])
        .assert_success()
        .assert_json_field("/schema", &json!("v2"));

    cli.run_robot(&["show", "v2"])
        .assert_success()
        .assert_json_field(
            "/snapshot/plugin_meta/content_control_installed_on",
            &json!("2023-05-01 12:00:00"),
        );
}

#[test]
fn secret_config_requires_token() {
    init_test_logging();
    let cli = CliRunner::with_config("\n[auth]\nsecret = \"s3cret\"\n");
    seed_v2(&mut HostDb::open(cli.db_path()).unwrap());

    let denied = cli.run_robot(&["reset"]);
    denied.assert_exit_code(1);
    let error = denied.error_json();
    assert!(error["message"].as_str().unwrap().contains("token"));
    assert_eq!(error["suggestion"], "Issue a token with: ccm token <action>");

    let issued = cli.run_robot(&["token", "reset"]);
    issued
        .assert_success()
        .assert_json_field("/action", &json!("reset"));
    let token = issued.json()["token"].as_str().unwrap().to_string();

    cli.run_robot(&["--token", &token, "delete", "v2"])
        .assert_exit_code(1);
    cli.with_env("CCM_TOKEN", &token)
        .run_robot(&["reset"])
        .assert_success()
        .assert_json_field("/action", &json!("reset"));
}

#[test]
fn token_without_secret_is_refused() {
    init_test_logging();
    let cli = CliRunner::new();
    cli.run_robot(&["token", "reset"])
        .assert_exit_code(1)
        .assert_stderr_contains("no secret configured");
}

#[test]
fn activate_and_marker_commands() {
    init_test_logging();
    let cli = CliRunner::new();

    let result = cli.run_robot(&["activate", "v2"]);
    result
        .assert_success()
        .assert_json_field("/action", &json!("activated"))
        .assert_json_field("/settings_page", &json!("content-control-settings"));
    assert_eq!(
        result.json()["active_plugins"],
        json!(["content-control/content-control.php"])
    );

    cli.run_robot(&["marker", "set", "v1"])
        .assert_success()
        .assert_json_field("/action", &json!("marker_set"))
        .assert_json_field("/marker/restrictions", &json!(1));
    cli.run_robot(&["marker"])
        .assert_success()
        .assert_json_field("/active", &json!("v1"));
}

#[test]
fn clear_upgrades_reports_existence() {
    init_test_logging();
    let cli = seeded();
    cli.run_robot(&["clear-upgrades"])
        .assert_success()
        .assert_json_field("/action", &json!("upgrade_history_cleared"))
        .assert_json_field("/existed", &json!(true));
    cli.run_robot(&["clear-upgrade-history"])
        .assert_success()
        .assert_json_field("/existed", &json!(false));
}

#[test]
fn delete_v2_removes_debug_log() {
    init_test_logging();
    let cli = seeded();
    let logs = cli.root().join("logs");
    std::fs::create_dir_all(&logs).unwrap();
    std::fs::write(logs.join("content-control-abc123.log"), "trace").unwrap();

    cli.run_robot(&["delete", "v2"])
        .assert_success()
        .assert_json_field("/report/logs_removed", &json!(1))
        .assert_json_field("/report/items_removed", &json!(2))
        .assert_json_field("/marker", &Value::Null);
    assert!(!logs.join("content-control-abc123.log").exists());
}
