//! Capture, save and load against both store backends.

use serde_json::json;
use tempfile::TempDir;

use ccm::controller::{MigrationController, SnapshotSource};
use ccm::registry::{SchemaRegistry, SchemaVersion};
use ccm::snapshot::{Snapshot, SnapshotStore};
use ccm::store::{HostDb, HostStore, KeyValueStore, MemoryStore, StoreKey};

use crate::common::fixtures::{USER_ID, option, seed_v1, seed_v2};
use crate::common::init_test_logging;

fn capture_then_apply_is_a_no_op<S: HostStore>(store: &mut S) {
    seed_v1(store);
    seed_v2(store);
    let registry = SchemaRegistry::standard();

    for schema in SchemaVersion::ALL {
        let before = SnapshotStore::new(&mut *store, &registry, USER_ID)
            .capture(schema)
            .unwrap();
        SnapshotStore::new(&mut *store, &registry, USER_ID)
            .apply(&before)
            .unwrap();
        let after = SnapshotStore::new(&mut *store, &registry, USER_ID)
            .capture(schema)
            .unwrap();
        assert_eq!(before, after, "{schema} changed after apply(capture)");
    }
}

#[test]
fn apply_of_capture_is_a_no_op_in_memory() {
    init_test_logging();
    capture_then_apply_is_a_no_op(&mut MemoryStore::new());
}

#[test]
fn apply_of_capture_is_a_no_op_in_sqlite() {
    init_test_logging();
    capture_then_apply_is_a_no_op(&mut HostDb::in_memory().unwrap());
}

fn save_delete_load_restores<S: HostStore>(store: &mut S) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v1_data.json");
    store
        .set(&StoreKey::option("jp_cc_settings"), &json!({"theme": "dark"}))
        .unwrap();
    store
        .set(
            &StoreKey::user_meta(USER_ID, "_jp_cc_reviews_already_did"),
            &json!("yes"),
        )
        .unwrap();
    let registry = SchemaRegistry::standard();

    let mut controller = MigrationController::new(store, &registry, USER_ID);
    let receipt = controller.save_snapshot(SchemaVersion::V1, &path).unwrap();
    assert_eq!(receipt.bytes, std::fs::metadata(&path).unwrap().len() as usize);

    controller.delete_schema_data(SchemaVersion::V1).unwrap();
    assert!(controller.capture(SchemaVersion::V1).unwrap().is_empty());

    let report = controller
        .load_snapshot(SchemaVersion::V1, SnapshotSource::File(path))
        .unwrap();
    assert!(report.written.contains(&"option:jp_cc_settings".to_string()));
    assert_eq!(report.skipped.len(), 2);

    let restored = controller.capture(SchemaVersion::V1).unwrap();
    assert_eq!(restored.settings["theme"], json!("dark"));
    assert_eq!(restored.user_meta["_jp_cc_reviews_already_did"], json!("yes"));
}

#[test]
fn save_delete_load_restores_in_memory() {
    init_test_logging();
    save_delete_load_restores(&mut MemoryStore::new());
}

#[test]
fn save_delete_load_restores_in_sqlite() {
    init_test_logging();
    save_delete_load_restores(&mut HostDb::in_memory().unwrap());
}

#[test]
fn empty_user_meta_in_snapshot_keeps_current_value() {
    init_test_logging();
    let mut store = MemoryStore::new();
    let key = StoreKey::user_meta(USER_ID, "_jp_cc_reviews_last_dismissed");
    store.set(&key, &json!("2024-02-02")).unwrap();
    let registry = SchemaRegistry::standard();

    let snapshot =
        Snapshot::empty(SchemaVersion::V1).with_user_meta("_jp_cc_reviews_last_dismissed", json!(""));
    let report = SnapshotStore::new(&mut store, &registry, USER_ID)
        .apply(&snapshot)
        .unwrap();

    assert_eq!(report.skipped, vec!["_jp_cc_reviews_last_dismissed".to_string()]);
    assert_eq!(store.get(&key).unwrap(), Some(json!("2024-02-02")));
}

#[test]
fn empty_plugin_meta_is_written() {
    init_test_logging();
    let mut db = HostDb::in_memory().unwrap();
    db.set(
        &StoreKey::option("content_control_installed_on"),
        &json!("2023-05-01"),
    )
    .unwrap();
    let registry = SchemaRegistry::standard();

    let snapshot = Snapshot::empty(SchemaVersion::V2)
        .with_plugin_meta("content_control_installed_on", json!(""));
    SnapshotStore::new(&mut db, &registry, USER_ID)
        .apply(&snapshot)
        .unwrap();

    assert_eq!(option(&db, "content_control_installed_on"), json!(""));
}

#[test]
fn saved_file_has_exactly_three_sections() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("v2.json");
    let mut store = MemoryStore::new();
    seed_v2(&mut store);
    let registry = SchemaRegistry::standard();

    MigrationController::new(&mut store, &registry, USER_ID)
        .save_snapshot(SchemaVersion::V2, &path)
        .unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let keys: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["settings", "user_meta", "plugin_meta"]);
    assert_eq!(doc["settings"]["permissions"]["viewBlockControls"], "edit_posts");
    assert_eq!(doc["user_meta"], json!({}));
}

#[test]
fn snapshot_is_loaded_as_the_requested_schema() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings_only.json");
    std::fs::write(
        &path,
        br#"{"settings": {"x": 1}, "user_meta": [], "plugin_meta": []}"#,
    )
    .unwrap();
    let mut db = HostDb::in_memory().unwrap();
    let registry = SchemaRegistry::standard();

    MigrationController::new(&mut db, &registry, USER_ID)
        .load_snapshot(SchemaVersion::V2, SnapshotSource::File(path))
        .unwrap();

    assert_eq!(option(&db, "content_control_settings"), json!({"x": 1}));
    assert_eq!(option(&db, "jp_cc_settings"), serde_json::Value::Null);
}
