//! Malformed snapshots, missing files and interrupted writes.

use serde_json::json;
use tempfile::TempDir;

use ccm::controller::{MigrationController, SnapshotSource};
use ccm::error::MigrateError;
use ccm::registry::{SchemaRegistry, SchemaVersion};
use ccm::snapshot::{Snapshot, SnapshotStore};
use ccm::store::{HostDb, KeyValueStore, MemoryStore, StoreKey};

use crate::common::fixtures::{USER_ID, option, seed_v1, write_snapshot};
use crate::common::init_test_logging;

fn load_file(store: &mut MemoryStore, schema: SchemaVersion, body: &[u8]) -> MigrateError {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, body).unwrap();
    let registry = SchemaRegistry::standard();

    MigrationController::new(store, &registry, USER_ID)
        .load_snapshot(schema, SnapshotSource::File(path))
        .unwrap_err()
}

#[test]
fn malformed_json_writes_nothing() {
    init_test_logging();
    let mut store = MemoryStore::new();
    seed_v1(&mut store);
    store.clear_operations();

    let err = load_file(&mut store, SchemaVersion::V1, b"{\"settings\": {");

    assert!(matches!(err, MigrateError::Format(_)), "got {err:?}");
    store.assert_no_writes();
    assert_eq!(option(&store, "jp_cc_settings")["theme"], "dark");
}

#[test]
fn missing_section_is_a_format_error() {
    init_test_logging();
    let mut store = MemoryStore::new();
    let err = load_file(
        &mut store,
        SchemaVersion::V1,
        br#"{"settings": {}, "user_meta": {}}"#,
    );
    assert!(matches!(err, MigrateError::Format(_)), "got {err:?}");
    store.assert_no_writes();
}

#[test]
fn scalar_section_is_a_format_error() {
    init_test_logging();
    let mut store = MemoryStore::new();
    let err = load_file(
        &mut store,
        SchemaVersion::V2,
        br#"{"settings": "on", "user_meta": [], "plugin_meta": []}"#,
    );
    assert!(matches!(err, MigrateError::Format(_)), "got {err:?}");
}

#[test]
fn snapshot_from_the_other_version_is_rejected() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let doc = json!({
        "settings": {"theme": "dark"},
        "user_meta": {"_jp_cc_reviews_already_did": "yes"},
        "plugin_meta": {"jp_cc_reviews_installed_on": "2020-01-01"},
    });
    let path = write_snapshot(dir.path(), "v1.json", &doc);
    let mut db = HostDb::in_memory().unwrap();
    let registry = SchemaRegistry::standard();

    let err = MigrationController::new(&mut db, &registry, USER_ID)
        .load_snapshot(SchemaVersion::V2, SnapshotSource::File(path))
        .unwrap_err();

    assert!(matches!(err, MigrateError::Format(_)), "got {err:?}");
    assert!(db.list_keys().unwrap().is_empty());
}

#[test]
fn missing_snapshot_file_is_an_io_error() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let mut store = MemoryStore::new();
    let registry = SchemaRegistry::standard();

    let err = MigrationController::new(&mut store, &registry, USER_ID)
        .load_snapshot(
            SchemaVersion::V1,
            SnapshotSource::File(dir.path().join("v1_data.json")),
        )
        .unwrap_err();

    assert!(matches!(err, MigrateError::Io { .. }), "got {err:?}");
    assert!(err.is_user_recoverable());
}

#[test]
fn failure_after_first_write_reports_partial_apply() {
    init_test_logging();
    let mut store = MemoryStore::new().fail_after(1);
    let registry = SchemaRegistry::standard();
    let snapshot = Snapshot::empty(SchemaVersion::V1)
        .with_setting("theme", json!("dark"))
        .with_user_meta("_jp_cc_reviews_already_did", json!("yes"))
        .with_plugin_meta("jp_cc_reviews_installed_on", json!("2020-01-01"));

    let err = SnapshotStore::new(&mut store, &registry, USER_ID)
        .apply(&snapshot)
        .unwrap_err();

    match err {
        MigrateError::PartialApply {
            applied, total, key, ..
        } => {
            assert_eq!(applied, 1);
            assert_eq!(total, 3);
            assert_eq!(key, "user_meta[1]:_jp_cc_reviews_already_did");
        }
        other => panic!("expected PartialApply, got {other:?}"),
    }
    assert_eq!(option(&store, "jp_cc_settings"), json!({"theme": "dark"}));
}

#[test]
fn failure_on_first_write_leaves_store_untouched() {
    init_test_logging();
    let settings = StoreKey::option("jp_cc_settings");
    let mut store = MemoryStore::new().with_failing_key(&settings);
    let registry = SchemaRegistry::standard();
    let snapshot = Snapshot::empty(SchemaVersion::V1).with_setting("theme", json!("dark"));

    let err = SnapshotStore::new(&mut store, &registry, USER_ID)
        .apply(&snapshot)
        .unwrap_err();

    assert!(matches!(err, MigrateError::Store(_)), "got {err:?}");
    assert!(store.is_empty());
    store.heal();
    assert!(store.get(&settings).unwrap().is_none());
}

#[test]
fn undeclared_key_is_rejected_before_any_write() {
    init_test_logging();
    let mut db = HostDb::in_memory().unwrap();
    let registry = SchemaRegistry::standard();
    let snapshot = Snapshot::empty(SchemaVersion::V1)
        .with_setting("theme", json!("dark"))
        .with_user_meta("session_tokens", json!("stolen"));

    let err = SnapshotStore::new(&mut db, &registry, USER_ID)
        .apply(&snapshot)
        .unwrap_err();

    assert!(matches!(err, MigrateError::Format(_)), "got {err:?}");
    assert!(db.list_keys().unwrap().is_empty());
}
