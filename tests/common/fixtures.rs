//! Seeded host stores and config files.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use ccm::registry::{COMPLETED_UPGRADES_KEY, DATA_VERSIONING_KEY, DEBUG_LOG_TOKEN_KEY};
use ccm::store::{KeyValueStore, StoreKey};

pub const USER_ID: i64 = 1;

/// A typical 1.x install: settings, one review flag and an install date.
pub fn seed_v1<S: KeyValueStore + ?Sized>(store: &mut S) {
    let writes = [
        (
            StoreKey::option("jp_cc_settings"),
            json!({"theme": "dark", "restrictions": [{"title": "Members"}]}),
        ),
        (
            StoreKey::user_meta(USER_ID, "_jp_cc_reviews_already_did"),
            json!("yes"),
        ),
        (
            StoreKey::option("jp_cc_reviews_installed_on"),
            json!("2020-01-01 00:00:00"),
        ),
        (StoreKey::transient("content_control_installed"), json!(1)),
    ];
    for (key, value) in &writes {
        store.set(key, value).unwrap();
    }
}

/// A typical 2.x install including bookkeeping options.
pub fn seed_v2<S: KeyValueStore + ?Sized>(store: &mut S) {
    let writes = [
        (
            StoreKey::option("content_control_settings"),
            json!({"excludedBlocks": [], "permissions": {"viewBlockControls": "edit_posts"}}),
        ),
        (
            StoreKey::option("content_control_installed_on"),
            json!("2023-05-01 12:00:00"),
        ),
        (StoreKey::option("content_control_version"), json!("2.0.0")),
        (
            StoreKey::option(DATA_VERSIONING_KEY),
            json!({"settings": 2, "restrictions": 2, "user_meta": 2, "plugin_meta": 2}),
        ),
        (
            StoreKey::option(COMPLETED_UPGRADES_KEY),
            json!(["backup_settings", "migrate_restrictions"]),
        ),
        (StoreKey::option(DEBUG_LOG_TOKEN_KEY), json!("abc123")),
        (StoreKey::site_option("content_control_activated"), json!(1)),
        (StoreKey::transient("content_control_installed"), json!(1)),
    ];
    for (key, value) in &writes {
        store.set(key, value).unwrap();
    }
}

/// Value stored under an option, or `Null` when absent.
pub fn option<S: KeyValueStore + ?Sized>(store: &S, name: &str) -> Value {
    store
        .get(&StoreKey::option(name))
        .unwrap()
        .unwrap_or(Value::Null)
}

/// Write a TOML config into `dir` and return its path.
pub fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

/// Write a snapshot document into `dir` under `name`.
pub fn write_snapshot(dir: &Path, name: &str, doc: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(doc).unwrap()).unwrap();
    path
}
