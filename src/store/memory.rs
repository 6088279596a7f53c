//! In-memory host store for unit testing.
//!
//! Records every mutation and supports failure injection so tests can
//! observe partial-apply behaviour without a real host.
//!
//! # Example
//!
//! ```rust
//! use ccm::store::memory::{MemoryStore, StoreOp};
//! use ccm::store::{KeyValueStore, StoreKey};
//! use serde_json::json;
//!
//! let mut store = MemoryStore::new();
//! store.set(&StoreKey::option("jp_cc_settings"), &json!({"theme": "dark"})).unwrap();
//!
//! store.assert_operations(&[StoreOp::Set {
//!     key: "option:jp_cc_settings".to_string(),
//! }]);
//! ```

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, trace};

use super::{ContentId, ContentItem, ContentStatus, ContentStore, KeyValueStore, StoreKey};
use crate::error::{MigrateError, Result};

/// Recorded mutation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Set { key: String },
    Delete { key: String, existed: bool },
    DeleteItem { id: ContentId, permanent: bool },
}

/// Configuration for failure injection.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfig {
    /// Fail every write once this many writes have succeeded.
    pub fail_after_writes: Option<usize>,
    /// Keys (by display form) whose writes always fail.
    pub failing_keys: Vec<String>,
}

/// In-memory implementation of both host stores.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<StoreKey, Value>,
    items: BTreeMap<ContentId, ContentItem>,
    next_id: ContentId,
    operation_log: Vec<StoreOp>,
    writes: usize,
    config: MemoryConfig,
}

impl MemoryStore {
    pub fn new() -> Self {
        debug!("Creating memory store");
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    // === Configuration ===

    #[must_use]
    pub fn with_config(mut self, config: MemoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Fail every write after `writes` successful ones.
    #[must_use]
    pub fn fail_after(mut self, writes: usize) -> Self {
        self.config.fail_after_writes = Some(writes);
        self
    }

    /// Make writes to `key` fail.
    #[must_use]
    pub fn with_failing_key(mut self, key: &StoreKey) -> Self {
        self.config.failing_keys.push(key.to_string());
        self
    }

    /// Remove all injected failures.
    pub fn heal(&mut self) {
        self.config = MemoryConfig::default();
    }

    // === Content items ===

    /// Insert a content item and return its id.
    pub fn insert_item(&mut self, item_type: &str, status: ContentStatus) -> ContentId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.items.insert(
            id,
            ContentItem {
                id,
                item_type: item_type.to_string(),
                status,
            },
        );
        trace!(id, item_type, status = status.as_str(), "Inserted content item");
        id
    }

    pub fn item(&self, id: ContentId) -> Option<&ContentItem> {
        self.items.get(&id)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    // === Inspection ===

    pub fn entries(&self) -> &BTreeMap<StoreKey, Value> {
        &self.entries
    }

    pub fn contains(&self, key: &StoreKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn operations(&self) -> &[StoreOp] {
        &self.operation_log
    }

    pub fn clear_operations(&mut self) {
        self.operation_log.clear();
    }

    /// Assert the exact mutation sequence.
    ///
    /// # Panics
    ///
    /// Panics if the recorded operations differ.
    pub fn assert_operations(&self, expected: &[StoreOp]) {
        assert_eq!(
            self.operation_log, expected,
            "store operations differ from expected"
        );
    }

    /// Assert that nothing was written or deleted.
    ///
    /// # Panics
    ///
    /// Panics if any mutation was recorded.
    pub fn assert_no_writes(&self) {
        assert!(
            self.operation_log.is_empty(),
            "expected no writes, got {:?}",
            self.operation_log
        );
    }

    // === Internal Helpers ===

    fn check_write(&self, key: &StoreKey) -> Result<()> {
        let display = key.to_string();
        if self.config.failing_keys.contains(&display) {
            return Err(MigrateError::Store(format!(
                "memory store configured to fail on {display}"
            )));
        }
        if let Some(limit) = self.config.fail_after_writes {
            if self.writes >= limit {
                return Err(MigrateError::Store(format!(
                    "memory store write limit {limit} reached"
                )));
            }
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &StoreKey, value: &Value) -> Result<()> {
        self.check_write(key)?;
        trace!(%key, "Memory set");
        self.entries.insert(key.clone(), value.clone());
        self.writes += 1;
        self.operation_log.push(StoreOp::Set {
            key: key.to_string(),
        });
        Ok(())
    }

    fn delete(&mut self, key: &StoreKey) -> Result<bool> {
        let existed = self.entries.remove(key).is_some();
        self.operation_log.push(StoreOp::Delete {
            key: key.to_string(),
            existed,
        });
        Ok(existed)
    }
}

impl ContentStore for MemoryStore {
    fn list_ids_by_type(
        &self,
        item_type: &str,
        include_all_statuses: bool,
    ) -> Result<Vec<ContentId>> {
        Ok(self
            .items
            .values()
            .filter(|item| item.item_type == item_type)
            .filter(|item| include_all_statuses || !item.status.is_soft_deleted())
            .map(|item| item.id)
            .collect())
    }

    fn delete_by_id(&mut self, id: ContentId, permanent: bool) -> Result<bool> {
        self.operation_log.push(StoreOp::DeleteItem { id, permanent });
        if permanent {
            return Ok(self.items.remove(&id).is_some());
        }
        Ok(self.items.get_mut(&id).is_some_and(|item| {
            item.status = ContentStatus::Trash;
            true
        }))
    }
}
