//! Capture and apply snapshots against an injected host store.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, trace};

use super::file;
use super::schema::{Snapshot, is_empty_value, value_kind};
use crate::error::{MigrateError, Result};
use crate::registry::{SchemaRegistry, SchemaVersion};
use crate::store::{KeyValueStore, StoreKey};

/// What an apply wrote and what it deliberately left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Keys written, in write order.
    pub written: Vec<String>,
    /// User-meta keys skipped because the snapshot value was empty.
    pub skipped: Vec<String>,
}

/// Reads and writes one schema version's configuration in a host store.
pub struct SnapshotStore<'a, S: KeyValueStore + ?Sized> {
    store: &'a mut S,
    registry: &'a SchemaRegistry,
    user_id: i64,
}

impl<'a, S: KeyValueStore + ?Sized> SnapshotStore<'a, S> {
    /// `user_id` selects whose user-scoped keys are captured and applied.
    pub fn new(store: &'a mut S, registry: &'a SchemaRegistry, user_id: i64) -> Self {
        Self {
            store,
            registry,
            user_id,
        }
    }

    /// Read every key `schema` declares.
    ///
    /// Missing keys resolve to defaults: an empty settings mapping, `""` for
    /// user-scoped keys and `null` for install-scoped keys.
    #[instrument(skip(self), fields(user_id = self.user_id))]
    pub fn capture(&self, schema: SchemaVersion) -> Result<Snapshot> {
        let def = self.registry.get(schema)?;

        let settings = match self.store.get(&StoreKey::option(def.settings_key))? {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(Value::Array(items)) if items.is_empty() => Map::new(),
            Some(other) => {
                return Err(MigrateError::Store(format!(
                    "option '{}' holds {}, expected a mapping",
                    def.settings_key,
                    value_kind(&other)
                )));
            }
        };

        let mut user_meta = Map::new();
        for key in def.user_keys {
            let value = self
                .store
                .get(&StoreKey::user_meta(self.user_id, *key))?
                .unwrap_or_else(|| Value::String(String::new()));
            user_meta.insert((*key).to_string(), value);
        }

        let mut plugin_meta = Map::new();
        for key in def.install_keys {
            let value = self.store.get(&StoreKey::option(*key))?.unwrap_or(Value::Null);
            plugin_meta.insert((*key).to_string(), value);
        }

        debug!(
            settings = settings.len(),
            user_meta = user_meta.len(),
            plugin_meta = plugin_meta.len(),
            "Snapshot captured"
        );
        Ok(Snapshot {
            schema,
            settings,
            user_meta,
            plugin_meta,
        })
    }

    /// Serialize and atomically write `snapshot` to `destination`.
    ///
    /// Returns the number of bytes written.
    pub fn persist(&self, snapshot: &Snapshot, destination: &Path) -> Result<usize> {
        let bytes = snapshot.to_json_pretty()?;
        file::atomic_write(destination, &bytes)?;
        info!(path = %destination.display(), bytes = bytes.len(), schema = %snapshot.schema, "Snapshot persisted");
        Ok(bytes.len())
    }

    /// Read and decode a snapshot file as `schema`.
    pub fn load(&self, schema: SchemaVersion, source: &Path) -> Result<Snapshot> {
        let def = self.registry.get(schema)?;
        let bytes = file::read_artifact(source)?;
        Snapshot::decode(&bytes, def)
    }

    /// Write the snapshot back to the host store.
    ///
    /// User-scoped entries with an empty value are skipped so the current
    /// value survives; capture never skips. The write plan is validated in
    /// full before the first write.
    #[instrument(skip(self, snapshot), fields(schema = %snapshot.schema))]
    pub fn apply(&mut self, snapshot: &Snapshot) -> Result<ApplyReport> {
        let def = self.registry.get(snapshot.schema)?;
        snapshot.check_declared(def)?;

        let mut report = ApplyReport::default();
        let mut plan: Vec<(StoreKey, Value)> = Vec::with_capacity(
            1 + snapshot.user_meta.len() + snapshot.plugin_meta.len(),
        );

        plan.push((
            StoreKey::option(def.settings_key),
            Value::Object(snapshot.settings.clone()),
        ));

        for (key, value) in &snapshot.user_meta {
            if is_empty_value(value) {
                trace!(key = %key, "Skipping empty user meta");
                report.skipped.push(key.clone());
                continue;
            }
            plan.push((StoreKey::user_meta(self.user_id, key.as_str()), value.clone()));
        }

        for (key, value) in &snapshot.plugin_meta {
            plan.push((StoreKey::option(key.as_str()), value.clone()));
        }

        self.store.write_all(&plan)?;

        report.written = plan.iter().map(|(k, _)| k.to_string()).collect();
        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            "Snapshot applied"
        );
        Ok(report)
    }
}
