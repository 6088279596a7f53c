//! Migration workflows over the host store.
//!
//! [`MigrationController`] owns no state of its own. Every call borrows the
//! injected host store, performs one operation and returns; nothing is
//! persisted between calls except what the operation writes to the store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{MigrateError, Result};
use crate::registry::{
    ACTIVE_PLUGINS_KEY, COMPLETED_UPGRADES_KEY, DATA_VERSIONING_KEY, DEBUG_LOG_TOKEN_KEY,
    SchemaRegistry, SchemaVersion,
};
use crate::snapshot::{ApplyReport, Snapshot, SnapshotStore};
use crate::store::{HostStore, StoreKey};

/// Removes debug log files when v2 data is deleted.
///
/// Receives the stored debug-log token, if any, before the token option
/// itself is removed.
pub trait LogCleanup {
    /// Delete log files. Returns how many were removed.
    fn delete_logs(&mut self, token: Option<&str>) -> Result<usize>;
}

/// Deletes `content-control-<token>.log` from a log directory.
#[derive(Debug, Clone)]
pub struct LogDirCleanup {
    dir: PathBuf,
}

impl LogDirCleanup {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Log file path for `token`.
    pub fn log_path(&self, token: &str) -> PathBuf {
        self.dir.join(format!("content-control-{token}.log"))
    }
}

impl LogCleanup for LogDirCleanup {
    fn delete_logs(&mut self, token: Option<&str>) -> Result<usize> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            debug!("No debug log token stored, nothing to remove");
            return Ok(0);
        };
        // Tokens name a file; anything that could escape the directory is ignored.
        if token.contains(['/', '\\']) || token.contains("..") {
            warn!(token, "Ignoring suspicious debug log token");
            return Ok(0);
        }

        let path = self.log_path(token);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Removed debug log");
                Ok(1)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(MigrateError::io(&path, e)),
        }
    }
}

/// Per-category record of which schema version is active.
///
/// Serialized with integer versions, e.g. `{"settings": 2, ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMarker {
    #[serde(with = "version_number")]
    pub settings: SchemaVersion,
    #[serde(with = "version_number")]
    pub restrictions: SchemaVersion,
    #[serde(with = "version_number")]
    pub user_meta: SchemaVersion,
    #[serde(with = "version_number")]
    pub plugin_meta: SchemaVersion,
}

impl VersionMarker {
    /// Every category set to `version`.
    pub const fn uniform(version: SchemaVersion) -> Self {
        Self {
            settings: version,
            restrictions: version,
            user_meta: version,
            plugin_meta: version,
        }
    }

    /// The version all categories agree on, if they do.
    pub fn common_version(&self) -> Option<SchemaVersion> {
        let all = [self.restrictions, self.user_meta, self.plugin_meta];
        all.iter()
            .all(|v| *v == self.settings)
            .then_some(self.settings)
    }
}

mod version_number {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::registry::SchemaVersion;

    pub fn serialize<S: Serializer>(v: &SchemaVersion, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(v.number())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SchemaVersion, D::Error> {
        let n = u64::deserialize(d)?;
        SchemaVersion::from_number(n)
            .ok_or_else(|| D::Error::custom(format!("unknown schema version {n}")))
    }
}

/// Where a snapshot to load comes from.
#[derive(Debug, Clone)]
pub enum SnapshotSource {
    /// A snapshot file on disk.
    File(PathBuf),
    /// An already-parsed JSON document, e.g. a validated upload.
    Inline(Value),
}

/// Result of [`MigrationController::save_snapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct SaveReceipt {
    pub schema: SchemaVersion,
    pub path: PathBuf,
    pub bytes: usize,
    pub saved_at: DateTime<Utc>,
}

/// Result of [`MigrationController::delete_schema_data`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub schema: Option<SchemaVersion>,
    /// Keys that existed and were removed.
    pub keys_removed: usize,
    /// Content items permanently deleted.
    pub items_removed: usize,
    /// Log files removed by the cleanup hook.
    pub logs_removed: usize,
}

/// Result of [`MigrationController::activate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationOutcome {
    pub schema: SchemaVersion,
    pub plugin: String,
    /// Admin page to visit next.
    pub settings_page: String,
    pub active_plugins: Vec<String>,
}

/// Orchestrates export, save, load, delete and marker operations.
pub struct MigrationController<'a, S: HostStore + ?Sized> {
    store: &'a mut S,
    registry: &'a SchemaRegistry,
    user_id: i64,
    log_cleanup: Option<Box<dyn LogCleanup + 'a>>,
}

impl<'a, S: HostStore + ?Sized> MigrationController<'a, S> {
    pub fn new(store: &'a mut S, registry: &'a SchemaRegistry, user_id: i64) -> Self {
        Self {
            store,
            registry,
            user_id,
            log_cleanup: None,
        }
    }

    /// Install a hook that removes debug logs on v2 delete.
    #[must_use]
    pub fn with_log_cleanup(mut self, cleanup: Box<dyn LogCleanup + 'a>) -> Self {
        self.log_cleanup = Some(cleanup);
        self
    }

    pub const fn registry(&self) -> &SchemaRegistry {
        self.registry
    }

    fn snapshots(&mut self) -> SnapshotStore<'_, S> {
        SnapshotStore::new(&mut *self.store, self.registry, self.user_id)
    }

    /// Capture the current snapshot of `schema`.
    pub fn capture(&mut self, schema: SchemaVersion) -> Result<Snapshot> {
        self.snapshots().capture(schema)
    }

    /// Capture `schema` and serialize it as pretty JSON.
    #[instrument(skip(self))]
    pub fn export_snapshot(&mut self, schema: SchemaVersion) -> Result<Vec<u8>> {
        let bytes = self.capture(schema)?.to_json_pretty()?;
        info!(bytes = bytes.len(), "Snapshot exported");
        Ok(bytes)
    }

    /// Capture `schema` and write it atomically to `destination`.
    #[instrument(skip(self), fields(path = %destination.display()))]
    pub fn save_snapshot(
        &mut self,
        schema: SchemaVersion,
        destination: &Path,
    ) -> Result<SaveReceipt> {
        let snapshots = self.snapshots();
        let snapshot = snapshots.capture(schema)?;
        let bytes = snapshots.persist(&snapshot, destination)?;
        Ok(SaveReceipt {
            schema,
            path: destination.to_path_buf(),
            bytes,
            saved_at: Utc::now(),
        })
    }

    /// Read and validate a snapshot without touching the store.
    pub fn resolve_snapshot(
        &mut self,
        schema: SchemaVersion,
        source: SnapshotSource,
    ) -> Result<Snapshot> {
        match source {
            SnapshotSource::File(path) => self.snapshots().load(schema, &path),
            SnapshotSource::Inline(document) => {
                Snapshot::from_value(document, self.registry.get(schema)?)
            }
        }
    }

    /// Apply an already-resolved snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> Result<ApplyReport> {
        self.snapshots().apply(snapshot)
    }

    /// Resolve `source` as `schema` and apply it.
    ///
    /// Nothing is written when resolution fails.
    #[instrument(skip(self, source))]
    pub fn load_snapshot(
        &mut self,
        schema: SchemaVersion,
        source: SnapshotSource,
    ) -> Result<ApplyReport> {
        let snapshot = self.resolve_snapshot(schema, source)?;
        self.apply_snapshot(&snapshot)
    }

    /// Remove every key and content item `schema` owns.
    ///
    /// Missing keys are skipped silently, so this is idempotent.
    #[instrument(skip(self))]
    pub fn delete_schema_data(&mut self, schema: SchemaVersion) -> Result<DeleteReport> {
        let registry = self.registry;
        let def = registry.get(schema)?;
        let mut report = DeleteReport {
            schema: Some(schema),
            ..DeleteReport::default()
        };

        for item_type in def.content_types {
            let ids = self.store.list_ids_by_type(item_type, true)?;
            for id in ids {
                if self.store.delete_by_id(id, true)? {
                    report.items_removed += 1;
                }
            }
            debug!(item_type, removed = report.items_removed, "Purged content items");
        }

        for name in def.transient_keys {
            report.keys_removed += usize::from(self.store.delete(&StoreKey::transient(*name))?);
        }

        // The hook needs the token, so it runs before the option is purged.
        if def.purge_keys.contains(&DEBUG_LOG_TOKEN_KEY) {
            if let Some(cleanup) = self.log_cleanup.as_mut() {
                let token = self
                    .store
                    .get(&StoreKey::option(DEBUG_LOG_TOKEN_KEY))?
                    .and_then(|v| v.as_str().map(str::to_owned));
                report.logs_removed = cleanup.delete_logs(token.as_deref())?;
            }
        }

        let options = std::iter::once(&def.settings_key)
            .chain(def.install_keys)
            .chain(def.purge_keys);
        for name in options {
            report.keys_removed += usize::from(self.store.delete(&StoreKey::option(*name))?);
        }

        for name in def.user_keys {
            report.keys_removed +=
                usize::from(self.store.delete(&StoreKey::user_meta(self.user_id, *name))?);
        }

        for name in def.site_option_keys {
            report.keys_removed += usize::from(self.store.delete(&StoreKey::site_option(*name))?);
        }

        info!(
            keys = report.keys_removed,
            items = report.items_removed,
            logs = report.logs_removed,
            "Schema data deleted"
        );
        Ok(report)
    }

    /// Delete data for every registered version.
    #[instrument(skip(self))]
    pub fn reset_all(&mut self) -> Result<Vec<DeleteReport>> {
        let versions = self.registry.versions();
        versions
            .into_iter()
            .map(|v| self.delete_schema_data(v))
            .collect()
    }

    /// Write the version marker as a whole.
    #[instrument(skip(self))]
    pub fn set_active_version(&mut self, marker: VersionMarker) -> Result<()> {
        let value = serde_json::to_value(marker)
            .map_err(|e| MigrateError::Other(format!("failed to encode version marker: {e}")))?;
        self.store
            .set(&StoreKey::option(DATA_VERSIONING_KEY), &value)?;
        info!("Version marker written");
        Ok(())
    }

    /// Read the version marker, if one is stored.
    pub fn active_version(&self) -> Result<Option<VersionMarker>> {
        let Some(value) = self.store.get(&StoreKey::option(DATA_VERSIONING_KEY))? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| MigrateError::Store(format!("unreadable {DATA_VERSIONING_KEY}: {e}")))
    }

    /// Forget which v2 upgrade routines have run. Returns whether any were recorded.
    #[instrument(skip(self))]
    pub fn clear_completed_upgrades(&mut self) -> Result<bool> {
        let existed = self
            .store
            .delete(&StoreKey::option(COMPLETED_UPGRADES_KEY))?;
        info!(existed, "Upgrade history cleared");
        Ok(existed)
    }

    /// Make `schema`'s plugin the active one.
    ///
    /// Other versions' entries are removed from the active plugin list and
    /// the list is written back in a single write.
    #[instrument(skip(self))]
    pub fn activate(&mut self, schema: SchemaVersion) -> Result<ActivationOutcome> {
        let registry = self.registry;
        let plugin = registry.get(schema)?.plugin;
        let others: Vec<&str> = registry
            .iter()
            .filter(|def| def.version != schema)
            .map(|def| def.plugin.basename)
            .collect();

        let key = StoreKey::option(ACTIVE_PLUGINS_KEY);
        let mut active = match self.store.get(&key)? {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(MigrateError::Store(format!(
                        "{ACTIVE_PLUGINS_KEY} holds a non-string entry: {other}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(MigrateError::Store(format!(
                    "{ACTIVE_PLUGINS_KEY} must be a list, found {other}"
                )));
            }
        };

        active.retain(|p| !others.contains(&p.as_str()));
        if !active.iter().any(|p| p == plugin.basename) {
            active.push(plugin.basename.to_string());
        }

        let value = Value::Array(active.iter().cloned().map(Value::String).collect());
        self.store.set(&key, &value)?;
        info!(plugin = plugin.basename, "Plugin activated");

        Ok(ActivationOutcome {
            schema,
            plugin: plugin.basename.to_string(),
            settings_page: plugin.settings_page.to_string(),
            active_plugins: active,
        })
    }
}
