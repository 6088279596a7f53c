//! SQLite-backed host database.
//!
//! Mirrors the host application's option, user-meta, transient and
//! site-option tables in a single `entries` table, plus a `content_items`
//! table for structured content.

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::{debug, info, instrument, trace};

use super::{ContentId, ContentItem, ContentStatus, ContentStore, KeyValueStore, StoreKey};
use crate::error::{MigrateError, Result};

/// SQLite schema for the host database.
const SCHEMA_SQL: &str = r"
-- Settings entries across all namespaces
CREATE TABLE IF NOT EXISTS entries (
    namespace TEXT NOT NULL,
    scope INTEGER NOT NULL DEFAULT 0,
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace, scope, name)
);

-- Structured content items
CREATE TABLE IF NOT EXISTS content_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'publish',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_content_items_type ON content_items(item_type, status);
";

/// Database wrapper implementing both host stores.
pub struct HostDb {
    conn: Connection,
}

impl HostDb {
    /// Opens or creates a database at the given path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| MigrateError::io(parent, e))?;
        }

        debug!(path = %path.display(), "Opening host database");
        let conn = Connection::open(path)
            .map_err(|e| MigrateError::Store(format!("Failed to open database: {e}")))?;

        let db = Self { conn };
        db.init_schema()?;
        info!(path = %path.display(), "Host database ready");
        Ok(db)
    }

    /// Creates an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            MigrateError::Store(format!("Failed to create in-memory database: {e}"))
        })?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA_SQL)
            .map_err(|e| MigrateError::Store(format!("Failed to initialize schema: {e}")))?;
        Ok(())
    }

    /// Inserts a content item and returns its id.
    pub fn insert_item(&self, item_type: &str, status: ContentStatus) -> Result<ContentId> {
        self.conn
            .execute(
                "INSERT INTO content_items (item_type, status, created_at) VALUES (?1, ?2, ?3)",
                params![item_type, status.as_str(), Utc::now().to_rfc3339()],
            )
            .map_err(|e| MigrateError::Store(format!("Failed to insert content item: {e}")))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a content item by id.
    pub fn load_item(&self, id: ContentId) -> Result<Option<ContentItem>> {
        let row: Option<(ContentId, String, String)> = self
            .conn
            .query_row(
                "SELECT id, item_type, status FROM content_items WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(id, item_type, status)| {
            Ok(ContentItem {
                id,
                item_type,
                status: status.parse()?,
            })
        })
        .transpose()
    }

    /// Lists every entry key, ordered by namespace, scope and name.
    pub fn list_keys(&self) -> Result<Vec<StoreKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT namespace, scope, name FROM entries ORDER BY namespace, scope, name")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut keys = Vec::new();
        for row in rows {
            let (namespace, scope, name) = row?;
            keys.push(StoreKey {
                namespace: namespace.parse()?,
                scope,
                name,
            });
        }
        Ok(keys)
    }
}

/// Upsert one entry on a connection or open transaction.
fn upsert(conn: &Connection, key: &StoreKey, value: &Value) -> Result<()> {
    let encoded = serde_json::to_string(value)
        .map_err(|e| MigrateError::Store(format!("Failed to encode {key}: {e}")))?;
    trace!(%key, bytes = encoded.len(), "Upserting entry");
    conn.execute(
        "INSERT INTO entries (namespace, scope, name, value, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(namespace, scope, name)
         DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![
            key.namespace.as_str(),
            key.scope,
            key.name,
            encoded,
            Utc::now().to_rfc3339()
        ],
    )
    .map_err(|e| MigrateError::Store(format!("Failed to write {key}: {e}")))?;
    Ok(())
}

impl KeyValueStore for HostDb {
    fn get(&self, key: &StoreKey) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM entries WHERE namespace = ?1 AND scope = ?2 AND name = ?3",
                params![key.namespace.as_str(), key.scope, key.name],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|text| {
            serde_json::from_str(&text)
                .map_err(|e| MigrateError::Store(format!("Corrupt value at {key}: {e}")))
        })
        .transpose()
    }

    fn set(&mut self, key: &StoreKey, value: &Value) -> Result<()> {
        upsert(&self.conn, key, value)
    }

    fn delete(&mut self, key: &StoreKey) -> Result<bool> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM entries WHERE namespace = ?1 AND scope = ?2 AND name = ?3",
                params![key.namespace.as_str(), key.scope, key.name],
            )
            .map_err(|e| MigrateError::Store(format!("Failed to delete {key}: {e}")))?;
        Ok(deleted > 0)
    }

    /// All-or-nothing: the batch runs in one transaction.
    fn write_all(&mut self, writes: &[(StoreKey, Value)]) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| MigrateError::Store(format!("Failed to start transaction: {e}")))?;

        for (key, value) in writes {
            upsert(&tx, key, value)?;
        }

        tx.commit()
            .map_err(|e| MigrateError::Store(format!("Failed to commit transaction: {e}")))?;
        debug!(keys = writes.len(), "Batch committed");
        Ok(())
    }
}

impl ContentStore for HostDb {
    fn list_ids_by_type(
        &self,
        item_type: &str,
        include_all_statuses: bool,
    ) -> Result<Vec<ContentId>> {
        let sql = if include_all_statuses {
            "SELECT id FROM content_items WHERE item_type = ?1 ORDER BY id"
        } else {
            "SELECT id FROM content_items WHERE item_type = ?1 AND status != 'trash' ORDER BY id"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![item_type], |row| row.get::<_, ContentId>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn delete_by_id(&mut self, id: ContentId, permanent: bool) -> Result<bool> {
        let sql = if permanent {
            "DELETE FROM content_items WHERE id = ?1"
        } else {
            "UPDATE content_items SET status = 'trash' WHERE id = ?1"
        };
        let changed = self
            .conn
            .execute(sql, params![id])
            .map_err(|e| MigrateError::Store(format!("Failed to delete content item {id}: {e}")))?;
        Ok(changed > 0)
    }
}
