//! Snapshot data types and the on-disk document format.
//!
//! A snapshot file is one JSON object with exactly three sections:
//!
//! ```json
//! {
//!   "settings":    { "restrictions": [] },
//!   "user_meta":   { "_jp_cc_reviews_already_did": "" },
//!   "plugin_meta": { "jp_cc_reviews_installed_on": "2023-01-04 10:00:00" }
//! }
//! ```
//!
//! The file carries no schema tag. The caller names the schema when loading
//! and the in-memory [`Snapshot`] keeps it.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MigrateError, Result};
use crate::registry::{SchemaDef, SchemaVersion};

/// Captured configuration of one schema version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Schema the snapshot was captured from or loaded as.
    #[serde(skip)]
    pub schema: SchemaVersion,
    /// The version's flat settings mapping.
    pub settings: Map<String, Value>,
    /// Per-user metadata for the configured user.
    pub user_meta: Map<String, Value>,
    /// Install-level metadata.
    pub plugin_meta: Map<String, Value>,
}

/// Wire form of a snapshot; all three sections are required.
#[derive(Debug, Deserialize)]
struct Document {
    #[serde(deserialize_with = "map_or_empty_list")]
    settings: Map<String, Value>,
    #[serde(deserialize_with = "map_or_empty_list")]
    user_meta: Map<String, Value>,
    #[serde(deserialize_with = "map_or_empty_list")]
    plugin_meta: Map<String, Value>,
}

/// Accept an object, or an empty array (how the host encodes an empty map).
fn map_or_empty_list<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        Value::Array(items) if items.is_empty() => Ok(Map::new()),
        other => Err(de::Error::custom(format!(
            "expected an object, found {}",
            value_kind(&other)
        ))),
    }
}

pub(crate) const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Host "empty" test: null, false, 0, "", "0", [] and {} are empty.
///
/// User-scoped entries with an empty value are not written back on apply.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

impl Snapshot {
    /// An all-default snapshot for `schema`.
    pub fn empty(schema: SchemaVersion) -> Self {
        Self {
            schema,
            settings: Map::new(),
            user_meta: Map::new(),
            plugin_meta: Map::new(),
        }
    }

    /// Set a settings entry.
    pub fn with_setting(mut self, key: &str, value: Value) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }

    /// Set a user-meta entry.
    pub fn with_user_meta(mut self, key: &str, value: Value) -> Self {
        self.user_meta.insert(key.to_string(), value);
        self
    }

    /// Set a plugin-meta entry.
    pub fn with_plugin_meta(mut self, key: &str, value: Value) -> Self {
        self.plugin_meta.insert(key.to_string(), value);
        self
    }

    /// True when every section holds only defaults.
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
            && self.user_meta.values().all(is_empty_value)
            && self.plugin_meta.values().all(is_empty_value)
    }

    /// Serialize to the three-section document.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| MigrateError::Format(format!("failed to serialize snapshot: {e}")))
    }

    /// Parse a snapshot document as `def`'s schema.
    pub fn decode(bytes: &[u8], def: &SchemaDef) -> Result<Self> {
        let doc: Document = serde_json::from_slice(bytes)
            .map_err(|e| MigrateError::Format(e.to_string()))?;
        Self::from_document(doc, def)
    }

    /// Interpret an already-parsed JSON value as `def`'s schema.
    pub fn from_value(value: Value, def: &SchemaDef) -> Result<Self> {
        if !value.is_object() {
            return Err(MigrateError::Format(format!(
                "snapshot must be a JSON object, found {}",
                value_kind(&value)
            )));
        }
        let doc: Document =
            serde_json::from_value(value).map_err(|e| MigrateError::Format(e.to_string()))?;
        Self::from_document(doc, def)
    }

    fn from_document(doc: Document, def: &SchemaDef) -> Result<Self> {
        let snapshot = Self {
            schema: def.version,
            settings: doc.settings,
            user_meta: doc.user_meta,
            plugin_meta: doc.plugin_meta,
        };
        snapshot.check_declared(def)?;
        Ok(snapshot)
    }

    /// Reject meta keys `def` does not declare.
    ///
    /// A snapshot captured from another schema usually fails here, since
    /// the versions' key sets are disjoint.
    pub fn check_declared(&self, def: &SchemaDef) -> Result<()> {
        if self.schema != def.version {
            return Err(MigrateError::Format(format!(
                "snapshot is tagged {} but is being applied as {}",
                self.schema, def.version
            )));
        }
        if let Some(key) = self.user_meta.keys().find(|k| !def.declares_user_key(k)) {
            return Err(MigrateError::Format(format!(
                "user_meta key '{key}' is not declared for {}",
                def.version
            )));
        }
        if let Some(key) = self.plugin_meta.keys().find(|k| !def.declares_install_key(k)) {
            return Err(MigrateError::Format(format!(
                "plugin_meta key '{key}' is not declared for {}",
                def.version
            )));
        }
        Ok(())
    }
}
