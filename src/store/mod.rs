//! Host store abstraction.
//!
//! The host application owns two stores this tool operates on: a key-value
//! settings store (options, user meta, transients, site options) and a
//! content-item store. Both are injected as traits so the migration core
//! never touches ambient globals.
//!
//! # Implementations
//!
//! - [`HostDb`]: SQLite-backed host database used by the CLI
//! - [`memory::MemoryStore`]: in-memory store with operation recording and
//!   failure injection, for tests

pub mod memory;
mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MigrateError, Result};

pub use memory::MemoryStore;
pub use sqlite::HostDb;

/// Content-item identifier as assigned by the host.
pub type ContentId = i64;

/// Key namespace within the host settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Per-install option.
    Option,
    /// Per-user metadata; the key scope is the user id.
    UserMeta,
    /// Expiring cache entry.
    Transient,
    /// Network-wide option.
    SiteOption,
}

impl Namespace {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Option => "option",
            Self::UserMeta => "user_meta",
            Self::Transient => "transient",
            Self::SiteOption => "site_option",
        }
    }
}

impl FromStr for Namespace {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "option" => Ok(Self::Option),
            "user_meta" => Ok(Self::UserMeta),
            "transient" => Ok(Self::Transient),
            "site_option" => Ok(Self::SiteOption),
            other => Err(MigrateError::Store(format!("unknown namespace '{other}'"))),
        }
    }
}

/// Fully qualified key in the host settings store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    pub namespace: Namespace,
    /// User id for [`Namespace::UserMeta`], 0 otherwise.
    pub scope: i64,
    pub name: String,
}

impl StoreKey {
    pub fn option(name: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Option,
            scope: 0,
            name: name.into(),
        }
    }

    pub fn user_meta(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::UserMeta,
            scope: user_id,
            name: name.into(),
        }
    }

    pub fn transient(name: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Transient,
            scope: 0,
            name: name.into(),
        }
    }

    pub fn site_option(name: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::SiteOption,
            scope: 0,
            name: name.into(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Namespace::UserMeta => write!(f, "user_meta[{}]:{}", self.scope, self.name),
            ns => write!(f, "{}:{}", ns.as_str(), self.name),
        }
    }
}

/// Publication status of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Publish,
    Draft,
    Private,
    /// Soft-deleted; only listed when all statuses are requested.
    Trash,
}

impl ContentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Draft => "draft",
            Self::Private => "private",
            Self::Trash => "trash",
        }
    }

    pub const fn is_soft_deleted(self) -> bool {
        matches!(self, Self::Trash)
    }
}

impl FromStr for ContentStatus {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "publish" => Ok(Self::Publish),
            "draft" => Ok(Self::Draft),
            "private" => Ok(Self::Private),
            "trash" => Ok(Self::Trash),
            other => Err(MigrateError::Store(format!("unknown content status '{other}'"))),
        }
    }
}

/// A structured content item owned by a schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub item_type: String,
    pub status: ContentStatus,
}

/// Key-value settings store owned by the host.
pub trait KeyValueStore {
    /// Read a key. Absent keys are `Ok(None)`, never an error.
    fn get(&self, key: &StoreKey) -> Result<Option<Value>>;

    /// Create or overwrite a key.
    fn set(&mut self, key: &StoreKey, value: &Value) -> Result<()>;

    /// Remove a key. Returns whether it existed; a missing key is not an error.
    fn delete(&mut self, key: &StoreKey) -> Result<bool>;

    /// Write a batch of keys in order.
    ///
    /// The default writes one key at a time. A failure on the first write is
    /// returned unchanged (nothing was written); a later failure becomes
    /// [`MigrateError::PartialApply`] so callers can tell a mixed store from
    /// an untouched one. Backends with transactions should override this to
    /// make the batch all-or-nothing.
    fn write_all(&mut self, writes: &[(StoreKey, Value)]) -> Result<()> {
        for (idx, (key, value)) in writes.iter().enumerate() {
            if let Err(e) = self.set(key, value) {
                if idx == 0 {
                    return Err(e);
                }
                return Err(MigrateError::PartialApply {
                    applied: idx,
                    total: writes.len(),
                    key: key.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Content-item store owned by the host.
pub trait ContentStore {
    /// Ids of every item of `item_type`. Soft-deleted items are included
    /// only when `include_all_statuses` is set.
    fn list_ids_by_type(&self, item_type: &str, include_all_statuses: bool)
    -> Result<Vec<ContentId>>;

    /// Delete an item. `permanent = false` moves it to the trash instead.
    /// Returns whether the item existed.
    fn delete_by_id(&mut self, id: ContentId, permanent: bool) -> Result<bool>;
}

/// Both host stores behind one handle.
pub trait HostStore: KeyValueStore + ContentStore {}

impl<T: KeyValueStore + ContentStore + ?Sized> HostStore for T {}
