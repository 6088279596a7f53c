//! Static declaration of which host keys each schema version owns.
//!
//! Every operation that needs to know what "v1 data" or "v2 data" means
//! looks it up here. Nothing is computed: each [`SchemaDef`] is a plain
//! table of option names, user-meta keys and content types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::store::Namespace;

/// Option holding the per-category [`VersionMarker`](crate::controller::VersionMarker).
pub const DATA_VERSIONING_KEY: &str = "content_control_data_versioning";
/// Option holding the upgrade routines v2 has already run.
pub const COMPLETED_UPGRADES_KEY: &str = "content_control_completed_upgrades";
/// Option holding the token that names the v2 debug log file.
pub const DEBUG_LOG_TOKEN_KEY: &str = "content_control_debug_log_token";
/// Option listing active plugin entry points.
pub const ACTIVE_PLUGINS_KEY: &str = "active_plugins";

/// Transients both generations write. Deleted by either version's cleanup.
pub const SHARED_TRANSIENTS: &[&str] = &["content_control_installed"];

/// A generation of the Content Control configuration model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Content Control 1.x (`jp_cc_*` options).
    V1,
    /// Content Control 2.x (`content_control_*` options, restriction posts).
    V2,
}

impl SchemaVersion {
    /// Every known version, oldest first.
    pub const ALL: [Self; 2] = [Self::V1, Self::V2];

    /// Integer form used by the host's data-versioning option.
    pub const fn number(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Parse the host's integer form.
    pub const fn from_number(n: u64) -> Option<Self> {
        match n {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => None,
        }
    }

    /// File name of the "last saved" snapshot for this version.
    pub fn snapshot_file_name(self) -> String {
        format!("v{}_data.json", self.number())
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

impl FromStr for SchemaVersion {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(Self::V1),
            "v2" | "2" => Ok(Self::V2),
            _ => Err(MigrateError::UnknownSchema(s.to_string())),
        }
    }
}

/// Plugin entry point that runs a schema version on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginEntry {
    /// Plugin basename as listed in `active_plugins`.
    pub basename: &'static str,
    /// Admin settings page slug to visit after activation.
    pub settings_page: &'static str,
}

/// Everything one schema version owns in the host store.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDef {
    pub version: SchemaVersion,
    /// Option holding the flat settings mapping.
    pub settings_key: &'static str,
    /// User-meta keys captured into `user_meta`.
    pub user_keys: &'static [&'static str],
    /// Options captured into `plugin_meta`.
    pub install_keys: &'static [&'static str],
    /// Options removed on delete but never captured.
    pub purge_keys: &'static [&'static str],
    /// Network-wide options removed on delete.
    pub site_option_keys: &'static [&'static str],
    /// Transients removed on delete.
    pub transient_keys: &'static [&'static str],
    /// Content-item types purged on delete (all statuses, permanently).
    pub content_types: &'static [&'static str],
    pub plugin: PluginEntry,
}

impl SchemaDef {
    /// Keys this version exclusively owns, tagged by namespace.
    ///
    /// Shared transients are left out; content types are reported under the
    /// pseudo-namespace `None`.
    pub fn owned_keys(&self) -> Vec<(Option<Namespace>, &'static str)> {
        let mut keys = vec![(Some(Namespace::Option), self.settings_key)];
        keys.extend(self.user_keys.iter().map(|k| (Some(Namespace::UserMeta), *k)));
        keys.extend(self.install_keys.iter().map(|k| (Some(Namespace::Option), *k)));
        keys.extend(self.purge_keys.iter().map(|k| (Some(Namespace::Option), *k)));
        keys.extend(
            self.site_option_keys
                .iter()
                .map(|k| (Some(Namespace::SiteOption), *k)),
        );
        keys.extend(
            self.transient_keys
                .iter()
                .filter(|k| !SHARED_TRANSIENTS.contains(k))
                .map(|k| (Some(Namespace::Transient), *k)),
        );
        keys.extend(self.content_types.iter().map(|t| (None, *t)));
        keys
    }

    /// True when `key` may appear in a snapshot's `user_meta` section.
    pub fn declares_user_key(&self, key: &str) -> bool {
        self.user_keys.contains(&key)
    }

    /// True when `key` may appear in a snapshot's `plugin_meta` section.
    pub fn declares_install_key(&self, key: &str) -> bool {
        self.install_keys.contains(&key)
    }
}

const V1: SchemaDef = SchemaDef {
    version: SchemaVersion::V1,
    settings_key: "jp_cc_settings",
    user_keys: &[
        "_jp_cc_reviews_dismissed_triggers",
        "_jp_cc_reviews_last_dismissed",
        "_jp_cc_reviews_already_did",
    ],
    install_keys: &["jp_cc_reviews_installed_on"],
    purge_keys: &[],
    site_option_keys: &[],
    transient_keys: SHARED_TRANSIENTS,
    content_types: &[],
    plugin: PluginEntry {
        basename: "content-control-old/content-control-old.php",
        settings_page: "jp-cc-settings",
    },
};

const V2: SchemaDef = SchemaDef {
    version: SchemaVersion::V2,
    settings_key: "content_control_settings",
    user_keys: &[],
    install_keys: &["content_control_installed_on"],
    purge_keys: &[
        "content_control_version",
        "content_control_activated",
        DATA_VERSIONING_KEY,
        DEBUG_LOG_TOKEN_KEY,
        "content_control_known_blockTypes",
        "content_control_pro_version",
        COMPLETED_UPGRADES_KEY,
        "content_control_license",
        "content_control_pro_activation_date",
        "content_control_connect_token",
    ],
    site_option_keys: &["content_control_activated"],
    transient_keys: SHARED_TRANSIENTS,
    content_types: &["cc_restriction"],
    plugin: PluginEntry {
        basename: "content-control/content-control.php",
        settings_page: "content-control-settings",
    },
};

/// Lookup table from [`SchemaVersion`] to [`SchemaDef`].
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: Vec<SchemaDef>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl SchemaRegistry {
    /// The Content Control v1/v2 declarations.
    pub fn standard() -> Self {
        Self {
            schemas: vec![V1, V2],
        }
    }

    /// Build a registry from explicit declarations, checking disjointness.
    pub fn new(schemas: Vec<SchemaDef>) -> Result<Self> {
        let registry = Self { schemas };
        registry.validate()?;
        Ok(registry)
    }

    /// Declaration for `version`.
    pub fn get(&self, version: SchemaVersion) -> Result<&SchemaDef> {
        self.schemas
            .iter()
            .find(|s| s.version == version)
            .ok_or_else(|| MigrateError::UnknownSchema(version.to_string()))
    }

    /// All declarations, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaDef> {
        self.schemas.iter()
    }

    /// Versions this registry knows about.
    pub fn versions(&self) -> Vec<SchemaVersion> {
        self.schemas.iter().map(|s| s.version).collect()
    }

    /// Check that each version is declared once and that no two versions
    /// own the same key, so deletes can run in any order.
    pub fn validate(&self) -> Result<()> {
        let mut owners: BTreeMap<(Option<Namespace>, &str), SchemaVersion> = BTreeMap::new();
        for (idx, def) in self.schemas.iter().enumerate() {
            if self.schemas[..idx].iter().any(|s| s.version == def.version) {
                return Err(MigrateError::Other(format!(
                    "schema {} declared twice",
                    def.version
                )));
            }
            for key in def.owned_keys() {
                if let Some(owner) = owners.insert(key, def.version) {
                    if owner != def.version {
                        return Err(MigrateError::Other(format!(
                            "key '{}' is owned by both {owner} and {}",
                            key.1, def.version
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
