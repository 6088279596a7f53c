//! Configuration file loading.
//!
//! The config file is optional. It may be YAML or TOML; the format is
//! detected from the extension.
//!
//! # Example TOML
//!
//! ```toml
//! database = "~/.local/share/ccm/host.db"
//! data_dir = "snapshots"
//! user_id = 1
//! log_dir = "/var/www/wp-content/uploads/content-control"
//!
//! [auth]
//! secret = "change-me"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::error::{MigrateError, Result};

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting config format from extension");
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Authorization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Secret used to derive origin tokens. Tokens are optional when unset.
    pub secret: Option<String>,
}

/// Contents of a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Host database path.
    pub database: Option<PathBuf>,
    /// Directory holding `v1_data.json` / `v2_data.json`.
    pub data_dir: Option<PathBuf>,
    /// User whose metadata is captured and applied.
    pub user_id: Option<i64>,
    /// Directory holding v2 debug logs.
    pub log_dir: Option<PathBuf>,
    pub auth: AuthConfig,
}

/// Load a config file, detecting its format from the extension.
///
/// # Errors
///
/// Returns [`MigrateError::ConfigNotFound`] if the file does not exist and
/// [`MigrateError::ConfigParse`] if the extension is unknown or parsing fails.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let format = ConfigFormat::from_extension(path).ok_or_else(|| {
        MigrateError::ConfigParse(format!(
            "Unknown config format for '{}': expected .yaml, .yml, or .toml",
            path.display()
        ))
    })?;
    debug!(format = ?format, "Detected config format");

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MigrateError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            MigrateError::io(path, e)
        }
    })?;

    let config = load_config_from_str(&content, format)?;
    info!(
        database = ?config.database,
        user_id = ?config.user_id,
        auth = config.auth.secret.is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Parse config content in a known format.
pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<FileConfig> {
    let config: FileConfig = match format {
        ConfigFormat::Yaml if content.trim().is_empty() => FileConfig::default(),
        ConfigFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| MigrateError::ConfigParse(format!("YAML: {e}")))?,
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| MigrateError::ConfigParse(format!("TOML: {e}")))?
        }
    };

    if let Some(user_id) = config.user_id {
        if user_id <= 0 {
            return Err(MigrateError::ConfigParse(format!(
                "user_id must be positive, got {user_id}"
            )));
        }
    }
    Ok(config)
}
