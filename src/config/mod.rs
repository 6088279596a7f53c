//! Runtime configuration.
//!
//! Values come from, lowest precedence first: built-in defaults, the
//! optional config file, then command-line flags and environment variables.
//! Relative paths in the config file resolve against the file's directory.

mod loader;
mod path;

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::{MigrateError, Result};

pub use loader::{AuthConfig, ConfigFormat, FileConfig, load_config, load_config_from_str};
pub use path::{PathResolver, home_dir, resolve_path};

/// User whose metadata is migrated when none is configured.
pub const DEFAULT_USER_ID: i64 = 1;

/// Config file names probed in the default config directory.
const DEFAULT_CONFIG_NAMES: &[&str] = &["config.toml", "config.yaml", "config.yml"];

/// Default config directory (`~/.config/ccm` on Linux).
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ccm"))
}

/// First existing config file in the default config directory.
pub fn find_default_config() -> Option<PathBuf> {
    let dir = default_config_dir()?;
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

/// Default data directory (`~/.local/share/ccm` on Linux).
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|d| d.join("ccm"))
        .ok_or_else(|| MigrateError::Other("Could not determine local data directory".to_string()))
}

/// Values supplied on the command line, overriding the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub database: Option<PathBuf>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Config file that was read, if any.
    pub source: Option<PathBuf>,
    pub database: PathBuf,
    pub data_dir: PathBuf,
    pub user_id: i64,
    pub log_dir: PathBuf,
    #[serde(skip)]
    pub secret: Option<String>,
}

impl Settings {
    /// Resolve settings from defaults, the config file and `overrides`.
    ///
    /// An explicitly named config file must exist; the default one is
    /// optional.
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let source = match &overrides.config {
            Some(path) => Some(path.clone()),
            None => find_default_config(),
        };
        let file = match &source {
            Some(path) => load_config(path)?,
            None => FileConfig::default(),
        };
        Self::from_parts(source, file, overrides)
    }

    /// Combine an already-loaded config file with overrides.
    pub fn from_parts(
        source: Option<PathBuf>,
        file: FileConfig,
        overrides: &Overrides,
    ) -> Result<Self> {
        let resolver = source.as_deref().map(PathResolver::new);
        let resolve = |p: &Path| -> Result<PathBuf> {
            match &resolver {
                Some(r) => r.resolve(p),
                None => resolve_path(p, Path::new(".")),
            }
        };

        let data_dir = match &file.data_dir {
            Some(dir) => resolve(dir)?,
            None => default_data_dir()?,
        };
        let database = match (&overrides.database, &file.database) {
            (Some(cli), _) => resolve_path(cli, Path::new("."))?,
            (None, Some(db)) => resolve(db)?,
            (None, None) => data_dir.join("host.db"),
        };
        let log_dir = match &file.log_dir {
            Some(dir) => resolve(dir)?,
            None => data_dir.join("logs"),
        };

        let settings = Self {
            source,
            database,
            data_dir,
            user_id: file.user_id.unwrap_or(DEFAULT_USER_ID),
            log_dir,
            secret: file.auth.secret.filter(|s| !s.is_empty()),
        };
        debug!(
            database = %settings.database.display(),
            data_dir = %settings.data_dir.display(),
            user_id = settings.user_id,
            "Settings resolved"
        );
        Ok(settings)
    }
}
