//! Error types for snapshot migration operations.

use std::path::Path;

use thiserror::Error;

/// Primary error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    // Snapshot file errors
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot: {0}")]
    Format(String),

    #[error("Rejected upload: {0}")]
    InvalidUpload(String),

    // Host store errors
    #[error("Host store error: {0}")]
    Store(String),

    #[error("Partial apply: wrote {applied} of {total} keys, failed at '{key}': {reason}")]
    PartialApply {
        applied: usize,
        total: usize,
        key: String,
        reason: String,
    },

    // Boundary errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Unknown schema version '{0}': expected v1 or v2")]
    UnknownSchema(String),

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("{0}")]
    Other(String),
}

impl MigrateError {
    /// Build an [`MigrateError::Io`] carrying the offending path.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Format(_)
                | Self::InvalidUpload(_)
                | Self::Authorization(_)
                | Self::UnknownSchema(_)
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Io { .. } => Some("Check that the snapshot path exists and is writable"),
            Self::Format(_) => {
                Some("Snapshot must be a JSON object with settings, user_meta and plugin_meta")
            }
            Self::InvalidUpload(_) => Some("Upload a .json file exported by `ccm export`"),
            Self::Authorization(_) => Some("Issue a token with: ccm token <action>"),
            Self::PartialApply { .. } => {
                Some("Store is in a mixed state: run `ccm reset` and load again")
            }
            Self::UnknownSchema(_) => Some("Use v1 or v2"),
            Self::ConfigNotFound { .. } => Some("Create ~/.config/ccm/config.toml or pass --config"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for MigrateError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.to_string())
    }
}

/// Convenience type alias for Results using MigrateError.
pub type Result<T> = std::result::Result<T, MigrateError>;
