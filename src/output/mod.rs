//! Output mode abstraction for robot and human output.

use std::path::Path;

use crate::actions::Outcome;
use crate::cli::Cli;
use crate::config::Settings;
use crate::controller::VersionMarker;
use crate::error::MigrateError;
use crate::registry::{SchemaRegistry, SchemaVersion};
use crate::snapshot::Snapshot;

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// JSON output for scripting.
    Robot(RobotFormat),
    /// Styled terminal output; `color` is false under --no-color.
    Human { color: bool },
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    #[must_use]
    pub const fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            Self::Human {
                color: !cli.no_color,
            }
        }
    }

    /// Convert into the appropriate Output implementation.
    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human { color } => Box::new(HumanOutput::new(color)),
        }
    }
}

/// Build metadata shown by `ccm version`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildInfo<'a> {
    pub version: &'a str,
    pub git_sha: Option<&'a str>,
    pub git_dirty: bool,
    pub build_timestamp: Option<&'a str>,
    pub rustc_version: Option<&'a str>,
    pub target: Option<&'a str>,
}

/// Trait for all output operations.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &MigrateError);

    // Snapshots
    fn snapshot(&self, snapshot: &Snapshot);
    /// Export written to `path`, or printed when `path` is `None`.
    fn exported(&self, schema: SchemaVersion, path: Option<&Path>, document: &[u8]);

    // Actions
    fn outcome(&self, outcome: &Outcome);
    fn marker(&self, marker: Option<&VersionMarker>);
    fn token(&self, scope: &str, token: &str);

    // Inspection
    fn registry(&self, registry: &SchemaRegistry);
    fn settings(&self, settings: &Settings);

    // Metadata
    fn version_info(&self, info: &BuildInfo<'_>);
    fn quick_start(&self);
}
