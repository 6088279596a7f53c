//! Robot mode JSON output implementation.

use std::path::Path;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument, trace};

use crate::actions::{Action, Outcome};
use crate::config::Settings;
use crate::controller::VersionMarker;
use crate::error::MigrateError;
use crate::registry::{SchemaRegistry, SchemaVersion};
use crate::snapshot::Snapshot;

use super::{BuildInfo, Output, RobotFormat};

/// JSON output implementation for scripting.
///
/// Results go to stdout, errors to stderr, one JSON document each.
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    fn render<T: Serialize + ?Sized>(&self, data: &T) -> String {
        let rendered = match self.format {
            RobotFormat::Json => serde_json::to_string_pretty(data),
            RobotFormat::JsonCompact => serde_json::to_string(data),
        };
        rendered.unwrap_or_else(|e| {
            json!({"error": true, "message": format!("serialization failed: {e}")}).to_string()
        })
    }

    /// Output any serializable data as JSON to stdout.
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        let json = self.render(data);
        trace!(json_len = json.len(), "JSON serialized");
        println!("{json}");
    }
}

/// JSON body for an error.
pub fn error_json(error: &MigrateError) -> serde_json::Value {
    json!({
        "error": true,
        "message": error.to_string(),
        "suggestion": error.suggestion(),
        "recoverable": error.is_user_recoverable(),
    })
}

/// JSON body describing the registry.
pub fn registry_json(registry: &SchemaRegistry) -> serde_json::Value {
    json!({
        "schemas": registry.iter().collect::<Vec<_>>(),
        "actions": Action::known_scopes(),
    })
}

impl Output for RobotOutput {
    fn success(&self, message: &str) {
        self.output_json(&json!({ "success": true, "message": message }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &MigrateError) {
        debug!(error = %error, "Robot: error");
        eprintln!("{}", self.render(&error_json(error)));
    }

    fn snapshot(&self, snapshot: &Snapshot) {
        self.output_json(&json!({
            "schema": snapshot.schema,
            "empty": snapshot.is_empty(),
            "snapshot": snapshot,
        }));
    }

    fn exported(&self, schema: SchemaVersion, path: Option<&Path>, document: &[u8]) {
        match path {
            Some(path) => self.output_json(&json!({
                "action": "exported",
                "schema": schema,
                "path": path.display().to_string(),
                "bytes": document.len(),
            })),
            // The document is already JSON; print it as-is.
            None => println!("{}", String::from_utf8_lossy(document)),
        }
    }

    #[instrument(skip(self, outcome))]
    fn outcome(&self, outcome: &Outcome) {
        debug!("Robot: outcome");
        self.output_json(outcome);
    }

    fn marker(&self, marker: Option<&VersionMarker>) {
        self.output_json(&json!({
            "marker": marker,
            "active": marker.and_then(VersionMarker::common_version),
        }));
    }

    fn token(&self, scope: &str, token: &str) {
        self.output_json(&json!({ "action": scope, "token": token }));
    }

    fn registry(&self, registry: &SchemaRegistry) {
        self.output_json(&registry_json(registry));
    }

    fn settings(&self, settings: &Settings) {
        self.output_json(&json!({
            "settings": settings,
            "auth": settings.secret.is_some(),
        }));
    }

    fn version_info(&self, info: &BuildInfo<'_>) {
        self.output_json(info);
    }

    fn quick_start(&self) {
        self.output_json(&json!({
            "name": "ccm",
            "description": "Snapshot, reset and switch Content Control configuration",
            "commands": {
                "show": "ccm show v1",
                "export": "ccm export v1 -o backup.json",
                "save": "ccm save v1",
                "load": "ccm load v1 [--file backup.json]",
                "delete": "ccm delete v2",
                "reset": "ccm reset",
                "activate": "ccm activate v2",
                "marker": "ccm marker set v2",
                "clear_upgrades": "ccm clear-upgrades",
                "token": "ccm token delete_v1",
            },
            "robot_flag": "--robot",
        }));
    }
}
