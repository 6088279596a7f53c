//! Human-friendly output implementation using console.

use std::path::Path;

use console::{Style, style};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::actions::Outcome;
use crate::config::Settings;
use crate::controller::{DeleteReport, VersionMarker};
use crate::error::MigrateError;
use crate::registry::{SchemaRegistry, SchemaVersion};
use crate::snapshot::Snapshot;

use super::{BuildInfo, Output};

/// Styled terminal output implementation for human users.
pub struct HumanOutput {
    label: Style,
    muted: Style,
}

impl HumanOutput {
    #[instrument]
    pub fn new(color: bool) -> Self {
        debug!(color, "Creating HumanOutput");
        // Otherwise console decides per stream from the terminal.
        if !color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
        Self {
            label: Style::new().cyan().bold(),
            muted: Style::new().dim(),
        }
    }

    fn field(&self, name: &str, value: impl std::fmt::Display) {
        println!("  {} {value}", self.label.apply_to(format!("{name:<14}")));
    }

    fn section(&self, name: &str, map: &Map<String, Value>) {
        println!("{}", style(name).bold());
        if map.is_empty() {
            println!("  {}", self.muted.apply_to("(empty)"));
        }
        for (key, value) in map {
            self.field(key, compact(value));
        }
    }

    fn delete_line(&self, report: &DeleteReport) {
        let schema = report
            .schema
            .map_or_else(|| "?".to_string(), |s| s.to_string());
        println!(
            "  {} {} keys, {} content items, {} log files",
            self.label.apply_to(format!("{schema:<14}")),
            report.keys_removed,
            report.items_removed,
            report.logs_removed
        );
    }
}

fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        other => other.to_string(),
    }
}

fn marker_line(marker: &VersionMarker) -> String {
    format!(
        "settings={} restrictions={} user_meta={} plugin_meta={}",
        marker.settings, marker.restrictions, marker.user_meta, marker.plugin_meta
    )
}

impl Output for HumanOutput {
    fn success(&self, message: &str) {
        println!("{} {message}", style("[OK]").green().bold());
    }

    #[instrument(skip(self))]
    fn error(&self, error: &MigrateError) {
        debug!(error = %error, recoverable = error.is_user_recoverable(), "Outputting error");
        eprintln!("{} {}", style("[ERR]").red().bold().for_stderr(), style(error).bold().for_stderr());
        if let Some(suggestion) = error.suggestion() {
            eprintln!("      {}", style(suggestion).dim().for_stderr());
        }
    }

    fn snapshot(&self, snapshot: &Snapshot) {
        println!(
            "{} {}",
            style(format!("Snapshot {}", snapshot.schema)).bold().underlined(),
            if snapshot.is_empty() {
                self.muted.apply_to("(empty)").to_string()
            } else {
                String::new()
            }
        );
        self.section("settings", &snapshot.settings);
        self.section("user_meta", &snapshot.user_meta);
        self.section("plugin_meta", &snapshot.plugin_meta);
    }

    fn exported(&self, schema: SchemaVersion, path: Option<&Path>, document: &[u8]) {
        match path {
            Some(path) => self.success(&format!(
                "Exported {schema} to {} ({} bytes)",
                path.display(),
                document.len()
            )),
            None => println!("{}", String::from_utf8_lossy(document)),
        }
    }

    fn outcome(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Exported { schema, document } => self.exported(*schema, None, document),
            Outcome::Saved(receipt) => self.success(&format!(
                "Saved {} to {} ({} bytes, {})",
                receipt.schema,
                receipt.path.display(),
                receipt.bytes,
                receipt.saved_at.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            Outcome::Loaded {
                schema,
                reset,
                applied,
            } => {
                self.success(&format!(
                    "Loaded {schema}: {} keys written, {} empty user meta skipped",
                    applied.written.len(),
                    applied.skipped.len()
                ));
                println!("{}", self.muted.apply_to("Cleared before loading:"));
                for report in reset {
                    self.delete_line(report);
                }
            }
            Outcome::Deleted { report, marker } => {
                self.success("Deleted schema data");
                self.delete_line(report);
                if let Some(marker) = marker {
                    self.field("marker", marker_line(marker));
                }
            }
            Outcome::Reset { reports } => {
                self.success("All schema data deleted");
                for report in reports {
                    self.delete_line(report);
                }
            }
            Outcome::UpgradeHistoryCleared { existed } => {
                if *existed {
                    self.success("Upgrade history cleared");
                } else {
                    self.success("No upgrade history recorded");
                }
            }
            Outcome::Activated(activation) => {
                self.success(&format!("Activated {}", activation.plugin));
                self.field("settings page", &activation.settings_page);
                self.field("active", activation.active_plugins.join(", "));
            }
            Outcome::MarkerSet { marker } => {
                self.success("Version marker written");
                self.field("marker", marker_line(marker));
            }
        }
    }

    fn marker(&self, marker: Option<&VersionMarker>) {
        match marker {
            Some(marker) => {
                let active = marker
                    .common_version()
                    .map_or_else(|| "mixed".to_string(), |v| v.to_string());
                self.field("active", active);
                self.field("marker", marker_line(marker));
            }
            None => println!("{}", self.muted.apply_to("No version marker stored")),
        }
    }

    fn token(&self, scope: &str, token: &str) {
        println!("{} {}", self.muted.apply_to(format!("{scope}:")), token);
    }

    fn registry(&self, registry: &SchemaRegistry) {
        for def in registry.iter() {
            println!("{}", style(format!("Schema {}", def.version)).bold().underlined());
            self.field("settings", def.settings_key);
            self.field("user meta", def.user_keys.join(", "));
            self.field("install meta", def.install_keys.join(", "));
            self.field("purge", def.purge_keys.join(", "));
            self.field("site options", def.site_option_keys.join(", "));
            self.field("transients", def.transient_keys.join(", "));
            self.field("content types", def.content_types.join(", "));
            self.field("plugin", def.plugin.basename);
            println!();
        }
    }

    fn settings(&self, settings: &Settings) {
        let source = settings
            .source
            .as_ref()
            .map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string());
        self.field("config", source);
        self.field("database", settings.database.display());
        self.field("data dir", settings.data_dir.display());
        self.field("log dir", settings.log_dir.display());
        self.field("user id", settings.user_id);
        self.field("auth", if settings.secret.is_some() { "token required" } else { "open" });
    }

    fn version_info(&self, info: &BuildInfo<'_>) {
        self.field("Version", info.version);
        if let Some(sha) = info.git_sha {
            let dirty = if info.git_dirty { " (dirty)" } else { "" };
            self.field("Git SHA", format!("{sha}{}", style(dirty).yellow()));
        }
        if let Some(time) = info.build_timestamp {
            self.field("Built", self.muted.apply_to(time));
        }
        if let Some(rustc) = info.rustc_version {
            self.field("Rustc", rustc);
        }
        if let Some(target) = info.target {
            self.field("Target", target);
        }
    }

    fn quick_start(&self) {
        println!("{}", style("ccm - Content Control configuration snapshots").bold());
        println!();
        let rows = [
            ("ccm show v1", "Print the current v1 configuration"),
            ("ccm save v1", "Save v1 to the data directory"),
            ("ccm load v1", "Reset, then load the last saved v1 snapshot"),
            ("ccm load v2 --file x.json", "Reset, then load an uploaded snapshot"),
            ("ccm delete v2", "Delete v2 data and restriction items"),
            ("ccm reset", "Delete all v1 and v2 data"),
            ("ccm activate v2", "Switch the active plugin"),
            ("ccm marker set v2", "Point every data category at v2"),
        ];
        for (cmd, what) in rows {
            println!("  {}  {}", style(format!("{cmd:<28}")).green(), what);
        }
        println!();
        println!("{}", self.muted.apply_to("Use --robot for JSON output."));
    }
}
