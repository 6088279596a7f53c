//! CLI argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::registry::SchemaVersion;

/// Content Control migration helper - snapshot, reset and switch plugin configuration.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "ccm", version, about, long_about = None)]
#[command(propagate_version = true)]
#[allow(clippy::struct_excessive_bools)] // CLI flags naturally use multiple bools
pub struct Cli {
    /// Output format (text for humans, json for scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "CCM_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose logging (repeat for more)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Config file (TOML or YAML)
    #[arg(long, short = 'c', global = true, env = "CCM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host database path
    #[arg(long, global = true, env = "CCM_DB")]
    pub db: Option<PathBuf>,

    /// Origin token for the requested action
    #[arg(long, global = true, env = "CCM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Schema version argument (`v1`, `v2`, `1` or `2`).
pub fn parse_schema(s: &str) -> Result<SchemaVersion, String> {
    s.parse().map_err(|e: crate::error::MigrateError| e.to_string())
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Snapshots ===
    /// Print the current configuration of a version
    Show(SchemaArgs),

    /// Export a version's configuration as JSON
    Export(ExportArgs),

    /// Save a version's configuration to the data directory
    Save(ExportArgs),

    /// Reset all data, then load a saved or uploaded snapshot
    Load(LoadArgs),

    // === Cleanup ===
    /// Delete every key and content item a version owns
    Delete(SchemaArgs),

    /// Delete data for all versions
    Reset,

    /// Forget which v2 upgrade routines have run
    #[command(visible_alias = "clear-upgrade-history")]
    ClearUpgrades,

    // === Versions ===
    /// Make a version's plugin the active one
    Activate(SchemaArgs),

    /// Show or set the data version marker
    Marker(MarkerArgs),

    // === Inspection ===
    /// List the keys each version owns
    Registry,

    /// Show resolved configuration
    Config,

    /// Issue an origin token for an action
    Token(TokenArgs),

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Schema version (v1 or v2)
    #[arg(value_parser = parse_schema)]
    pub schema: SchemaVersion,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Schema version (v1 or v2)
    #[arg(value_parser = parse_schema)]
    pub schema: SchemaVersion,

    /// Write to this file instead of the default location
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Schema version (v1 or v2)
    #[arg(value_parser = parse_schema)]
    pub schema: SchemaVersion,

    /// Uploaded snapshot (.json) instead of the last saved one
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MarkerArgs {
    #[command(subcommand)]
    pub command: Option<MarkerCommand>,
}

#[derive(Subcommand, Debug)]
pub enum MarkerCommand {
    /// Show the stored marker
    Show,
    /// Point every data category at a version
    Set(SchemaArgs),
}

#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Action scope, e.g. `delete_v1` or `reset`
    pub action: String,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
