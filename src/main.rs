//! ccm - snapshot, reset and switch Content Control configuration.
//!
//! Provides both human-friendly and script-friendly (robot mode) interfaces.
#![forbid(unsafe_code)]

use std::io;

use clap::{CommandFactory, Parser};
use tracing::debug;

use ccm::actions::{Action, Dispatcher, OriginGuard, Outcome};
use ccm::cli::{self, Cli, Commands, MarkerCommand};
use ccm::config::{Overrides, Settings};
use ccm::controller::{LogDirCleanup, MigrationController};
use ccm::error::{MigrateError, Result};
use ccm::logging::init_logging;
use ccm::output::{BuildInfo, Output, OutputMode};
use ccm::registry::SchemaRegistry;
use ccm::snapshot::atomic_write;
use ccm::store::HostDb;

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> Option<&'static str> {
        option_env!("VERGEN_GIT_SHA")
    }

    pub fn git_dirty() -> bool {
        matches!(option_env!("VERGEN_GIT_DIRTY"), Some("true"))
    }

    pub fn build_timestamp() -> Option<&'static str> {
        option_env!("VERGEN_BUILD_TIMESTAMP")
    }

    pub fn rustc_semver() -> Option<&'static str> {
        option_env!("VERGEN_RUSTC_SEMVER")
    }

    pub fn target() -> Option<&'static str> {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE")
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.use_json(), cli.verbose, cli.quiet);

    let output = OutputMode::from_cli(&cli).into_output();

    if let Err(e) = run(&cli, output.as_ref()) {
        output.error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli, out: &dyn Output) -> Result<()> {
    let Some(command) = &cli.command else {
        out.quick_start();
        return Ok(());
    };
    let context = || Context::load(cli);

    match command {
        Commands::Version => cmd_version(out),
        Commands::Completions(args) => {
            clap_complete::generate(args.shell, &mut Cli::command(), "ccm", &mut io::stdout());
        }
        Commands::Registry => out.registry(&SchemaRegistry::standard()),
        Commands::Config => out.settings(&context()?.settings),
        Commands::Token(args) => {
            let token = context()?.guard.issue(&args.action)?;
            out.token(&args.action, &token);
        }
        Commands::Show(args) => {
            let snapshot = context()?.with_dispatcher(|d| d.controller().capture(args.schema))?;
            out.snapshot(&snapshot);
        }
        Commands::Export(args) => cmd_export(cli, &context()?, args, out)?,
        Commands::Save(args) => {
            let action = Action::Save {
                schema: args.schema,
                destination: args.output.clone(),
            };
            out.outcome(&context()?.dispatch(cli, action)?);
        }
        Commands::Load(args) => {
            let action = Action::Load {
                schema: args.schema,
                upload: args.file.clone(),
            };
            out.outcome(&context()?.dispatch(cli, action)?);
        }
        Commands::Delete(args) => {
            out.outcome(&context()?.dispatch(cli, Action::Delete(args.schema))?);
        }
        Commands::Reset => out.outcome(&context()?.dispatch(cli, Action::Reset)?),
        Commands::ClearUpgrades => {
            out.outcome(&context()?.dispatch(cli, Action::ClearUpgradeHistory)?);
        }
        Commands::Activate(args) => {
            out.outcome(&context()?.dispatch(cli, Action::Activate(args.schema))?);
        }
        Commands::Marker(args) => match &args.command {
            None | Some(MarkerCommand::Show) => {
                let marker = context()?.with_dispatcher(|d| d.controller().active_version())?;
                out.marker(marker.as_ref());
            }
            Some(MarkerCommand::Set(set)) => {
                out.outcome(&context()?.dispatch(cli, Action::SetMarker(set.schema))?);
            }
        },
    }
    Ok(())
}

/// Everything a command needs besides its own arguments.
struct Context {
    settings: Settings,
    registry: SchemaRegistry,
    guard: OriginGuard,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let settings = Settings::resolve(&Overrides {
            config: cli.config.clone(),
            database: cli.db.clone(),
        })?;
        let guard = OriginGuard::new(settings.secret.clone());
        Ok(Self {
            settings,
            registry: SchemaRegistry::standard(),
            guard,
        })
    }

    fn open_db(&self) -> Result<HostDb> {
        HostDb::open(&self.settings.database)
    }

    /// Open the host database and run `f` with a dispatcher over it.
    fn with_dispatcher<T>(
        &self,
        f: impl FnOnce(&mut Dispatcher<'_, HostDb>) -> Result<T>,
    ) -> Result<T> {
        let mut db = self.open_db()?;
        let controller = MigrationController::new(&mut db, &self.registry, self.settings.user_id)
            .with_log_cleanup(Box::new(LogDirCleanup::new(&self.settings.log_dir)));
        let mut dispatcher = Dispatcher::new(controller, &self.guard, &self.settings.data_dir);
        f(&mut dispatcher)
    }

    fn dispatch(&self, cli: &Cli, action: Action) -> Result<Outcome> {
        debug!(action = %action, "Dispatching from CLI");
        self.with_dispatcher(|d| d.dispatch(action, cli.token.as_deref()))
    }
}

fn cmd_export(cli: &Cli, ctx: &Context, args: &cli::ExportArgs, out: &dyn Output) -> Result<()> {
    let outcome = ctx.dispatch(cli, Action::Export(args.schema))?;
    let Outcome::Exported { schema, document } = outcome else {
        return Err(MigrateError::Other("unexpected outcome for export".to_string()));
    };

    if let Some(path) = &args.output {
        atomic_write(path, &document)?;
    }
    out.exported(schema, args.output.as_deref(), &document);
    Ok(())
}

fn cmd_version(out: &dyn Output) {
    out.version_info(&BuildInfo {
        version: build_info::VERSION,
        git_sha: build_info::git_sha(),
        git_dirty: build_info::git_dirty(),
        build_timestamp: build_info::build_timestamp(),
        rustc_version: build_info::rustc_semver(),
        target: build_info::target(),
    });
}
