//! Named administrative actions and their dispatcher.
//!
//! Every trigger surface funnels into [`Dispatcher::dispatch`], which checks
//! the caller's origin token, runs the matching controller workflow and
//! returns a serializable [`Outcome`].

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::controller::{
    ActivationOutcome, DeleteReport, MigrationController, SaveReceipt, SnapshotSource,
    VersionMarker,
};
use crate::error::{MigrateError, Result};
use crate::registry::SchemaVersion;
use crate::snapshot::ApplyReport;
use crate::store::HostStore;
use crate::upload::read_upload;

/// A state-changing administrative action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Capture and return a snapshot without writing it anywhere.
    Export(SchemaVersion),
    /// Capture and write a snapshot; `None` uses the last-saved location.
    Save {
        schema: SchemaVersion,
        destination: Option<PathBuf>,
    },
    /// Reset all data, then load the last saved snapshot or an upload.
    Load {
        schema: SchemaVersion,
        upload: Option<PathBuf>,
    },
    /// Delete one version's data.
    Delete(SchemaVersion),
    /// Delete every version's data.
    Reset,
    /// Forget which upgrade routines have run.
    ClearUpgradeHistory,
    /// Switch the active plugin.
    Activate(SchemaVersion),
    /// Point every data category at one version.
    SetMarker(SchemaVersion),
}

impl Action {
    /// Authorization scope; tokens are issued per scope.
    pub fn scope(&self) -> String {
        match self {
            Self::Export(v) => format!("export_{v}"),
            Self::Save { schema, .. } => format!("save_{schema}"),
            Self::Load { schema, .. } => format!("load_{schema}"),
            Self::Delete(v) => format!("delete_{v}"),
            Self::Reset => "reset".to_string(),
            Self::ClearUpgradeHistory => "clear_upgrade_history".to_string(),
            Self::Activate(v) => format!("activate_{v}"),
            Self::SetMarker(v) => format!("set_marker_{v}"),
        }
    }

    /// Every scope a token can be issued for.
    pub fn known_scopes() -> Vec<String> {
        let mut scopes = Vec::new();
        for v in SchemaVersion::ALL {
            scopes.extend([
                Self::Export(v).scope(),
                Self::Save {
                    schema: v,
                    destination: None,
                }
                .scope(),
                Self::Load {
                    schema: v,
                    upload: None,
                }
                .scope(),
                Self::Delete(v).scope(),
                Self::Activate(v).scope(),
                Self::SetMarker(v).scope(),
            ]);
        }
        scopes.push(Self::Reset.scope());
        scopes.push(Self::ClearUpgradeHistory.scope());
        scopes
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scope())
    }
}

/// Issues and checks proof-of-origin tokens.
///
/// A token is `hex(sha256(secret ":" scope))`. Without a secret the guard
/// is open and every call is allowed.
#[derive(Debug, Clone, Default)]
pub struct OriginGuard {
    secret: Option<String>,
}

impl OriginGuard {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// A guard that allows everything.
    pub const fn open() -> Self {
        Self { secret: None }
    }

    pub const fn is_enforced(&self) -> bool {
        self.secret.is_some()
    }

    /// Issue the token for `scope`.
    pub fn issue(&self, scope: &str) -> Result<String> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            MigrateError::Authorization("no secret configured, tokens are not required".into())
        })?;
        if !Action::known_scopes().iter().any(|s| s == scope) {
            return Err(MigrateError::Authorization(format!("unknown action '{scope}'")));
        }
        Ok(digest(secret, scope))
    }

    /// Check `token` against `scope`.
    pub fn verify(&self, scope: &str, token: Option<&str>) -> Result<()> {
        let Some(secret) = self.secret.as_deref() else {
            return Ok(());
        };
        let Some(token) = token else {
            return Err(MigrateError::Authorization(format!(
                "a token is required for '{scope}'"
            )));
        };
        if !constant_time_eq(digest(secret, scope).as_bytes(), token.trim().as_bytes()) {
            return Err(MigrateError::Authorization(format!(
                "token is not valid for '{scope}'"
            )));
        }
        debug!(scope, "Origin token accepted");
        Ok(())
    }
}

fn digest(secret: &str, scope: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(scope.as_bytes());
    hex::encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// What a dispatched action did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Outcome {
    Exported {
        schema: SchemaVersion,
        #[serde(skip)]
        document: Vec<u8>,
    },
    Saved(SaveReceipt),
    Loaded {
        schema: SchemaVersion,
        reset: Vec<DeleteReport>,
        applied: ApplyReport,
    },
    Deleted {
        report: DeleteReport,
        marker: Option<VersionMarker>,
    },
    Reset {
        reports: Vec<DeleteReport>,
    },
    UpgradeHistoryCleared {
        existed: bool,
    },
    Activated(ActivationOutcome),
    MarkerSet {
        marker: VersionMarker,
    },
}

/// Runs [`Action`]s against a controller after checking authorization.
pub struct Dispatcher<'a, S: HostStore + ?Sized> {
    controller: MigrationController<'a, S>,
    guard: &'a OriginGuard,
    data_dir: PathBuf,
}

impl<'a, S: HostStore + ?Sized> Dispatcher<'a, S> {
    /// `data_dir` holds the last-saved snapshot of each version.
    pub fn new(
        controller: MigrationController<'a, S>,
        guard: &'a OriginGuard,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            controller,
            guard,
            data_dir: data_dir.into(),
        }
    }

    /// Last-saved snapshot location for `schema`.
    pub fn snapshot_path(&self, schema: SchemaVersion) -> PathBuf {
        self.data_dir.join(schema.snapshot_file_name())
    }

    /// Access the controller for read-only inspection.
    pub fn controller(&mut self) -> &mut MigrationController<'a, S> {
        &mut self.controller
    }

    /// Authorize and run `action`.
    ///
    /// Authorization failures return before any store access.
    #[instrument(skip(self, token), fields(action = %action))]
    pub fn dispatch(&mut self, action: Action, token: Option<&str>) -> Result<Outcome> {
        self.guard.verify(&action.scope(), token)?;

        let outcome = match action {
            Action::Export(schema) => Outcome::Exported {
                schema,
                document: self.controller.export_snapshot(schema)?,
            },
            Action::Save {
                schema,
                destination,
            } => {
                let path = destination.unwrap_or_else(|| self.snapshot_path(schema));
                Outcome::Saved(self.controller.save_snapshot(schema, &path)?)
            }
            Action::Load { schema, upload } => {
                let source = match upload {
                    Some(path) => SnapshotSource::Inline(read_upload(&path)?),
                    None => SnapshotSource::File(self.snapshot_path(schema)),
                };
                // Resolve before resetting so a bad source leaves the store untouched.
                let snapshot = self.controller.resolve_snapshot(schema, source)?;
                let reset = self.controller.reset_all()?;
                let applied = self.controller.apply_snapshot(&snapshot)?;
                Outcome::Loaded {
                    schema,
                    reset,
                    applied,
                }
            }
            Action::Delete(schema) => {
                let report = self.controller.delete_schema_data(schema)?;
                let marker = if schema == SchemaVersion::V1 {
                    let marker = VersionMarker::uniform(SchemaVersion::V2);
                    self.controller.set_active_version(marker)?;
                    Some(marker)
                } else {
                    None
                };
                Outcome::Deleted { report, marker }
            }
            Action::Reset => Outcome::Reset {
                reports: self.controller.reset_all()?,
            },
            Action::ClearUpgradeHistory => Outcome::UpgradeHistoryCleared {
                existed: self.controller.clear_completed_upgrades()?,
            },
            Action::Activate(schema) => Outcome::Activated(self.controller.activate(schema)?),
            Action::SetMarker(schema) => {
                let marker = VersionMarker::uniform(schema);
                self.controller.set_active_version(marker)?;
                Outcome::MarkerSet { marker }
            }
        };

        info!("Action completed");
        Ok(outcome)
    }
}
