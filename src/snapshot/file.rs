//! Snapshot file artifacts.
//!
//! Writes go to a hidden temp file beside the destination and are renamed
//! into place, so a reader never sees a half-written snapshot and a failed
//! write leaves the previous file intact.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::error::{MigrateError, Result};

/// Temp path in the destination's directory (same filesystem for rename).
fn temp_path_for(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("snapshot");
    let tmp = format!(".{name}.tmp.{}", std::process::id());
    match destination.parent() {
        Some(parent) => parent.join(tmp),
        None => PathBuf::from(tmp),
    }
}

/// Atomically replace `destination` with `contents`.
///
/// Missing parent directories are created.
#[instrument(skip(contents), fields(path = %destination.display(), bytes = contents.len()))]
pub fn atomic_write(destination: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| MigrateError::io(parent, e))?;
    }

    let temp_path = temp_path_for(destination);
    if let Err(e) = fs::write(&temp_path, contents) {
        discard(&temp_path);
        return Err(MigrateError::io(destination, e));
    }

    if let Err(e) = fs::rename(&temp_path, destination) {
        discard(&temp_path);
        return Err(MigrateError::io(destination, e));
    }

    debug!("Snapshot file written");
    Ok(())
}

fn discard(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %temp_path.display(), error = %e, "Failed to remove temp file");
        }
    }
}

/// Read a snapshot artifact.
#[instrument(fields(path = %source.display()))]
pub fn read_artifact(source: &Path) -> Result<Vec<u8>> {
    let bytes = fs::read(source).map_err(|e| MigrateError::io(source, e))?;
    debug!(bytes = bytes.len(), "Snapshot file read");
    Ok(bytes)
}
