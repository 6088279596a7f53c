//! Validation for user-supplied snapshot uploads.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::snapshot::read_artifact;

/// Check an upload's name and content.
///
/// The name must end in `.json` (any case) and the content must parse as
/// JSON. Structure is checked later, when the document is loaded as a
/// particular schema.
pub fn validate_upload(file_name: &str, content: &[u8]) -> Result<Value> {
    let is_json = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(MigrateError::InvalidUpload(format!(
            "'{file_name}' is not a .json file"
        )));
    }

    let document: Value = serde_json::from_slice(content)
        .map_err(|e| MigrateError::InvalidUpload(format!("'{file_name}' is not valid JSON: {e}")))?;
    debug!(file_name, bytes = content.len(), "Upload accepted");
    Ok(document)
}

/// Read `path` and validate it as an upload.
pub fn read_upload(path: &Path) -> Result<Value> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content = read_artifact(path)?;
    validate_upload(&name, &content)
}
