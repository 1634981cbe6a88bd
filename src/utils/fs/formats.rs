//! JSON file helpers.

use crate::core::file_error::{FileOperation, FileResultExt};
use anyhow::{Context, Result};
use std::path::Path;

/// Read a UTF-8 text file with file-operation context on failure.
pub fn read_text_file(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path).with_file_context(
        FileOperation::Read,
        path,
        "reading text file",
        "utils::fs::formats::read_text_file",
    )?)
}

/// Read and deserialize a JSON file.
pub fn read_json_file<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = read_text_file(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from file: {}", path.display()))
}

/// Serialize and atomically write a JSON file.
///
/// Pretty output ends with a trailing newline so the file diffs cleanly.
pub fn write_json_file<T>(path: &Path, data: &T, pretty: bool) -> Result<()>
where
    T: serde::Serialize,
{
    let json = if pretty {
        let mut s = serde_json::to_string_pretty(data)?;
        s.push('\n');
        s
    } else {
        serde_json::to_string(data)?
    };

    super::atomic::safe_write(path, &json)
        .with_context(|| format!("Failed to write JSON file: {}", path.display()))
}
