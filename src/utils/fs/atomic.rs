//! Atomic file writes.
//!
//! Content is written to a temporary file in the destination directory, synced,
//! and renamed over the target, so readers never observe a half-written file.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Write `content` to `path` atomically, creating parent directories as needed.
///
/// An existing file is replaced.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let temp = write_temp_sibling(path, content)?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;
    Ok(())
}

/// Convenience wrapper over [`atomic_write`] for text.
pub fn safe_write(path: &Path, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Write `content` to `path` only if nothing exists there yet.
///
/// Returns `Ok(true)` when this call created the file and `Ok(false)` when another
/// writer got there first. Losing that race is not an error: entries written this way
/// are immutable, so both writers hold the same bytes.
pub fn write_once(path: &Path, content: &[u8]) -> Result<bool> {
    let temp = write_temp_sibling(path, content)?;
    match temp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error)
            .with_context(|| format!("Failed to move temp file into place: {}", path.display())),
    }
}

fn write_temp_sibling(path: &Path, content: &[u8]) -> Result<tempfile::NamedTempFile> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("Failed to write temp file for: {}", path.display()))?;
    temp.as_file().sync_all().with_context(|| "Failed to sync file to disk")?;
    Ok(temp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parent() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("deep").join("nested").join("atomic.txt");

        atomic_write(&file, b"nested content").unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "nested content");
    }

    #[test]
    fn test_atomic_write_overwrites() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("atomic.txt");

        atomic_write(&file, b"initial").unwrap();
        safe_write(&file, "updated").unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "updated");

        // No temp files left behind
        let entries: Vec<_> = std::fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_once_keeps_first_writer() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("entry");

        assert!(write_once(&file, b"first").unwrap());
        assert!(!write_once(&file, b"second").unwrap());
        assert_eq!(std::fs::read(&file).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_concurrent_write_once() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("a").join("entry");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let file = file.clone();
            handles.push(tokio::task::spawn_blocking(move || write_once(&file, b"same")));
        }
        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(std::fs::read(&file).unwrap(), b"same");
    }
}
