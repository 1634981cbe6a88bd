//! Content-addressed cache of fetched registry content.
//!
//! The cache is an explicit value ([`CacheStore`]) whose root is injected by the
//! caller, so tests and concurrent invocations never share hidden state.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── files/<ref-key>/<virtual path>   # raw fetched bytes, one file per artifact
//! ├── index/<ref-key>.json             # raw registry index fetched at that ref
//! └── refs.json                        # floating ref -> last resolved commit
//! ```
//!
//! Entries are keyed by an immutable ref (commit SHA or release tag) and written
//! exactly once. Writes go through a temp file and an atomic rename; when two
//! writers race on the same key the loser's rename is discarded and both succeed.
//!
//! `refs.json` is only consulted in offline mode, where the network cannot tell
//! us what a branch points at any more.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

use crate::core::GreaterError;
use crate::utils::fs::{atomic_write, get_directory_size, write_once};
use crate::utils::path_validation::resolve_path_within_dir;

const FILES_DIR: &str = "files";
const INDEX_DIR: &str = "index";
const REFS_FILE: &str = "refs.json";

/// Last commit a floating ref resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefPointer {
    /// Commit SHA
    pub commit: String,
    /// When the resolution happened
    pub resolved_at: DateTime<Utc>,
}

/// Summary of one cached ref, for `cache info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRef {
    /// Directory key of the ref
    pub key: String,
    /// Number of cached content files
    pub files: usize,
    /// Whether the registry index is cached too
    pub has_index: bool,
}

/// Turn a ref into a directory name.
///
/// Safe characters (`[A-Za-z0-9._-]`) are kept. If anything had to be replaced, or
/// the result could be mistaken for `.`/`..`, an 8-hex digest of the original ref is
/// appended so that distinct refs never collide.
pub fn ref_key(git_ref: &str) -> String {
    let mut replaced = false;
    let mut key: String = git_ref
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                replaced = true;
                '_'
            }
        })
        .collect();

    if replaced || key.is_empty() || key.starts_with('.') {
        let digest = crate::integrity::compute_checksum(git_ref.as_bytes());
        let suffix = &digest["sha256:".len().."sha256:".len() + 8];
        key = format!("{}-{suffix}", key.trim_start_matches('.'));
    }
    key
}

/// On-disk cache rooted at an explicit directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Cache rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Cache rooted at `GREATER_CACHE_DIR` or `~/.greater/cache`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(crate::utils::platform::get_cache_dir()?))
    }

    /// The cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ref_dir(&self, git_ref: &str) -> PathBuf {
        self.root.join(FILES_DIR).join(ref_key(git_ref))
    }

    fn index_path(&self, git_ref: &str) -> PathBuf {
        self.root.join(INDEX_DIR).join(format!("{}.json", ref_key(git_ref)))
    }

    fn refs_path(&self) -> PathBuf {
        self.root.join(REFS_FILE)
    }

    /// Path where the content of `path` at `git_ref` lives (or would live).
    ///
    /// Fails with a path-traversal error when `path` is not a safe relative path.
    pub fn cached_file_path(&self, git_ref: &str, path: &str) -> Result<PathBuf> {
        resolve_path_within_dir(&self.ref_dir(git_ref), path)
    }

    /// Whether content for `(git_ref, path)` is cached.
    pub async fn is_cached(&self, git_ref: &str, path: &str) -> bool {
        match self.cached_file_path(git_ref, path) {
            Ok(p) => async_fs::metadata(&p).await.map(|m| m.is_file()).unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Cache status of every path, keyed by path.
    pub async fn cache_status(&self, git_ref: &str, paths: &[String]) -> HashMap<String, bool> {
        let mut status = HashMap::with_capacity(paths.len());
        for path in paths {
            status.insert(path.clone(), self.is_cached(git_ref, path).await);
        }
        status
    }

    /// Cached bytes for `(git_ref, path)`, `None` on a miss.
    pub async fn read(&self, git_ref: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let file = self.cached_file_path(git_ref, path)?;
        crate::core::file_error::read_optional(&file, "reading cached content", "cache::read")
            .await
            .map_err(|e| cache_error("reading", &file, e))
    }

    /// Store bytes for `(git_ref, path)`. Existing entries are left untouched.
    pub async fn write(&self, git_ref: &str, path: &str, content: &[u8]) -> Result<()> {
        let file = self.cached_file_path(git_ref, path)?;
        self.write_entry(file, content.to_vec()).await
    }

    /// Drop the cached entry for `(git_ref, path)`, if any.
    pub async fn remove(&self, git_ref: &str, path: &str) -> Result<()> {
        let file = self.cached_file_path(git_ref, path)?;
        match async_fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(cache_error("removing", &file, e)),
        }
    }

    async fn write_entry(&self, file: PathBuf, content: Vec<u8>) -> Result<()> {
        let target = file.clone();
        let created = tokio::task::spawn_blocking(move || write_once(&target, &content))
            .await
            .context("Cache write task panicked")?
            .map_err(|e| cache_error("writing", &file, e))?;
        tracing::debug!(target: "cache", "Cached {} (new: {})", file.display(), created);
        Ok(())
    }

    /// Raw registry index cached for `git_ref`.
    pub async fn read_index(&self, git_ref: &str) -> Result<Option<Vec<u8>>> {
        let file = self.index_path(git_ref);
        crate::core::file_error::read_optional(
            &file,
            "reading cached registry index",
            "cache::read_index",
        )
        .await
        .map_err(|e| cache_error("reading", &file, e))
    }

    /// Store the raw registry index for `git_ref`.
    pub async fn write_index(&self, git_ref: &str, content: &[u8]) -> Result<()> {
        self.write_entry(self.index_path(git_ref), content.to_vec()).await
    }

    async fn load_pointers(&self) -> Result<BTreeMap<String, RefPointer>> {
        let path = self.refs_path();
        match crate::core::file_error::read_optional(&path, "reading ref pointers", "cache::refs")
            .await
            .map_err(|e| cache_error("reading", &path, e))?
        {
            Some(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(target: "cache", "Ignoring corrupt {}: {}", path.display(), e);
                BTreeMap::new()
            })),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Last commit recorded for a floating ref.
    pub async fn read_ref_pointer(&self, git_ref: &str) -> Result<Option<RefPointer>> {
        Ok(self.load_pointers().await?.remove(git_ref))
    }

    /// Record that `git_ref` currently resolves to `commit`.
    pub async fn record_ref_pointer(&self, git_ref: &str, commit: &str) -> Result<()> {
        let mut pointers = self.load_pointers().await?;
        pointers.insert(
            git_ref.to_string(),
            RefPointer {
                commit: commit.to_string(),
                resolved_at: Utc::now(),
            },
        );
        let path = self.refs_path();
        let json = serde_json::to_vec_pretty(&pointers)?;
        tokio::task::spawn_blocking(move || atomic_write(&path, &json))
            .await
            .context("Ref pointer write task panicked")??;
        Ok(())
    }

    /// Remove everything cached for `git_ref`.
    ///
    /// A floating ref also drops its pointer and the entries of the commit it pointed
    /// at. Returns whether anything was removed.
    pub async fn clear_ref(&self, git_ref: &str) -> Result<bool> {
        let mut removed = self.remove_ref_entries(git_ref).await?;

        let mut pointers = self.load_pointers().await?;
        if let Some(pointer) = pointers.remove(git_ref) {
            removed |= self.remove_ref_entries(&pointer.commit).await?;
            let path = self.refs_path();
            let json = serde_json::to_vec_pretty(&pointers)?;
            tokio::task::spawn_blocking(move || atomic_write(&path, &json))
                .await
                .context("Ref pointer write task panicked")??;
            removed = true;
        }
        Ok(removed)
    }

    async fn remove_ref_entries(&self, git_ref: &str) -> Result<bool> {
        let mut removed = false;
        let dir = self.ref_dir(git_ref);
        if async_fs::metadata(&dir).await.is_ok() {
            async_fs::remove_dir_all(&dir).await.map_err(|e| cache_error("removing", &dir, e))?;
            removed = true;
        }
        let index = self.index_path(git_ref);
        if async_fs::metadata(&index).await.is_ok() {
            async_fs::remove_file(&index).await.map_err(|e| cache_error("removing", &index, e))?;
            removed = true;
        }
        Ok(removed)
    }

    /// Remove the whole cache.
    pub async fn clear_all(&self) -> Result<()> {
        if async_fs::metadata(&self.root).await.is_ok() {
            async_fs::remove_dir_all(&self.root)
                .await
                .map_err(|e| cache_error("clearing", &self.root, e))?;
        }
        Ok(())
    }

    /// Total bytes used by the cache.
    pub async fn size(&self) -> Result<u64> {
        get_directory_size(&self.root).await
    }

    /// Refs that have cached content or a cached index, sorted by key.
    pub async fn list_refs(&self) -> Result<Vec<CachedRef>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || list_refs_blocking(&root))
            .await
            .context("Cache listing task panicked")?
    }
}

fn list_refs_blocking(root: &Path) -> Result<Vec<CachedRef>> {
    let mut refs: BTreeMap<String, CachedRef> = BTreeMap::new();

    let files_dir = root.join(FILES_DIR);
    if files_dir.is_dir() {
        for entry in std::fs::read_dir(&files_dir)
            .with_context(|| format!("Failed to read {}", files_dir.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_string();
            let files = walkdir::WalkDir::new(entry.path())
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
                .count();
            refs.insert(
                key.clone(),
                CachedRef {
                    key,
                    files,
                    has_index: false,
                },
            );
        }
    }

    let index_dir = root.join(INDEX_DIR);
    if index_dir.is_dir() {
        for entry in std::fs::read_dir(&index_dir)
            .with_context(|| format!("Failed to read {}", index_dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(key) = name.strip_suffix(".json") {
                refs.entry(key.to_string())
                    .or_insert_with(|| CachedRef {
                        key: key.to_string(),
                        files: 0,
                        has_index: false,
                    })
                    .has_index = true;
            }
        }
    }

    Ok(refs.into_values().collect())
}

fn cache_error(operation: &str, path: &Path, error: impl std::fmt::Display) -> anyhow::Error {
    GreaterError::CacheError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        reason: error.to_string(),
    }
    .into()
}
