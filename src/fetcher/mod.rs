//! Cache-aware retrieval of registry content at a git ref.
//!
//! [`Fetcher`] sits between the installer and a [`ContentSource`]:
//!
//! 1. the requested ref is made immutable with [`Fetcher::resolve_ref_for_fetch`]
//!    (a branch is resolved to the commit it points at; tags and SHAs pass through)
//! 2. the cache is consulted under the immutable ref
//! 3. misses are fetched from the source and written back to the cache
//!
//! With an expected checksum ([`Fetcher::fetch_multiple_verified`]) only matching
//! bytes are cached, and a cached entry that fails the check is evicted and fetched
//! again, so one bad response never poisons an immutable ref.
//!
//! Floating refs are never used as cache keys, otherwise an update pushed to a
//! branch would stay invisible forever.
//!
//! # Offline mode
//!
//! With `offline` set no network request is made. Floating refs are resolved from
//! the pointer the cache recorded the last time they were resolved online, and any
//! cache miss is an error. The installer uses [`determine_fetch_strategy`] and
//! [`get_missing_from_cache`] to find every missing file before it writes anything.
//!
//! A local checkout source (`GREATER_LOCAL_REPO`) bypasses both ref resolution and
//! the cache.

pub mod source;

use anyhow::Result;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};

use crate::cache::CacheStore;
use crate::constants::DEFAULT_FETCH_CONCURRENCY;
use crate::core::GreaterError;
use crate::git::is_immutable_ref;
use crate::integrity::verify_checksum;

pub use source::{ContentSource, HttpSource, LocalRepoSource, RegistrySource};

/// How one requested file will be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Served from the cache
    UseCache,
    /// Fetched from the source
    Fetch,
    /// Not cached and the network may not be used
    Unavailable,
}

/// Planned strategy for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFetch {
    /// Registry-virtual path
    pub path: String,
    /// How it will be obtained
    pub strategy: FetchStrategy,
}

/// Decide, per requested file, whether to use the cache, fetch, or give up.
///
/// Pure: `cache_status` maps each path to whether it is cached; unknown paths count
/// as not cached. Output follows `requested` order.
pub fn determine_fetch_strategy(
    requested: &[String],
    cache_status: &HashMap<String, bool>,
    offline: bool,
) -> Vec<PlannedFetch> {
    requested
        .iter()
        .map(|path| {
            let cached = cache_status.get(path).copied().unwrap_or(false);
            let strategy = match (cached, offline) {
                (true, _) => FetchStrategy::UseCache,
                (false, false) => FetchStrategy::Fetch,
                (false, true) => FetchStrategy::Unavailable,
            };
            PlannedFetch {
                path: path.clone(),
                strategy,
            }
        })
        .collect()
}

/// Whether every requested file is cached.
pub fn can_serve_from_cache(requested: &[String], cache_status: &HashMap<String, bool>) -> bool {
    get_missing_from_cache(requested, cache_status).is_empty()
}

/// Requested files that are not cached, in request order.
pub fn get_missing_from_cache(
    requested: &[String],
    cache_status: &HashMap<String, bool>,
) -> Vec<String> {
    requested
        .iter()
        .filter(|path| !cache_status.get(*path).copied().unwrap_or(false))
        .cloned()
        .collect()
}

/// Result of a batch fetch: what arrived and what did not.
#[derive(Debug, Clone, Default)]
pub struct BatchFetch {
    /// Immutable ref the batch was fetched at
    pub resolved_ref: String,
    /// Content by virtual path
    pub contents: BTreeMap<String, Vec<u8>>,
    /// Failure reason by virtual path
    pub failures: BTreeMap<String, String>,
}

impl BatchFetch {
    /// Whether every file arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The contents, or [`GreaterError::FetchFailed`] naming every failed file.
    pub fn into_contents(self, requested_ref: &str) -> Result<BTreeMap<String, Vec<u8>>> {
        if self.failures.is_empty() {
            return Ok(self.contents);
        }
        Err(GreaterError::FetchFailed {
            git_ref: requested_ref.to_string(),
            failures: self
                .failures
                .into_iter()
                .map(|(path, reason)| format!("{path}: {reason}"))
                .collect(),
        }
        .into())
    }
}

/// Cache-aware fetcher over a [`ContentSource`].
pub struct Fetcher<S> {
    source: S,
    cache: CacheStore,
    offline: bool,
    concurrency: usize,
    resolved: DashMap<String, String>,
}

impl<S: ContentSource> Fetcher<S> {
    /// Fetcher over `source` using `cache`.
    pub fn new(source: S, cache: CacheStore) -> Self {
        Self {
            source,
            cache,
            offline: false,
            concurrency: DEFAULT_FETCH_CONCURRENCY,
            resolved: DashMap::new(),
        }
    }

    /// Never touch the network.
    #[must_use]
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Maximum number of concurrent fetches in a batch (at least 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The content source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The cache.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Whether offline mode is on.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Whether content can be cached (false for a local checkout).
    #[must_use]
    pub fn uses_cache(&self) -> bool {
        !self.source.is_local()
    }

    /// Whether the source answers right now. Always false offline.
    pub async fn is_network_available(&self) -> bool {
        !self.offline && self.source.is_reachable().await
    }

    /// Turn `git_ref` into a ref that is safe to use as a cache key.
    ///
    /// Immutable refs are returned unchanged. Floating refs are resolved through the
    /// source once per fetcher and the result is recorded for later offline use.
    pub async fn resolve_ref_for_fetch(&self, git_ref: &str) -> Result<String> {
        if is_immutable_ref(git_ref) || self.source.is_local() {
            return Ok(git_ref.to_string());
        }
        if let Some(sha) = self.resolved.get(git_ref) {
            return Ok(sha.clone());
        }

        let sha = if self.offline {
            match self.cache.read_ref_pointer(git_ref).await? {
                Some(pointer) => {
                    tracing::debug!(
                        target: "fetcher",
                        "Offline: {} -> {} (recorded {})",
                        git_ref,
                        pointer.commit,
                        pointer.resolved_at
                    );
                    pointer.commit
                }
                None => {
                    return Err(GreaterError::CacheError {
                        operation: "resolving offline".to_string(),
                        path: git_ref.to_string(),
                        reason: format!(
                            "'{git_ref}' is a floating ref that has never been resolved online; \
                             pin a tag or commit, or run once without --offline"
                        ),
                    }
                    .into());
                }
            }
        } else {
            let sha = self.source.resolve_ref(git_ref).await?;
            tracing::debug!(target: "fetcher", "Resolved {} -> {}", git_ref, sha);
            if let Err(e) = self.cache.record_ref_pointer(git_ref, &sha).await {
                tracing::warn!(
                    target: "fetcher",
                    "Could not record resolution of {}: {}",
                    git_ref,
                    e
                );
            }
            sha
        };

        self.resolved.insert(git_ref.to_string(), sha.clone());
        Ok(sha)
    }

    /// Whether `path` is cached under the immutable form of `git_ref`.
    pub async fn cache_status(
        &self,
        git_ref: &str,
        paths: &[String],
    ) -> Result<HashMap<String, bool>> {
        if !self.uses_cache() {
            return Ok(paths.iter().map(|p| (p.clone(), true)).collect());
        }
        let resolved = self.resolve_ref_for_fetch(git_ref).await?;
        Ok(self.cache.cache_status(&resolved, paths).await)
    }

    /// Content of `path` at `git_ref`.
    pub async fn fetch_file(&self, git_ref: &str, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve_ref_for_fetch(git_ref).await?;
        self.fetch_resolved(git_ref, &resolved, path, None).await
    }

    /// Content of `path` at `git_ref`, checked against `checksum` on the way.
    ///
    /// Only bytes matching `checksum` are cached. A cached entry that does not match
    /// is evicted and fetched again when online; offline it is returned as is so the
    /// caller can report the mismatch.
    pub async fn fetch_file_verified(
        &self,
        git_ref: &str,
        path: &str,
        checksum: &str,
    ) -> Result<Vec<u8>> {
        let resolved = self.resolve_ref_for_fetch(git_ref).await?;
        self.fetch_resolved(git_ref, &resolved, path, Some(checksum)).await
    }

    async fn fetch_resolved(
        &self,
        requested_ref: &str,
        resolved: &str,
        path: &str,
        checksum: Option<&str>,
    ) -> Result<Vec<u8>> {
        if !self.uses_cache() {
            return self.source.fetch_file(resolved, path).await;
        }

        if let Some(bytes) = self.cache.read(resolved, path).await? {
            let valid = checksum.is_none_or(|expected| verify_checksum(&bytes, expected));
            if valid || self.offline {
                tracing::debug!(target: "fetcher", "Cache hit: {}@{}", path, resolved);
                return Ok(bytes);
            }
            tracing::warn!(
                target: "fetcher",
                "Cached {}@{} does not match the registry checksum; fetching again",
                path,
                resolved
            );
            self.cache.remove(resolved, path).await?;
        } else if self.offline {
            return Err(GreaterError::MissingFromCache {
                git_ref: requested_ref.to_string(),
                files: vec![path.to_string()],
            }
            .into());
        }

        tracing::debug!(target: "fetcher", "Cache miss: {}@{}", path, resolved);
        let bytes = self.source.fetch_file(resolved, path).await?;
        if checksum.is_some_and(|expected| !verify_checksum(&bytes, expected)) {
            tracing::debug!(
                target: "fetcher",
                "Not caching {}@{}: checksum mismatch",
                path,
                resolved
            );
            return Ok(bytes);
        }
        if let Err(e) = self.cache.write(resolved, path, &bytes).await {
            tracing::warn!(target: "fetcher", "Could not cache {}@{}: {}", path, resolved, e);
        }
        Ok(bytes)
    }

    /// Fetch many files at one ref with bounded concurrency.
    ///
    /// Per-file failures are collected in [`BatchFetch::failures`]; only a failure to
    /// resolve the ref itself fails the call.
    pub async fn fetch_multiple(&self, git_ref: &str, paths: &[String]) -> Result<BatchFetch> {
        let files: Vec<(String, Option<String>)> =
            paths.iter().map(|p| (p.clone(), None)).collect();
        self.fetch_batch(git_ref, &files).await
    }

    /// [`Self::fetch_multiple`] over `(path, checksum)` pairs, with the caching rules of
    /// [`Self::fetch_file_verified`].
    pub async fn fetch_multiple_verified(
        &self,
        git_ref: &str,
        files: &[(String, String)],
    ) -> Result<BatchFetch> {
        let files: Vec<(String, Option<String>)> =
            files.iter().map(|(path, checksum)| (path.clone(), Some(checksum.clone()))).collect();
        self.fetch_batch(git_ref, &files).await
    }

    async fn fetch_batch(
        &self,
        git_ref: &str,
        files: &[(String, Option<String>)],
    ) -> Result<BatchFetch> {
        let resolved = self.resolve_ref_for_fetch(git_ref).await?;

        let results: Vec<(String, Result<Vec<u8>>)> = stream::iter(files.iter())
            .map(|(path, checksum)| {
                let resolved = resolved.as_str();
                async move {
                    let result =
                        self.fetch_resolved(git_ref, resolved, path, checksum.as_deref()).await;
                    (path.clone(), result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut batch = BatchFetch {
            resolved_ref: resolved.clone(),
            ..BatchFetch::default()
        };
        for (path, result) in results {
            match result {
                Ok(bytes) => {
                    batch.contents.insert(path, bytes);
                }
                Err(e) => {
                    tracing::debug!(target: "fetcher", "Failed to fetch {}: {:#}", path, e);
                    batch.failures.insert(path, e.to_string());
                }
            }
        }
        Ok(batch)
    }
}
