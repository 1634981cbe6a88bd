//! Fetching and caching of `registry/index.json`.

use anyhow::Result;

use crate::constants::REGISTRY_INDEX_PATH;
use crate::core::GreaterError;
use crate::fetcher::{ContentSource, Fetcher};

use super::RegistryIndex;

/// Options for [`RegistryClient::fetch_registry_index`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchIndexOptions {
    /// Ignore a cached index and fetch again (online only)
    pub refresh: bool,
}

/// Reads the registry index through a [`Fetcher`], caching it per resolved ref.
pub struct RegistryClient<'a, S> {
    fetcher: &'a Fetcher<S>,
}

impl<'a, S: ContentSource> RegistryClient<'a, S> {
    /// Client sharing `fetcher`'s source, cache, and offline flag.
    pub fn new(fetcher: &'a Fetcher<S>) -> Self {
        Self {
            fetcher,
        }
    }

    /// The index at `git_ref`.
    ///
    /// Floating refs are resolved first so the cache is keyed by commit. Offline, a
    /// missing cached index is an error; online, a failed fetch is an error and a
    /// stale index is never substituted.
    pub async fn fetch_registry_index(
        &self,
        git_ref: &str,
        options: FetchIndexOptions,
    ) -> Result<RegistryIndex> {
        let resolved = self.fetcher.resolve_ref_for_fetch(git_ref).await.map_err(|e| {
            GreaterError::RegistryIndexError {
                reason: format!("cannot resolve ref '{git_ref}': {e}"),
            }
        })?;
        let cache = self.fetcher.cache();
        let use_cache = self.fetcher.uses_cache();

        if use_cache
            && (!options.refresh || self.fetcher.is_offline())
            && let Some(bytes) = cache.read_index(&resolved).await?
        {
            match RegistryIndex::from_json(&bytes) {
                Ok(index) => {
                    tracing::debug!(
                        target: "registry",
                        "Using cached index for {} ({})",
                        git_ref,
                        resolved
                    );
                    return Ok(index);
                }
                Err(e) if self.fetcher.is_offline() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        target: "registry",
                        "Ignoring unreadable cached index for {}: {}",
                        resolved,
                        e
                    );
                }
            }
        }

        if use_cache && self.fetcher.is_offline() {
            return Err(GreaterError::RegistryIndexError {
                reason: format!("offline and no registry index is cached for '{git_ref}'"),
            }
            .into());
        }

        tracing::info!(target: "registry", "Fetching registry index at {}", git_ref);
        let bytes = self
            .fetcher
            .source()
            .fetch_file(&resolved, REGISTRY_INDEX_PATH)
            .await
            .map_err(|e| GreaterError::RegistryIndexError {
                reason: format!("failed to fetch {REGISTRY_INDEX_PATH} at '{git_ref}': {e}"),
            })?;
        let index = RegistryIndex::from_json(&bytes)?;

        if index.git_ref != git_ref && index.git_ref != resolved {
            tracing::debug!(
                target: "registry",
                "Index declares ref {} but was fetched at {}",
                index.git_ref,
                git_ref
            );
        }

        if use_cache && let Err(e) = cache.write_index(&resolved, &bytes).await {
            tracing::warn!(
                target: "registry",
                "Could not cache registry index for {}: {}",
                resolved,
                e
            );
        }
        Ok(index)
    }

    /// Drop the cached index and files of `git_ref`. Returns whether anything was removed.
    pub async fn clear_registry_cache(&self, git_ref: &str) -> Result<bool> {
        self.fetcher.cache().clear_ref(git_ref).await
    }

    /// Drop the whole cache.
    pub async fn clear_all_registry_cache(&self) -> Result<()> {
        self.fetcher.cache().clear_all().await
    }
}
