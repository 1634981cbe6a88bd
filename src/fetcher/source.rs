//! Where registry content comes from.
//!
//! [`ContentSource`] is the seam between the fetcher and the outside world:
//! - [`HttpSource`] reads raw files over HTTPS and resolves branches with `git ls-remote`
//! - [`LocalRepoSource`] reads a local checkout of the component monorepo
//! - test doubles live in `test_utils`
//!
//! [`RegistrySource`] picks between the two real sources at runtime.

use anyhow::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;

use crate::constants::{
    HTTP_RETRY_ATTEMPTS, HTTP_RETRY_BASE_DELAY_MS, LOCAL_REPO_ENV, NETWORK_CHECK_TIMEOUT,
    REGISTRY_INDEX_PATH,
};
use crate::core::GreaterError;
use crate::utils::path_validation::resolve_path_within_dir;

/// A provider of file content at a git ref.
pub trait ContentSource: Send + Sync {
    /// Raw bytes of `path` at `git_ref`.
    fn fetch_file(&self, git_ref: &str, path: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Commit SHA a floating ref currently points at.
    fn resolve_ref(&self, git_ref: &str) -> impl Future<Output = Result<String>> + Send;

    /// Whether the source is reachable right now.
    fn is_reachable(&self) -> impl Future<Output = bool> + Send;

    /// Whether content is read from the local filesystem (and should bypass the cache).
    fn is_local(&self) -> bool;

    /// Human-readable description for logs and `doctor`.
    fn describe(&self) -> String;
}

enum AttemptError {
    Transient(String),
    Fatal(String),
}

/// Raw content over HTTPS: `GET <raw_base_url>/<ref>/<path>`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    raw_base_url: String,
    repository: String,
}

impl HttpSource {
    /// Build a source with a per-request `timeout`.
    pub fn new(
        raw_base_url: impl Into<String>,
        repository: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("greater/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| GreaterError::NetworkError {
                operation: "building HTTP client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            raw_base_url: raw_base_url.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
        })
    }

    fn url_for(&self, git_ref: &str, path: &str) -> String {
        format!("{}/{}/{}", self.raw_base_url, git_ref, path)
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>, AttemptError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                AttemptError::Transient(e.to_string())
            } else {
                AttemptError::Fatal(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AttemptError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(AttemptError::Fatal(format!("HTTP {status}")));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| AttemptError::Transient(e.to_string()))
    }
}

impl ContentSource for HttpSource {
    async fn fetch_file(&self, git_ref: &str, path: &str) -> Result<Vec<u8>> {
        let url = self.url_for(git_ref, path);
        tracing::debug!(target: "fetcher", "GET {}", url);

        // 200ms, 400ms, ...
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(HTTP_RETRY_BASE_DELAY_MS / 2)
            .max_delay(Duration::from_secs(2))
            .take(HTTP_RETRY_ATTEMPTS);

        RetryIf::spawn(
            strategy,
            || self.get_once(&url),
            |e: &AttemptError| match e {
                AttemptError::Transient(reason) => {
                    tracing::warn!(
                        target: "fetcher",
                        "Retrying {} after transient failure: {}",
                        url,
                        reason
                    );
                    true
                }
                AttemptError::Fatal(_) => false,
            },
        )
        .await
        .map_err(|e| {
            let reason = match e {
                AttemptError::Transient(r) | AttemptError::Fatal(r) => r,
            };
            GreaterError::NetworkError {
                operation: format!("fetching {url}"),
                reason,
            }
            .into()
        })
    }

    async fn resolve_ref(&self, git_ref: &str) -> Result<String> {
        crate::git::resolve_remote_ref(&self.repository, git_ref).await
    }

    async fn is_reachable(&self) -> bool {
        self.client
            .head(&self.raw_base_url)
            .timeout(NETWORK_CHECK_TIMEOUT)
            .send()
            .await
            .is_ok()
    }

    fn is_local(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        format!("{} (refs from {})", self.raw_base_url, self.repository)
    }
}

/// A local checkout of the component monorepo.
///
/// Whatever is checked out is served for every ref; refs are not resolved.
#[derive(Debug, Clone)]
pub struct LocalRepoSource {
    root: PathBuf,
}

impl LocalRepoSource {
    /// Use `root` when it looks like a registry checkout (`registry/index.json` exists).
    pub fn open(root: impl Into<PathBuf>) -> Option<Self> {
        let root = root.into();
        root.join(REGISTRY_INDEX_PATH).is_file().then_some(Self {
            root,
        })
    }

    /// The checkout root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentSource for LocalRepoSource {
    async fn fetch_file(&self, _git_ref: &str, path: &str) -> Result<Vec<u8>> {
        let file = resolve_path_within_dir(&self.root, path)?;
        tokio::fs::read(&file).await.map_err(|e| {
            GreaterError::NetworkError {
                operation: format!("reading {} from local checkout", file.display()),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn resolve_ref(&self, git_ref: &str) -> Result<String> {
        Ok(git_ref.to_string())
    }

    async fn is_reachable(&self) -> bool {
        true
    }

    fn is_local(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("local checkout at {}", self.root.display())
    }
}

/// The source chosen for this invocation.
#[derive(Debug, Clone)]
pub enum RegistrySource {
    /// Remote content over HTTPS
    Http(HttpSource),
    /// Local checkout named by `GREATER_LOCAL_REPO`
    Local(LocalRepoSource),
}

impl RegistrySource {
    /// Prefer a valid `GREATER_LOCAL_REPO` checkout, otherwise HTTP.
    pub fn detect(raw_base_url: &str, repository: &str, timeout: Duration) -> Result<Self> {
        if let Some(dir) = std::env::var_os(LOCAL_REPO_ENV).filter(|v| !v.is_empty()) {
            match LocalRepoSource::open(PathBuf::from(&dir)) {
                Some(local) => {
                    tracing::info!(target: "fetcher", "Using {}", local.describe());
                    return Ok(Self::Local(local));
                }
                None => tracing::warn!(
                    target: "fetcher",
                    "{} is set but {} has no {}; using the network",
                    LOCAL_REPO_ENV,
                    PathBuf::from(dir).display(),
                    REGISTRY_INDEX_PATH
                ),
            }
        }
        Ok(Self::Http(HttpSource::new(raw_base_url, repository, timeout)?))
    }
}

impl ContentSource for RegistrySource {
    async fn fetch_file(&self, git_ref: &str, path: &str) -> Result<Vec<u8>> {
        match self {
            Self::Http(s) => s.fetch_file(git_ref, path).await,
            Self::Local(s) => s.fetch_file(git_ref, path).await,
        }
    }

    async fn resolve_ref(&self, git_ref: &str) -> Result<String> {
        match self {
            Self::Http(s) => s.resolve_ref(git_ref).await,
            Self::Local(s) => s.resolve_ref(git_ref).await,
        }
    }

    async fn is_reachable(&self) -> bool {
        match self {
            Self::Http(s) => s.is_reachable().await,
            Self::Local(s) => s.is_reachable().await,
        }
    }

    fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    fn describe(&self) -> String {
        match self {
            Self::Http(s) => s.describe(),
            Self::Local(s) => s.describe(),
        }
    }
}
