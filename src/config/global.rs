//! User-wide settings in `~/.greater/config.toml`.
//!
//! Every field is optional; a missing file means defaults.
//!
//! ```toml
//! repository = "https://github.com/equaltoai/greater-components.git"
//! raw_base_url = "https://raw.githubusercontent.com/equaltoai/greater-components"
//! default_ref = "main"
//! fetch_concurrency = 8
//! request_timeout_secs = 30
//! ```
//!
//! The location can be overridden with `--config` or `GREATER_CONFIG`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{
    CONFIG_ENV, DEFAULT_FETCH_CONCURRENCY, DEFAULT_RAW_BASE_URL, DEFAULT_REF, DEFAULT_REPOSITORY,
    DEFAULT_REQUEST_TIMEOUT_SECS, STATE_DIR_NAME,
};
use crate::core::GreaterError;

fn default_repository() -> String {
    DEFAULT_REPOSITORY.to_string()
}

fn default_raw_base_url() -> String {
    DEFAULT_RAW_BASE_URL.to_string()
}

fn default_ref() -> String {
    DEFAULT_REF.to_string()
}

const fn default_fetch_concurrency() -> usize {
    DEFAULT_FETCH_CONCURRENCY
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Global settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Git URL of the component monorepo, used to resolve branches
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Base URL serving raw files as `<base>/<ref>/<path>`
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,

    /// Ref used when neither the command line nor `components.json` names one
    #[serde(default = "default_ref")]
    pub default_ref: String,

    /// Concurrent fetches per batch
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            repository: default_repository(),
            raw_base_url: default_raw_base_url(),
            default_ref: default_ref(),
            fetch_concurrency: default_fetch_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GlobalConfig {
    /// Load from `path`, `GREATER_CONFIG`, or the default location, in that order.
    ///
    /// A missing file yields defaults; an unreadable or invalid one is an error.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => match std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
                Some(p) => PathBuf::from(p),
                None => match Self::default_path() {
                    Ok(p) => p,
                    Err(_) => return Ok(Self::default()),
                },
            },
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No global config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load and validate the file at `path`.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| GreaterError::ConfigParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |reason: &str| -> anyhow::Error {
            GreaterError::ConfigParseError {
                file: path.display().to_string(),
                reason: reason.to_string(),
            }
            .into()
        };
        if self.fetch_concurrency == 0 {
            return Err(invalid("fetch_concurrency must be at least 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be at least 1"));
        }
        if self.default_ref.trim().is_empty() {
            return Err(invalid("default_ref must not be empty"));
        }
        Ok(())
    }

    /// `~/.greater/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::utils::platform::get_home_dir()?.join(STATE_DIR_NAME).join("config.toml"))
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config =
            GlobalConfig::load_with_optional(Some(temp.path().join("none.toml"))).await.unwrap();
        assert_eq!(config, GlobalConfig::default());
        assert_eq!(config.default_ref, "main");
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "default_ref = \"v1.0.0\"\nfetch_concurrency = 2\n").unwrap();

        let config = GlobalConfig::load_from(&path).await.unwrap();
        assert_eq!(config.default_ref, "v1.0.0");
        assert_eq!(config.fetch_concurrency, 2);
        assert_eq!(config.raw_base_url, DEFAULT_RAW_BASE_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    }

    #[tokio::test]
    async fn test_invalid_values_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        std::fs::write(&path, "fetch_concurrency = 0\n").unwrap();
        let err = GlobalConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GreaterError>(),
            Some(GreaterError::ConfigParseError { .. })
        ));

        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(GlobalConfig::load_from(&path).await.is_err());
    }
}
