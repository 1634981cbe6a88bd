//! Global constants used throughout the greater codebase.
//!
//! This module contains timeout durations, concurrency limits, file names and
//! environment variable names that are used across multiple modules. Defining
//! them centrally makes magic numbers and magic strings discoverable.

use std::time::Duration;

/// Default timeout for project lock acquisition (30 seconds).
pub fn default_lock_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Maximum backoff delay for exponential backoff (500ms).
///
/// Exponential backoff delays are capped at this value to prevent
/// excessive wait times during retry operations.
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for exponential backoff (10ms).
///
/// This is the initial delay used in exponential backoff calculations,
/// which doubles on each retry attempt.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Starting delay between HTTP retries (200ms).
pub const HTTP_RETRY_BASE_DELAY_MS: u64 = 200;

/// Number of retries for transient HTTP failures (connect errors, 5xx).
pub const HTTP_RETRY_ATTEMPTS: usize = 2;

/// Default per-request timeout for registry fetches (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for the lightweight reachability check used by `doctor` and offline detection.
pub const NETWORK_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for `git ls-remote` when resolving floating refs (60 seconds).
pub const GIT_LS_REMOTE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of concurrent file fetches within one batch.
///
/// Kept small so a single install never floods the content host.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Default git ref used when neither the command line nor `components.json` pins one.
pub const DEFAULT_REF: &str = "main";

/// Default git repository hosting the registry.
pub const DEFAULT_REPOSITORY: &str = "https://github.com/equaltoai/greater-components.git";

/// Default base URL serving raw file content as `<base>/<ref>/<path>`.
pub const DEFAULT_RAW_BASE_URL: &str =
    "https://raw.githubusercontent.com/equaltoai/greater-components";

/// Location of the registry manifest inside the source repository.
pub const REGISTRY_INDEX_PATH: &str = "registry/index.json";

/// Consumer configuration file name.
pub const CONFIG_FILE_NAME: &str = "components.json";

/// Per-project state directory.
pub const STATE_DIR_NAME: &str = ".greater";

/// Installed-state file name inside [`STATE_DIR_NAME`].
pub const INSTALLED_FILE_NAME: &str = "installed.json";

/// Import specifier prefix naming registry-virtual paths inside component sources.
pub const VIRTUAL_IMPORT_PREFIX: &str = "$greater/";

/// Environment variable pointing at a local checkout of the component monorepo.
pub const LOCAL_REPO_ENV: &str = "GREATER_LOCAL_REPO";

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "GREATER_CACHE_DIR";

/// Environment variable overriding the global config file location.
pub const CONFIG_ENV: &str = "GREATER_CONFIG";

/// Environment variable disabling progress indicators.
pub const NO_PROGRESS_ENV: &str = "GREATER_NO_PROGRESS";
