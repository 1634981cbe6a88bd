//! Platform-specific helpers.
//!
//! Home and state directory resolution and executable lookup.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::constants::{CACHE_DIR_ENV, STATE_DIR_NAME};
use crate::utils::path_validation::absolute_dir;

/// Whether the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Name of the git executable on this platform.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if is_windows() {
        "git.exe"
    } else {
        "git"
    }
}

/// The user's home directory with a platform-specific hint when it cannot be found.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Cache root: `GREATER_CACHE_DIR` when set, otherwise `~/.greater/cache`.
pub fn get_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        return absolute_dir(Path::new(&dir));
    }
    Ok(get_home_dir()?.join(STATE_DIR_NAME).join("cache"))
}

/// Whether `cmd` resolves to an executable on `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}
