//! Cross-process lock guarding writes into one project.
//!
//! Two `greater add` runs in the same project would otherwise interleave file
//! writes and race on `.greater/installed.json`. The lock is an OS file lock
//! (`fs4`) on `.greater/.locks/<name>.lock`, held for the lifetime of
//! [`ProjectLock`] and released on drop.
//!
//! Lock attempts are non-blocking and retried with capped exponential backoff
//! inside `spawn_blocking`, so waiting never stalls the runtime.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

use crate::constants::{
    MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS, STATE_DIR_NAME, default_lock_timeout,
};
use crate::core::GreaterError;

const LOCKS_DIR: &str = ".locks";

/// Exclusive lock on a project, released on drop.
#[derive(Debug)]
pub struct ProjectLock {
    _file: Arc<File>,
    name: String,
    path: PathBuf,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        debug!(lock = %self.name, "Project lock released");
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            debug!(lock = %self.name, error = %e, "Failed to remove lock file");
        }
    }
}

impl ProjectLock {
    /// Path of the lock file for `name` in `project_dir`.
    #[must_use]
    pub fn lock_path(project_dir: &Path, name: &str) -> PathBuf {
        project_dir.join(STATE_DIR_NAME).join(LOCKS_DIR).join(format!("{name}.lock"))
    }

    /// Acquire `name` with the default timeout.
    pub async fn acquire(project_dir: &Path, name: &str) -> Result<Self> {
        Self::acquire_with_timeout(project_dir, name, default_lock_timeout()).await
    }

    /// Acquire `name`, giving up after `timeout`.
    pub async fn acquire_with_timeout(
        project_dir: &Path,
        name: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let path = Self::lock_path(project_dir, name);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create lock directory {}", dir.display()))?;
        }

        let open_path = path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .context("Lock file open task panicked")?
        .with_context(|| format!("Failed to open lock file {}", path.display()))?;
        let file = Arc::new(file);

        let start = Instant::now();
        // 10ms, 20ms, 40ms ... capped
        let backoff = ExponentialBackoff::from_millis(2)
            .factor(STARTING_BACKOFF_DELAY_MS / 2)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let attempt = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || attempt.try_lock_exclusive())
                .await
                .context("Lock attempt task panicked")?;

            if let Ok(true) = locked {
                debug!(
                    lock = %name,
                    wait_ms = start.elapsed().as_millis(),
                    "Project lock acquired"
                );
                return Ok(Self {
                    _file: file,
                    name: name.to_string(),
                    path,
                });
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(delay.min(remaining)).await;
        }

        Err(GreaterError::Other {
            message: format!(
                "Timeout after {timeout:?} waiting for the project lock '{name}'; \
                 another greater process may be installing into {}",
                project_dir.display()
            ),
        }
        .into())
    }
}
