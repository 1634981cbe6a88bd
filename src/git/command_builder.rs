//! Type-safe builder for git invocations.
//!
//! All git processes go through [`GitCommand`], which adds a timeout, structured
//! logging under the `git` target, and maps failures onto
//! [`GreaterError::GitCommandError`] / [`GreaterError::GitNotFound`].
//!
//! ```rust,no_run
//! use greater_cli::git::command_builder::GitCommand;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let refs = GitCommand::ls_remote("https://github.com/org/repo.git", "main")
//!     .with_context("resolve main")
//!     .execute_stdout()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::GreaterError;
use crate::utils::platform::get_git_command;

/// Builder for a single git process.
#[derive(Debug)]
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // Never let a hung credential prompt block forever
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: Some(Duration::from_secs(300)),
            context: None,
        }
    }
}

/// Captured output of a successful git command.
#[derive(Debug)]
pub struct GitCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error (git reports progress here)
    pub stderr: String,
}

impl GitCommand {
    /// Empty command; add arguments with [`arg`](Self::arg) / [`args`](Self::args).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Override the timeout; `None` waits indefinitely.
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Label included in log lines.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn operation(&self) -> String {
        let mut args = self.args.iter();
        while let Some(arg) = args.next() {
            if arg == "-c" {
                args.next();
            } else {
                return arg.clone();
            }
        }
        "unknown".to_string()
    }

    /// Run the command and capture its output.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let git_command = get_git_command();
        let mut cmd = Command::new(git_command);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        cmd.args(&full_args);

        let ctx = self.context.as_deref().unwrap_or("git");
        tracing::debug!(
            target: "git",
            "({}) Executing command: {} {}",
            ctx,
            git_command,
            full_args.join(" ")
        );

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let start = std::time::Instant::now();
        let output_future = cmd.output();
        let result = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "Command timed out after {} seconds: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(GreaterError::GitCommandError {
                        operation: self.operation(),
                        stderr: format!(
                            "Git command timed out after {} seconds. Check network connectivity \
                             and that no credential prompt is waiting for input",
                            duration.as_secs()
                        ),
                    }
                    .into());
                }
            },
            None => output_future.await,
        };

        let output = match result {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GreaterError::GitNotFound.into());
            }
            Err(e) => {
                return Err(e).context(format!("Failed to execute git {}", full_args.join(" ")));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "({}) Command failed with exit code {:?}: {}",
                ctx,
                output.status.code(),
                stderr.trim()
            );
            return Err(GreaterError::GitCommandError {
                operation: self.operation(),
                stderr: if stderr.trim().is_empty() { stdout } else { stderr },
            }
            .into());
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            tracing::debug!(
                target: "git::perf",
                "({}) Git {} took {}ms",
                ctx,
                self.operation(),
                elapsed.as_millis()
            );
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Run the command and return trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }
}

// Convenience builders for the operations greater needs

impl GitCommand {
    /// `git ls-remote <url> <pattern>`: list matching heads and tags without cloning.
    pub fn ls_remote(url: &str, pattern: &str) -> Self {
        Self::new().args(["ls-remote", url, pattern])
    }

    /// `git --version`, used by `doctor`.
    pub fn version() -> Self {
        Self::new().arg("--version")
    }
}

// Fixture repositories for tests
#[cfg(test)]
impl GitCommand {
    /// Run git against `dir` (passed as `-C <dir>`).
    pub(crate) fn current_dir(mut self, dir: impl AsRef<std::path::Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub(crate) fn init() -> Self {
        Self::new().arg("init")
    }

    pub(crate) fn add(pathspec: &str) -> Self {
        Self::new().args(["add", pathspec])
    }

    /// `git commit -m <message>` with a fixed identity so it works on bare CI hosts.
    pub(crate) fn commit(message: &str) -> Self {
        Self::new()
            .args(["-c", "user.name=greater", "-c", "user.email=greater@localhost"])
            .args(["commit", "-m", message])
    }

    pub(crate) fn rev_parse(ref_name: &str) -> Self {
        Self::new().args(["rev-parse", ref_name])
    }
}
