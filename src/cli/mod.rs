//! Command-line interface for greater.
//!
//! Each command lives in its own module with its own argument struct and an
//! `execute(self, &CommandContext)` method.
//!
//! # Commands
//!
//! ## Project
//! - `init` - write `components.json`
//! - `add` - install components and their dependencies
//! - `update` - re-install installed components at a new ref
//! - `diff` - show what `update` would change
//! - `audit` - check installed files against their recorded checksums
//!
//! ## Registry and environment
//! - `list` - registry components or installed ones
//! - `doctor` - diagnose config, cache, git, and network
//! - `cache` - inspect or clear the content cache
//!
//! # Workflow
//!
//! ```bash
//! greater init
//! greater list
//! greater add Button
//! greater diff --ref v2.0.0 --patch
//! greater update --ref v2.0.0
//! ```
//!
//! # Global options
//!
//! - `--verbose` / `--quiet` - log level (`RUST_LOG` overrides both)
//! - `--no-progress` - disable spinners
//! - `--config` - global config file (also `GREATER_CONFIG`)
//! - `--project` - project directory (default: nearest directory with `components.json`)

mod add;
mod audit;
mod cache;
pub mod common;
mod diff;
mod doctor;
mod init;
mod list;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::progress::disable_progress;
use common::CommandContext;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter directive (`RUST_LOG` takes precedence)
    pub log_level: &'static str,
    /// Hide progress indicators
    pub no_progress: bool,
}

#[derive(Parser)]
#[command(
    name = "greater",
    about = "Install Greater UI components into your project",
    version,
    long_about = "greater copies components from the Greater component registry into your \
                  project, resolving their dependencies, verifying checksums, and rewriting \
                  imports for your layout."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable progress indicators
    #[arg(long, global = true)]
    no_progress: bool,

    /// Global config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Project directory
    #[arg(long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create components.json in the project
    Init(init::InitCommand),

    /// Add components to the project
    Add(add::AddCommand),

    /// List registry or installed components
    List(list::ListCommand),

    /// Show how installed components differ from the registry
    Diff(diff::DiffCommand),

    /// Re-install installed components at a new ref
    Update(update::UpdateCommand),

    /// Diagnose configuration and connectivity
    Doctor(doctor::DoctorCommand),

    /// Check installed files for local modifications
    Audit(audit::AuditCommand),

    /// Manage the content cache
    Cache(cache::CacheCommand),
}

impl Cli {
    /// Settings implied by the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };
        CliConfig {
            log_level,
            no_progress: self.no_progress || self.quiet,
        }
    }

    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        if config.no_progress {
            disable_progress();
        }

        let ctx = CommandContext::new(self.project, self.config).await?;
        tracing::debug!("Project directory: {}", ctx.project_dir.display());

        match self.command {
            Commands::Init(cmd) => cmd.execute(&ctx).await,
            Commands::Add(cmd) => cmd.execute(&ctx).await,
            Commands::List(cmd) => cmd.execute(&ctx).await,
            Commands::Diff(cmd) => cmd.execute(&ctx).await,
            Commands::Update(cmd) => cmd.execute(&ctx).await,
            Commands::Doctor(cmd) => cmd.execute(&ctx).await,
            Commands::Audit(cmd) => cmd.execute(&ctx).await,
            Commands::Cache(cmd) => cmd.execute(&ctx).await,
        }
    }
}
