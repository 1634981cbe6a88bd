//! Diagnose the environment greater runs in.
//!
//! Checks the project config and its aliases, the cache directory, git, network
//! reachability of the registry, and the local checkout override. Exits non-zero
//! when any check fails; warnings do not fail.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fmt;

use super::common::CommandContext;
use crate::config::ComponentConfig;
use crate::constants::LOCAL_REPO_ENV;
use crate::core::GreaterError;
use crate::fetcher::ContentSource;
use crate::git::git_version;
use crate::utils::path_validation::resolve_path_within_dir;

#[derive(Args)]
pub struct DoctorCommand {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug)]
struct Check {
    name: &'static str,
    status: Status,
    detail: String,
}

impl Check {
    fn new(name: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.status {
            Status::Pass => "✓".green(),
            Status::Warn => "!".yellow(),
            Status::Fail => "✗".red(),
        };
        write!(f, "{} {:<14} {}", mark, self.name, self.detail)
    }
}

impl DoctorCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let mut checks = check_project(ctx);
        checks.push(check_cache(ctx));
        checks.push(check_git().await);
        checks.extend(check_source(ctx).await);

        for check in &checks {
            println!("{check}");
        }

        let failed = checks.iter().filter(|c| c.status == Status::Fail).count();
        if failed == 0 {
            println!("\n{} No problems found", "✓".green());
            return Ok(());
        }
        Err(GreaterError::Other {
            message: format!("{failed} check(s) failed"),
        }
        .into())
    }
}

fn check_project(ctx: &CommandContext) -> Vec<Check> {
    let config = match ComponentConfig::load(&ctx.project_dir) {
        Ok(config) => config,
        Err(e) => {
            let not_initialized = matches!(
                e.downcast_ref::<GreaterError>(),
                Some(GreaterError::ConfigNotFound { .. })
            );
            return vec![if not_initialized {
                Check::new("config", Status::Warn, "no components.json; run 'greater init'")
            } else {
                Check::new("config", Status::Fail, e.to_string())
            }];
        }
    };

    let mut checks = vec![Check::new(
        "config",
        Status::Pass,
        format!(
            "{} ({})",
            ComponentConfig::path_in(&ctx.project_dir).display(),
            config.git_ref.as_deref().unwrap_or("default ref")
        ),
    )];
    for (name, dir) in config.aliases.iter() {
        let check = match resolve_path_within_dir(&ctx.project_dir, dir) {
            Ok(path) if path.is_dir() => {
                Check::new("alias", Status::Pass, format!("{name} -> {dir}"))
            }
            Ok(_) => Check::new(
                "alias",
                Status::Pass,
                format!("{name} -> {dir} (created on first install)"),
            ),
            Err(e) => Check::new("alias", Status::Fail, format!("{name}: {e}")),
        };
        checks.push(check);
    }
    checks
}

fn check_cache(ctx: &CommandContext) -> Check {
    let cache = match ctx.cache() {
        Ok(cache) => cache,
        Err(e) => return Check::new("cache", Status::Fail, e.to_string()),
    };
    let root = cache.root();
    let writable = std::fs::create_dir_all(root)
        .and_then(|()| tempfile::NamedTempFile::new_in(root).map(drop));
    match writable {
        Ok(()) => Check::new("cache", Status::Pass, format!("{} is writable", root.display())),
        Err(e) => {
            Check::new("cache", Status::Fail, format!("{} is not writable: {e}", root.display()))
        }
    }
}

async fn check_git() -> Check {
    match git_version().await {
        Some(version) => Check::new("git", Status::Pass, version.trim().to_string()),
        None => Check::new(
            "git",
            Status::Warn,
            "not found; branch refs cannot be resolved, pin a tag or commit",
        ),
    }
}

async fn check_source(ctx: &CommandContext) -> Vec<Check> {
    let mut checks = Vec::new();
    let source = match ctx.source() {
        Ok(source) => source,
        Err(e) => return vec![Check::new("registry", Status::Fail, e.to_string())],
    };

    if let Some(dir) = std::env::var_os(LOCAL_REPO_ENV).filter(|v| !v.is_empty()) {
        let status = if source.is_local() { Status::Pass } else { Status::Warn };
        let detail = if source.is_local() {
            format!("{LOCAL_REPO_ENV} -> {}", source.describe())
        } else {
            format!(
                "{LOCAL_REPO_ENV}={} is not a registry checkout; ignored",
                dir.to_string_lossy()
            )
        };
        checks.push(Check::new("local repo", status, detail));
    }

    checks.push(if source.is_reachable().await {
        Check::new("registry", Status::Pass, source.describe())
    } else {
        Check::new(
            "registry",
            Status::Warn,
            format!("{} unreachable; only --offline works", source.describe()),
        )
    });
    checks
}
