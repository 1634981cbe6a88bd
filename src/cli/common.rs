//! Shared plumbing for CLI commands.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::cache::CacheStore;
use crate::config::{ComponentConfig, GlobalConfig};
use crate::fetcher::{ContentSource, Fetcher, RegistrySource};
use crate::installer::{FileAction, InstallReport};
use crate::utils::path_validation::absolute_dir;

/// Output format for commands that can emit JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Project directory (holds `components.json` once initialized)
    pub project_dir: PathBuf,
    /// Global settings
    pub global: GlobalConfig,
}

impl CommandContext {
    /// Build a context for `project` (or the nearest initialized project above the
    /// current directory) with the global config at `config_path`.
    pub async fn new(project: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self> {
        let global = GlobalConfig::load_with_optional(config_path).await?;
        Ok(Self {
            project_dir: Self::locate(project)?,
            global,
        })
    }

    fn locate(project: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = project {
            return absolute_dir(&dir);
        }
        let cwd = std::env::current_dir()?;
        Ok(ComponentConfig::locate_project(&cwd).unwrap_or(cwd))
    }

    /// Load `components.json`; fails with `ConfigNotFound` before `greater init`.
    pub fn load_config(&self) -> Result<ComponentConfig> {
        ComponentConfig::load(&self.project_dir)
    }

    /// Ref for this invocation: `--ref`, then `components.json`, then the global default.
    pub fn effective_ref(
        &self,
        explicit: Option<&str>,
        config: Option<&ComponentConfig>,
    ) -> String {
        match config {
            Some(config) => config.effective_ref(explicit, &self.global),
            None => explicit.map_or_else(|| self.global.default_ref.clone(), str::to_string),
        }
    }

    /// The cache store (`GREATER_CACHE_DIR` or `~/.greater/cache`).
    pub fn cache(&self) -> Result<CacheStore> {
        CacheStore::from_env()
    }

    /// The registry source for this invocation.
    pub fn source(&self) -> Result<RegistrySource> {
        RegistrySource::detect(
            &self.global.raw_base_url,
            &self.global.repository,
            self.global.request_timeout(),
        )
    }

    /// A fetcher over [`Self::source`] and [`Self::cache`].
    pub fn fetcher(&self, offline: bool) -> Result<Fetcher<RegistrySource>> {
        let source = self.source()?;
        tracing::debug!("Registry source: {}", source.describe());
        Ok(Fetcher::new(source, self.cache()?)
            .offline(offline)
            .with_concurrency(self.global.fetch_concurrency))
    }
}

/// Project-relative display of `path`.
pub fn display_relative(project_dir: &Path, path: &Path) -> String {
    path.strip_prefix(project_dir).unwrap_or(path).display().to_string()
}

fn action_label(action: FileAction) -> colored::ColoredString {
    match action {
        FileAction::Create => "create".green(),
        FileAction::Update => "update".cyan(),
        FileAction::UpToDate => "unchanged".dimmed(),
        FileAction::Conflict => "conflict".red().bold(),
    }
}

/// Print one line per planned file, grouped by component.
pub fn print_plan(report: &InstallReport) {
    for component in &report.components {
        let suffix = if component.transitive {
            " (dependency)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{}{}", component.name.bold(), suffix);
        for file in &component.files {
            let imports = match file.summary.changed_imports {
                0 => String::new(),
                n => format!(" ({n} import(s) rewritten)").dimmed().to_string(),
            };
            println!("  {:>9} {}{}", action_label(file.action), file.local_path, imports);
        }
    }
}

/// Print the package requirements of `report`, with conflicts as warnings.
pub fn print_packages(report: &InstallReport) {
    for conflict in &report.package_conflicts {
        println!(
            "{} package {} is required as {} (by {}); using {}",
            "warning:".yellow().bold(),
            conflict.name,
            conflict.versions.join(" and "),
            conflict.required_by.join(", "),
            report.packages.get(&conflict.name).map_or("the first", String::as_str)
        );
    }
    if !report.installed_packages.is_empty() {
        println!("{} Installed packages: {}", "✓".green(), report.installed_packages.join(", "));
    }
}

/// One-line totals of `report`.
pub fn summarize(report: &InstallReport) -> String {
    format!(
        "{} created, {} updated, {} unchanged, {} conflict(s)",
        report.count(FileAction::Create),
        report.count(FileAction::Update),
        report.count(FileAction::UpToDate),
        report.count(FileAction::Conflict)
    )
}
