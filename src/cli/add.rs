//! Add components (and their dependencies) to the project.
//!
//! ```bash
//! greater add Button Card
//! greater add Button --ref v1.2.0 --dry-run
//! greater add Button --offline          # cache only
//! ```
//!
//! Nothing is written when any file fails to fetch or verify, or when an existing
//! file was modified locally (unless `--force`).

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, print_packages, print_plan, summarize};
use crate::installer::{InstallOptions, Installer};
use crate::utils::progress::spinner_with_message;

#[derive(Args)]
pub struct AddCommand {
    /// Component names
    #[arg(required = true, value_name = "NAMES")]
    names: Vec<String>,

    /// Registry ref (branch, tag, or commit)
    #[arg(long = "ref", value_name = "REF")]
    git_ref: Option<String>,

    /// Use cached content only
    #[arg(long)]
    offline: bool,

    /// Show what would change without writing
    #[arg(long)]
    dry_run: bool,

    /// Overwrite locally modified files
    #[arg(short, long)]
    force: bool,

    /// Install even when checksums do not match (warns instead)
    #[arg(long)]
    no_verify: bool,

    /// Do not install external packages
    #[arg(long)]
    skip_packages: bool,
}

impl AddCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let config = ctx.load_config()?;
        let options = InstallOptions {
            git_ref: ctx.effective_ref(self.git_ref.as_deref(), Some(&config)),
            dry_run: self.dry_run,
            force: self.force,
            ignore_checksums: self.no_verify,
            skip_packages: self.skip_packages || self.dry_run,
        };
        let fetcher = ctx.fetcher(self.offline)?;

        let spinner = spinner_with_message(format!("Adding {}", self.names.join(", ")));
        let installer =
            Installer::new(&fetcher, &ctx.project_dir, config).with_progress(spinner.clone());
        let result = installer.install(&self.names, &options).await;
        spinner.finish_and_clear();
        let report = result?;

        print_plan(&report);
        for path in &report.checksum_warnings {
            println!("{} checksum of {} not verified", "warning:".yellow().bold(), path);
        }
        print_packages(&report);

        if report.dry_run {
            println!("\n{} {}", "Dry run:".cyan(), summarize(&report));
            if !report.packages.is_empty() {
                let specs: Vec<String> =
                    report.packages.iter().map(|(n, v)| format!("{n}@{v}")).collect();
                println!("Would require packages: {}", specs.join(", "));
            }
        } else if report.has_changes() || self.force {
            println!("\n{} {} at {}", "✓".green(), summarize(&report), report.git_ref);
        } else {
            println!("\n{} Already up to date", "✓".green());
        }
        Ok(())
    }
}
