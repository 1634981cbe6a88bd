//! Check installed files against the checksums recorded at install time.
//!
//! Exits non-zero when any file was modified or deleted.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, OutputFormat};
use crate::config::ComponentConfig;
use crate::core::GreaterError;
use crate::installer::{AuditReport, AuditStatus, Installer};

#[derive(Args)]
pub struct AuditCommand {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl AuditCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let config = ComponentConfig::load(&ctx.project_dir).unwrap_or_default();
        // Audit reads only the project; the fetcher is never asked for anything
        let fetcher = ctx.fetcher(true)?;
        let report = Installer::new(&fetcher, &ctx.project_dir, config).audit().await?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_report(&report),
        }

        if report.is_clean() {
            return Ok(());
        }
        Err(GreaterError::Other {
            message: format!(
                "{} installed file(s) modified, {} missing",
                report.count(AuditStatus::Modified),
                report.count(AuditStatus::Missing)
            ),
        }
        .into())
    }
}

fn print_report(report: &AuditReport) {
    if report.entries.is_empty() {
        println!("No components installed");
        return;
    }
    for entry in report.issues() {
        let status = match entry.status {
            AuditStatus::Modified => "modified".yellow(),
            AuditStatus::Missing => "missing".red(),
            AuditStatus::Ok => "ok".green(),
        };
        println!("  {:>8} {} ({})", status, entry.local_path, entry.component);
    }
    if report.is_clean() {
        println!(
            "{} {} file(s) match their recorded checksums",
            "✓".green(),
            report.entries.len()
        );
    }
}
