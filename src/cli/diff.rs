//! Show how installed components differ from the registry.
//!
//! ```bash
//! greater diff                       # every installed component
//! greater diff Button --ref v2.0.0 --patch
//! ```
//!
//! Nothing is written. Locally modified files show up as conflicts.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use similar::TextDiff;

use super::common::{CommandContext, print_plan, summarize};
use crate::installer::{FileAction, InstallOptions, Installer, PlannedFile};

#[derive(Args)]
pub struct DiffCommand {
    /// Components to compare (default: all installed)
    #[arg(value_name = "NAMES")]
    names: Vec<String>,

    /// Registry ref to compare against
    #[arg(long = "ref", value_name = "REF")]
    git_ref: Option<String>,

    /// Use cached content only
    #[arg(long)]
    offline: bool,

    /// Print unified diffs of changed files
    #[arg(long)]
    patch: bool,
}

impl DiffCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let config = ctx.load_config()?;
        let options = InstallOptions {
            git_ref: ctx.effective_ref(self.git_ref.as_deref(), Some(&config)),
            dry_run: true,
            ..InstallOptions::default()
        };
        let fetcher = ctx.fetcher(self.offline)?;
        let report =
            Installer::new(&fetcher, &ctx.project_dir, config).diff(&self.names, &options).await?;

        if report.components.is_empty() {
            println!("No components installed");
            return Ok(());
        }

        print_plan(&report);
        if self.patch {
            for (_, file) in report.files().filter(|(_, f)| f.action != FileAction::UpToDate) {
                if let Some(patch) = render_patch(file) {
                    println!();
                    print_colored_patch(&patch);
                }
            }
        }

        if report.has_changes() {
            println!("\n{} at {}", summarize(&report), report.git_ref);
        } else {
            println!("\n{} Everything matches {}", "✓".green(), report.git_ref);
        }
        Ok(())
    }
}

/// Unified diff from the file on disk to the content an install would write.
///
/// `None` for binary content.
fn render_patch(file: &PlannedFile) -> Option<String> {
    let old = match &file.existing {
        Some(bytes) => std::str::from_utf8(bytes).ok()?,
        None => "",
    };
    let new = std::str::from_utf8(&file.content).ok()?;
    let old_header = if file.existing.is_some() {
        format!("a/{}", file.local_path)
    } else {
        "/dev/null".to_string()
    };
    Some(
        TextDiff::from_lines(old, new)
            .unified_diff()
            .context_radius(3)
            .header(&old_header, &format!("b/{}", file.local_path))
            .to_string(),
    )
}

fn print_colored_patch(patch: &str) {
    for line in patch.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else {
            println!("{line}");
        }
    }
}
