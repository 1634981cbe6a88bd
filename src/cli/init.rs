//! Initialize a project for greater components.
//!
//! Writes `components.json` with the default aliases and keeps greater's lock
//! directory out of version control:
//!
//! ```bash
//! greater init
//! greater init --ref v1.2.0   # pin a registry ref
//! ```

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;
use std::path::Path;

use super::common::CommandContext;
use crate::config::ComponentConfig;
use crate::constants::STATE_DIR_NAME;
use crate::utils::fs::safe_write;

const GITIGNORE_MARKER: &str = "# greater";

#[derive(Args)]
pub struct InitCommand {
    /// Overwrite an existing components.json
    #[arg(short, long)]
    force: bool,

    /// Registry ref to pin in components.json
    #[arg(long = "ref", value_name = "REF")]
    git_ref: Option<String>,
}

impl InitCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let project_dir = &ctx.project_dir;
        let config_path = ComponentConfig::path_in(project_dir);

        if config_path.exists() && !self.force {
            return Err(anyhow!(
                "{} already exists. Use --force to overwrite",
                config_path.display()
            ));
        }

        let config = ComponentConfig {
            git_ref: self.git_ref,
            ..ComponentConfig::default()
        };
        config.save(project_dir)?;

        if update_gitignore(project_dir)? {
            println!("{} Updated .gitignore", "✓".green());
        }

        println!("{} Initialized {}", "✓".green(), config_path.display());
        println!("\n{}", "Aliases:".cyan());
        for (name, dir) in config.aliases.iter() {
            println!("  {name:<12} {dir}");
        }
        println!("\n{}", "Next steps:".cyan());
        println!("  List components with {}", "greater list".bright_white());
        println!("  Add one with {}", "greater add Button".bright_white());
        Ok(())
    }
}

/// Append greater's lock directory to `.gitignore` once. Returns whether it changed.
fn update_gitignore(project_dir: &Path) -> Result<bool> {
    let path = project_dir.join(".gitignore");
    let mut content = if path.exists() { std::fs::read_to_string(&path)? } else { String::new() };
    if content.contains(GITIGNORE_MARKER) {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    if !content.is_empty() {
        content.push('\n');
    }
    content.push_str(GITIGNORE_MARKER);
    content.push('\n');
    content.push_str(&format!("{STATE_DIR_NAME}/.locks/\n"));
    safe_write(&path, &content)?;
    Ok(true)
}
