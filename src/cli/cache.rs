//! Inspect and clear the content cache.
//!
//! ```bash
//! greater cache info
//! greater cache clean --ref v1.0.0
//! greater cache clean                # everything
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::common::CommandContext;
use crate::cache::CacheStore;
use crate::utils::fs::format_size;

#[derive(Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: Option<CacheSubcommands>,
}

#[derive(Subcommand)]
enum CacheSubcommands {
    /// Show location, size, and cached refs (default)
    Info,

    /// Remove cached content
    Clean {
        /// Only this ref (a branch also drops the commit it last resolved to)
        #[arg(long = "ref", value_name = "REF")]
        git_ref: Option<String>,
    },
}

impl CacheCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let cache = ctx.cache()?;
        match self.command {
            Some(CacheSubcommands::Info) | None => show_info(&cache).await,
            Some(CacheSubcommands::Clean {
                git_ref,
            }) => clean(&cache, git_ref.as_deref()).await,
        }
    }
}

async fn show_info(cache: &CacheStore) -> Result<()> {
    let refs = cache.list_refs().await?;
    let size = cache.size().await?;

    println!("{} {}", "Location:".bold(), cache.root().display());
    println!("{} {}", "Size:".bold(), format_size(size));
    if refs.is_empty() {
        println!("\nCache is empty");
        return Ok(());
    }
    println!("\n{}", "Cached refs:".bold());
    for r in refs {
        let index = if r.has_index { ", index" } else { "" };
        println!("  {} ({} file(s){})", r.key, r.files, index);
    }
    Ok(())
}

async fn clean(cache: &CacheStore, git_ref: Option<&str>) -> Result<()> {
    match git_ref {
        Some(git_ref) => {
            if cache.clear_ref(git_ref).await? {
                println!("{} Cleared cached content for {}", "✓".green(), git_ref);
            } else {
                println!("Nothing cached for {git_ref}");
            }
        }
        None => {
            let size = cache.size().await?;
            cache.clear_all().await?;
            println!("{} Cleared cache ({} freed)", "✓".green(), format_size(size));
        }
    }
    Ok(())
}
