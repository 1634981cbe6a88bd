//! greater CLI entry point
//!
//! Parses arguments, sets up logging, runs the command, and renders errors
//! with suggestions before exiting with status 1.

use anyhow::Result;
use clap::Parser;
use greater_cli::cli;
use greater_cli::core::error::user_friendly_error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --verbose/--quiet
    let config = cli.build_config();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn",
            config.log_level
        ))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.log_level == "debug")
        .without_time()
        .try_init();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
