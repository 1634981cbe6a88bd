//! greater - installer for the Greater component registry
//!
//! Copies UI components out of a component monorepo into a consumer project. A
//! request for `Button` resolves its dependencies from the registry index, fetches
//! every file at one git ref (through a content cache), verifies each file against
//! its checksum, rewrites `$greater/` imports for the project's layout, and writes
//! the files without ever leaving the project directory.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`registry`] - registry index model and client
//! - [`resolver`] - dependency expansion, install order, cycle detection
//! - [`fetcher`] - cache-aware content retrieval, offline mode, content sources
//! - [`integrity`] - SHA-256 checksums (`sha256:<hex>`)
//! - [`transform`] - path mapping and import rewriting
//! - [`installer`] - plan, conflict detection, and writes under a project lock
//!
//! ## State and configuration
//! - [`config`] - `components.json` and the global `~/.greater/config.toml`
//! - [`installed`] - `.greater/installed.json`
//! - [`cache`] - on-disk content cache
//! - [`packages`] - external package installation through the project's package manager
//!
//! ## Support
//! - [`cli`] - command implementations
//! - [`core`] - error types and user-facing error rendering
//! - [`git`] - `git ls-remote` for resolving branches
//! - [`utils`] - path safety, atomic writes, platform helpers, progress
//!
//! # Example
//!
//! ```rust,no_run
//! use greater_cli::cache::CacheStore;
//! use greater_cli::config::ComponentConfig;
//! use greater_cli::fetcher::{Fetcher, LocalRepoSource};
//! use greater_cli::installer::{InstallOptions, Installer};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let source = LocalRepoSource::open("../greater-components").expect("registry checkout");
//! let fetcher = Fetcher::new(source, CacheStore::from_env()?);
//! let project = Path::new(".");
//! let installer = Installer::new(&fetcher, project, ComponentConfig::load(project)?);
//!
//! let options = InstallOptions { git_ref: "main".into(), ..InstallOptions::default() };
//! let report = installer.install(&["Button".to_string()], &options).await?;
//! println!("{} file(s) created", report.count(greater_cli::installer::FileAction::Create));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod fetcher;
pub mod git;
pub mod installed;
pub mod installer;
pub mod integrity;
pub mod packages;
pub mod registry;
pub mod resolver;
pub mod transform;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
