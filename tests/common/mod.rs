//! Common helpers for greater integration tests
//!
//! [`TestProject`] owns a temporary project, a registry checkout, and a cache
//! directory, and builds `greater` invocations wired to them through environment
//! variables, so tests never touch the network or the real home directory.

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use greater_cli::constants::{CACHE_DIR_ENV, CONFIG_ENV, LOCAL_REPO_ENV, NO_PROGRESS_ENV};
use greater_cli::installed::InstalledState;
use greater_cli::test_utils::RegistryFixture;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestProject {
    _temp: TempDir,
    pub project: PathBuf,
    pub registry: PathBuf,
    pub cache: PathBuf,
    pub global_config: PathBuf,
    use_local_registry: bool,
}

impl TestProject {
    /// An empty project without a registry checkout.
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let project = temp.path().join("project");
        let registry = temp.path().join("registry-checkout");
        fs::create_dir_all(&project)?;
        fs::create_dir_all(&registry)?;
        Ok(Self {
            project,
            registry,
            cache: temp.path().join("cache"),
            global_config: temp.path().join("config.toml"),
            _temp: temp,
            use_local_registry: false,
        })
    }

    /// A project served by `fixture` as a local checkout.
    pub fn with_registry(fixture: &RegistryFixture) -> Result<Self> {
        let mut project = Self::new()?;
        fixture.write_checkout(&project.registry)?;
        project.use_local_registry = true;
        Ok(project)
    }

    /// Replace the checkout with `fixture` (simulates a new upstream release).
    pub fn replace_registry(&self, fixture: &RegistryFixture) -> Result<()> {
        fs::remove_dir_all(&self.registry)?;
        fs::create_dir_all(&self.registry)?;
        fixture.write_checkout(&self.registry)
    }

    /// Write the global config file.
    pub fn write_global_config(&self, content: &str) -> Result<()> {
        fs::write(&self.global_config, content)?;
        Ok(())
    }

    /// `greater` running in the project directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("greater").expect("greater binary is built");
        cmd.current_dir(&self.project)
            .env(CACHE_DIR_ENV, &self.cache)
            .env(CONFIG_ENV, &self.global_config)
            .env(NO_PROGRESS_ENV, "1")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove(LOCAL_REPO_ENV);
        if self.use_local_registry {
            cmd.env(LOCAL_REPO_ENV, &self.registry);
        }
        cmd
    }

    /// Run `greater init`.
    pub fn init(&self) {
        self.cmd().arg("init").assert().success();
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.project.join(relative)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).expect("readable project file")
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write project file");
    }

    pub fn installed(&self) -> InstalledState {
        InstalledState::load(&self.project).expect("valid installed.json")
    }

    /// Files below `dir` relative to the project, sorted.
    pub fn files_under(&self, dir: &str) -> Vec<String> {
        let root = self.path(dir);
        let mut files: Vec<String> = walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| relative(&self.project, e.path()))
            .collect();
        files.sort();
        files
    }
}

fn relative(base: &Path, path: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).to_string_lossy().replace('\\', "/")
}

pub const BUTTON: &str = "src/lib/components/ui/Button.svelte";
pub const ICON: &str = "src/lib/components/ui/Icon.svelte";
pub const CN: &str = "src/lib/components/ui/utils/cn.ts";
pub const THEME: &str = "src/lib/components/shared/theme.css";
