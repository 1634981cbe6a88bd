//! Configuration for greater.
//!
//! Two layers:
//! - **Project**: `components.json` at the project root ([`ComponentConfig`]), written
//!   by `greater init` and read once per invocation.
//! - **Global**: `~/.greater/config.toml` ([`GlobalConfig`]) with registry location,
//!   default ref, and network tuning.
//!
//! The ref used for an operation is the first of: `--ref`, `components.json`'s
//! `ref`, the global `default_ref`.
//!
//! # `components.json`
//!
//! ```json
//! {
//!   "ref": "v1.2.0",
//!   "aliases": {
//!     "lib": "src/lib/components/ui",
//!     "components": "src/lib/components/shared",
//!     "hooks": "src/lib/components/ui/primitives",
//!     "greater": "src/lib/greater",
//!     "icons": "src/lib/icons"
//!   },
//!   "importAliases": { "$lib": "src/lib" }
//! }
//! ```
//!
//! Alias directories are project-relative. Extra alias keys map a registry prefix of
//! the same name (`icons/…`) to that directory.

pub mod global;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::constants::CONFIG_FILE_NAME;
use crate::core::GreaterError;
use crate::utils::fs::{read_text_file, write_json_file};
use crate::utils::path_validation::{find_project_root, sanitize_relative_path};

pub use global::GlobalConfig;

fn default_lib() -> String {
    "src/lib/components/ui".to_string()
}

fn default_components() -> String {
    "src/lib/components/shared".to_string()
}

fn default_hooks() -> String {
    "src/lib/components/ui/primitives".to_string()
}

fn default_greater() -> String {
    "src/lib/greater".to_string()
}

/// Install directories for each registry area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aliases {
    /// Target of `lib/`
    #[serde(default = "default_lib")]
    pub lib: String,
    /// Target of `shared/`
    #[serde(default = "default_components")]
    pub components: String,
    /// Target of `lib/primitives/`
    #[serde(default = "default_hooks")]
    pub hooks: String,
    /// Target of `greater/`
    #[serde(default = "default_greater")]
    pub greater: String,
    /// Additional `<name>/` prefixes
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Default for Aliases {
    fn default() -> Self {
        Self {
            lib: default_lib(),
            components: default_components(),
            hooks: default_hooks(),
            greater: default_greater(),
            extra: BTreeMap::new(),
        }
    }
}

impl Aliases {
    /// Every `(name, directory)` pair, built-in ones first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        [
            ("lib", self.lib.as_str()),
            ("components", self.components.as_str()),
            ("hooks", self.hooks.as_str()),
            ("greater", self.greater.as_str()),
        ]
        .into_iter()
        .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// Project configuration stored in `components.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    /// Pinned registry ref
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    /// Install directories
    #[serde(default)]
    pub aliases: Aliases,
    /// Module specifier aliases (`$lib` -> `src/lib`) usable in rewritten imports
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub import_aliases: BTreeMap<String, String>,
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            git_ref: None,
            aliases: Aliases::default(),
            import_aliases: BTreeMap::from([("$lib".to_string(), "src/lib".to_string())]),
        }
    }
}

impl ComponentConfig {
    /// Path of `components.json` inside `project_dir`.
    #[must_use]
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_FILE_NAME)
    }

    /// Nearest directory at or above `start` containing `components.json`.
    #[must_use]
    pub fn locate_project(start: &Path) -> Option<PathBuf> {
        find_project_root(start, CONFIG_FILE_NAME)
    }

    /// Load and validate `components.json` from `project_dir`.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::path_in(project_dir);
        if !path.is_file() {
            return Err(GreaterError::ConfigNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let content = read_text_file(&path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| GreaterError::ConfigParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate().map_err(|reason| GreaterError::ConfigParseError {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(config)
    }

    /// Write `components.json` into `project_dir`.
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        write_json_file(&Self::path_in(project_dir), self, true)
    }

    /// Check every alias directory is a safe project-relative path.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, dir) in self.aliases.iter() {
            if name.is_empty() || name.contains('/') {
                return Err(format!("alias name '{name}' must be a single path segment"));
            }
            if sanitize_relative_path(dir).is_err() {
                return Err(format!("alias '{name}' points outside the project: '{dir}'"));
            }
        }
        for (alias, dir) in &self.import_aliases {
            if alias.is_empty() {
                return Err("import alias names must not be empty".to_string());
            }
            if sanitize_relative_path(dir).is_err() {
                return Err(format!("import alias '{alias}' points outside the project: '{dir}'"));
            }
        }
        Ok(())
    }

    /// The ref to use: explicit, then pinned, then the global default.
    #[must_use]
    pub fn effective_ref(&self, explicit: Option<&str>, global: &GlobalConfig) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.git_ref.clone())
            .unwrap_or_else(|| global.default_ref.clone())
    }
}
