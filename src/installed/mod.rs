//! Record of what greater installed into a project (`.greater/installed.json`).
//!
//! Each [`InstalledFile`] keeps two digests:
//! - `checksum`: the bytes written to disk, after import rewriting. Comparing the
//!   file on disk against it tells whether the user edited the file.
//! - `sourceChecksum`: the registry checksum of the fetched bytes, used to tell
//!   whether upstream changed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{INSTALLED_FILE_NAME, STATE_DIR_NAME};
use crate::core::GreaterError;
use crate::utils::fs::{read_text_file, write_json_file};

/// Current format version of `installed.json`.
pub const INSTALLED_STATE_VERSION: u32 = 1;

/// One installed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledFile {
    /// Registry-virtual path
    pub path: String,
    /// Project-relative path it was written to
    pub local_path: String,
    /// Digest of the written bytes
    pub checksum: String,
    /// Registry digest of the fetched bytes
    pub source_checksum: String,
}

/// One installed component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledComponent {
    pub name: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub files: Vec<InstalledFile>,
    pub installed_at: DateTime<Utc>,
}

impl InstalledComponent {
    /// Record for `local_path`, if this component owns it.
    pub fn file_by_local_path(&self, local_path: &str) -> Option<&InstalledFile> {
        self.files.iter().find(|f| f.local_path == local_path)
    }
}

/// Everything installed in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledState {
    pub version: u32,
    #[serde(default)]
    pub components: Vec<InstalledComponent>,
}

impl Default for InstalledState {
    fn default() -> Self {
        Self {
            version: INSTALLED_STATE_VERSION,
            components: Vec::new(),
        }
    }
}

impl InstalledState {
    /// `<project>/.greater/installed.json`
    #[must_use]
    pub fn path_in(project_dir: &Path) -> PathBuf {
        project_dir.join(STATE_DIR_NAME).join(INSTALLED_FILE_NAME)
    }

    /// Load the state of `project_dir`; a missing file is an empty state.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::path_in(project_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = read_text_file(&path)?;
        let state: Self =
            serde_json::from_str(&content).map_err(|e| GreaterError::ConfigParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;
        if state.version > INSTALLED_STATE_VERSION {
            return Err(GreaterError::ConfigParseError {
                file: path.display().to_string(),
                reason: format!(
                    "written by a newer greater (format {}, this build understands {})",
                    state.version, INSTALLED_STATE_VERSION
                ),
            }
            .into());
        }
        Ok(state)
    }

    /// Write the state atomically, components sorted by name.
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let mut sorted = self.clone();
        sorted.version = INSTALLED_STATE_VERSION;
        sorted.components.sort_by(|a, b| a.name.cmp(&b.name));
        write_json_file(&Self::path_in(project_dir), &sorted, true)
    }

    pub fn get(&self, name: &str) -> Option<&InstalledComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn is_installed(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace the record for `component.name`.
    pub fn upsert(&mut self, component: InstalledComponent) {
        match self.components.iter_mut().find(|c| c.name == component.name) {
            Some(existing) => *existing = component,
            None => self.components.push(component),
        }
    }

    /// The recorded file written to `local_path`, with its owning component.
    pub fn find_file(&self, local_path: &str) -> Option<(&InstalledComponent, &InstalledFile)> {
        self.components
            .iter()
            .find_map(|c| c.file_by_local_path(local_path).map(|f| (c, f)))
    }

    /// Names of all installed components, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.components.iter().map(|c| c.name.clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn component(name: &str, local: &str) -> InstalledComponent {
        InstalledComponent {
            name: name.to_string(),
            git_ref: "v1.0.0".to_string(),
            files: vec![InstalledFile {
                path: format!("lib/{name}.svelte"),
                local_path: local.to_string(),
                checksum: "sha256:aa".to_string(),
                source_checksum: "sha256:bb".to_string(),
            }],
            installed_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let temp = TempDir::new().unwrap();
        let state = InstalledState::load(temp.path()).unwrap();
        assert_eq!(state.version, INSTALLED_STATE_VERSION);
        assert!(state.components.is_empty());
    }

    #[test]
    fn test_save_load_uses_camel_case() {
        let temp = TempDir::new().unwrap();
        let mut state = InstalledState::default();
        state.upsert(component("Icon", "src/ui/Icon.svelte"));
        state.upsert(component("Button", "src/ui/Button.svelte"));
        state.save(temp.path()).unwrap();

        let raw = std::fs::read_to_string(InstalledState::path_in(temp.path())).unwrap();
        assert!(raw.contains("\"localPath\""));
        assert!(raw.contains("\"sourceChecksum\""));
        assert!(raw.contains("\"installedAt\""));
        assert!(raw.contains("\"ref\": \"v1.0.0\""));

        let loaded = InstalledState::load(temp.path()).unwrap();
        assert_eq!(loaded.names(), vec!["Button", "Icon"]);
        assert_eq!(loaded.components[0].name, "Button");
    }

    #[test]
    fn test_upsert_replaces_and_find_file() {
        let mut state = InstalledState::default();
        state.upsert(component("Button", "a/Button.svelte"));
        state.upsert(component("Button", "b/Button.svelte"));
        assert_eq!(state.components.len(), 1);

        let (owner, file) = state.find_file("b/Button.svelte").unwrap();
        assert_eq!(owner.name, "Button");
        assert_eq!(file.path, "lib/Button.svelte");
        assert!(state.find_file("a/Button.svelte").is_none());
        assert!(state.is_installed("Button"));
    }

    #[test]
    fn test_newer_format_rejected() {
        let temp = TempDir::new().unwrap();
        let path = InstalledState::path_in(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "version": 99, "components": [] }"#).unwrap();
        assert!(InstalledState::load(temp.path()).is_err());
    }
}
