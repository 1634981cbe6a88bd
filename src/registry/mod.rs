//! Registry index model.
//!
//! The registry index (`registry/index.json` in the component monorepo) lists every
//! installable component with its files, their checksums, and its dependencies:
//!
//! ```json
//! {
//!   "ref": "v1.2.0",
//!   "components": [
//!     {
//!       "name": "Button",
//!       "description": "Accessible button",
//!       "files": [{ "path": "lib/Button.svelte", "checksum": "sha256:…" }],
//!       "dependencies": ["Icon", { "name": "clsx", "version": "^2.1.0" }]
//!     }
//!   ]
//! }
//! ```
//!
//! A string dependency names another component in the same registry; an object
//! dependency is an external npm-style package requirement.
//!
//! An index is immutable for the ref it was fetched at. Lookups here are pure:
//! expected "not found" answers are booleans or `Option`s, never errors.

pub mod client;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::GreaterError;
use crate::integrity::is_valid_checksum;
use crate::utils::path_validation::sanitize_relative_path;

pub use client::{FetchIndexOptions, RegistryClient};

/// A file belonging to a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Registry-virtual path, e.g. `lib/Button.svelte`
    pub path: String,
    /// `sha256:<hex>` digest of the raw content
    pub checksum: String,
}

/// A dependency declared by a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentDependency {
    /// Another component of the same registry
    Component(String),
    /// An external package requirement
    Package {
        /// Package name
        name: String,
        /// Version requirement as the package manager understands it
        version: String,
    },
}

/// One installable component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryComponent {
    /// Unique component name
    pub name: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Files making up the component
    pub files: Vec<FileEntry>,
    /// Internal and external dependencies
    #[serde(default)]
    pub dependencies: Vec<ComponentDependency>,
}

impl RegistryComponent {
    /// Names of the internal components this one depends on, in declaration order.
    pub fn component_dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().filter_map(|d| match d {
            ComponentDependency::Component(name) => Some(name.as_str()),
            ComponentDependency::Package { .. } => None,
        })
    }

    /// External package requirements as `(name, version)`.
    pub fn package_dependencies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies.iter().filter_map(|d| match d {
            ComponentDependency::Package {
                name,
                version,
            } => Some((name.as_str(), version.as_str())),
            ComponentDependency::Component(_) => None,
        })
    }
}

/// The registry manifest at one ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryIndex {
    /// Ref the index was published for
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// All installable components
    pub components: Vec<RegistryComponent>,
}

impl RegistryIndex {
    /// Parse and validate index JSON.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let index: Self =
            serde_json::from_slice(bytes).map_err(|e| GreaterError::RegistryIndexError {
                reason: format!("malformed index JSON: {e}"),
            })?;
        index.validate()?;
        Ok(index)
    }

    /// Check the structural invariants of the index.
    ///
    /// Names are non-empty and unique, every component has at least one file,
    /// file paths are safe relative paths without duplicates, checksums are
    /// well-formed, and package requirements are complete.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for component in &self.components {
            let name = component.name.trim();
            if name.is_empty() {
                return Err(index_error("component with an empty name"));
            }
            if !names.insert(name) {
                return Err(index_error(format!("duplicate component '{name}'")));
            }
            if component.files.is_empty() {
                return Err(index_error(format!("component '{name}' has no files")));
            }

            let mut paths = HashSet::new();
            for file in &component.files {
                let Ok(normalized) = sanitize_relative_path(&file.path) else {
                    return Err(index_error(format!(
                        "component '{name}' lists unsafe path '{}'",
                        file.path
                    )));
                };
                // `./lib/a.ts` and `lib\a.ts` name the same file as `lib/a.ts`
                if !paths.insert(normalized) {
                    return Err(index_error(format!(
                        "component '{name}' lists '{}' twice",
                        file.path
                    )));
                }
                if !is_valid_checksum(&file.checksum) {
                    return Err(index_error(format!(
                        "component '{name}' has a malformed checksum for '{}'",
                        file.path
                    )));
                }
            }

            for dependency in &component.dependencies {
                match dependency {
                    ComponentDependency::Component(dep) if dep.trim().is_empty() => {
                        return Err(index_error(format!(
                            "component '{name}' declares an empty dependency"
                        )));
                    }
                    ComponentDependency::Package {
                        name: pkg,
                        version,
                    } if pkg.trim().is_empty() || version.trim().is_empty() => {
                        return Err(index_error(format!(
                            "component '{name}' declares a package without name or version"
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Look up a component by exact name.
    #[must_use]
    pub fn find_component(&self, name: &str) -> Option<&RegistryComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Whether the registry contains `name`.
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.find_component(name).is_some()
    }

    /// `(path, checksum)` of every file of `name`, empty when unknown.
    #[must_use]
    pub fn component_checksums(&self, name: &str) -> Vec<(String, String)> {
        self.find_component(name)
            .map(|c| c.files.iter().map(|f| (f.path.clone(), f.checksum.clone())).collect())
            .unwrap_or_default()
    }

    /// Virtual paths of every file of `name`, empty when unknown.
    #[must_use]
    pub fn component_file_paths(&self, name: &str) -> Vec<String> {
        self.find_component(name)
            .map(|c| c.files.iter().map(|f| f.path.clone()).collect())
            .unwrap_or_default()
    }

    /// Up to three component names close to `name`, closest first.
    #[must_use]
    pub fn similar_names(&self, name: &str) -> Vec<String> {
        let needle = name.to_lowercase();
        let mut scored: Vec<(usize, &str)> = self
            .components
            .iter()
            .map(|c| (strsim::levenshtein(&needle, &c.name.to_lowercase()), c.name.as_str()))
            .filter(|(distance, candidate)| {
                *distance <= (needle.len() / 3).max(2)
                    || candidate.to_lowercase().contains(&needle)
            })
            .collect();
        scored.sort();
        scored.into_iter().take(3).map(|(_, n)| n.to_string()).collect()
    }
}

fn index_error(reason: impl Into<String>) -> anyhow::Error {
    GreaterError::RegistryIndexError {
        reason: reason.into(),
    }
    .into()
}
