//! Installing the npm packages components depend on.
//!
//! The package manager is picked from the project's lockfile, and packages the
//! project's `package.json` already declares are skipped.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::core::GreaterError;
use crate::utils::platform::command_exists;

/// A JavaScript package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl PackageManager {
    /// Manager owning the lockfile in `project_dir`, npm when there is none.
    pub fn detect(project_dir: &Path) -> Self {
        let lockfiles = [
            ("pnpm-lock.yaml", Self::Pnpm),
            ("yarn.lock", Self::Yarn),
            ("bun.lockb", Self::Bun),
            ("bun.lock", Self::Bun),
        ];
        lockfiles
            .into_iter()
            .find(|(file, _)| project_dir.join(file).is_file())
            .map_or(Self::Npm, |(_, manager)| manager)
    }

    /// Executable name.
    #[must_use]
    pub fn command(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Bun => "bun",
        }
    }

    /// Arguments adding `specs` to the project.
    pub fn install_args(&self, specs: &[String]) -> Vec<String> {
        let verb = match self {
            Self::Npm => "install",
            Self::Pnpm | Self::Yarn | Self::Bun => "add",
        };
        std::iter::once(verb.to_string()).chain(specs.iter().cloned()).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, String>,
}

/// `name@version` specs for `packages`.
pub fn package_specs(packages: &BTreeMap<String, String>) -> Vec<String> {
    packages.iter().map(|(name, version)| format!("{name}@{version}")).collect()
}

/// The subset of `packages` that `package.json` in `project_dir` does not declare.
///
/// Without a readable `package.json` every package is missing.
pub fn missing_packages(
    project_dir: &Path,
    packages: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let manifest: PackageJson = std::fs::read_to_string(project_dir.join("package.json"))
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default();

    packages
        .iter()
        .filter(|(name, _)| {
            !manifest.dependencies.contains_key(*name)
                && !manifest.dev_dependencies.contains_key(*name)
                && !manifest.peer_dependencies.contains_key(*name)
        })
        .map(|(n, v)| (n.clone(), v.clone()))
        .collect()
}

/// Install the packages `project_dir` is missing. Returns what was installed.
pub async fn install_packages(
    project_dir: &Path,
    packages: &BTreeMap<String, String>,
) -> Result<Vec<String>> {
    let missing = missing_packages(project_dir, packages);
    if missing.is_empty() {
        tracing::debug!(target: "packages", "All {} package(s) already declared", packages.len());
        return Ok(Vec::new());
    }

    let manager = PackageManager::detect(project_dir);
    if !command_exists(manager.command()) {
        return Err(GreaterError::PackageInstallFailed {
            manager: manager.to_string(),
            reason: format!("'{}' was not found on PATH", manager.command()),
        }
        .into());
    }

    let specs = package_specs(&missing);
    let args = manager.install_args(&specs);
    tracing::info!(target: "packages", "Running {} {}", manager, args.join(" "));

    let output = Command::new(manager.command())
        .args(&args)
        .current_dir(project_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to run {manager}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(10).collect();
        return Err(GreaterError::PackageInstallFailed {
            manager: manager.to_string(),
            reason: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
        }
        .into());
    }
    Ok(specs)
}
