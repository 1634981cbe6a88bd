//! Installing registry components into a project.
//!
//! An install runs through fixed phases:
//!
//! ```text
//! Resolving → Fetching → Verifying → Transforming → Writing → Done
//!                                                   (Failed from any phase)
//! ```
//!
//! Everything up to `Writing` is pre-flight and touches nothing in the project:
//!
//! 1. **Resolving**: the registry index is loaded and the request expanded with
//!    its dependencies.
//! 2. **Fetching**: every target path is checked to stay inside the project, an
//!    offline run must find every file in the cache, and all files of the whole
//!    install are fetched as one batch.
//! 3. **Verifying**: every file is checked against its registry checksum and all
//!    mismatches are reported together.
//! 4. **Transforming**: `$greater/` imports are rewritten and each target is
//!    classified ([`FileAction`]). Any conflict aborts unless forced.
//!
//! `Writing` holds the project lock and proceeds component by component in install
//! order. A component's record in `.greater/installed.json` is saved only after
//! all of its files were written, so an interrupted install never records files
//! that are not on disk.

pub mod audit;
pub mod plan;
pub mod project_lock;

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::ComponentConfig;
use crate::core::GreaterError;
use crate::core::file_error::read_optional;
use crate::fetcher::{ContentSource, Fetcher, get_missing_from_cache};
use crate::installed::{InstalledComponent, InstalledFile, InstalledState};
use crate::integrity::{compute_checksum, compute_file_checksum, verify_multiple_checksums};
use crate::packages::install_packages;
use crate::registry::{FetchIndexOptions, RegistryClient, RegistryComponent, RegistryIndex};
use crate::resolver::DependencyResolver;
use crate::transform::{
    FileKind, PathMapping, TransformSummary, build_path_mappings, get_transform_summary,
    transform_imports, transform_path,
};
use crate::utils::fs::atomic_write;
use crate::utils::path_validation::{resolve_path_within_dir, sanitize_relative_path};
use crate::utils::progress::ProgressBar;

pub use audit::{AuditEntry, AuditReport, AuditStatus};
pub use plan::{ComponentPlan, FileAction, InstallReport, PlannedFile, determine_action};
pub use project_lock::ProjectLock;

const INSTALL_LOCK: &str = "install";

/// Where an install currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    Idle,
    Resolving,
    Fetching,
    Verifying,
    Transforming,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "Idle",
            Self::Resolving => "Resolving components",
            Self::Fetching => "Fetching files",
            Self::Verifying => "Verifying checksums",
            Self::Transforming => "Rewriting imports",
            Self::Writing => "Writing files",
            Self::Done => "Done",
            Self::Failed => "Failed",
        })
    }
}

/// Knobs for install, update, and diff.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Registry ref to install from
    pub git_ref: String,
    /// Plan only, write nothing
    pub dry_run: bool,
    /// Overwrite conflicting files
    pub force: bool,
    /// Downgrade checksum mismatches to warnings
    pub ignore_checksums: bool,
    /// Do not run the package manager
    pub skip_packages: bool,
}

/// Installs components into one project through a [`Fetcher`].
pub struct Installer<'a, S> {
    fetcher: &'a Fetcher<S>,
    project_dir: PathBuf,
    config: ComponentConfig,
    mappings: Vec<PathMapping>,
    progress: Option<ProgressBar>,
    phase: Mutex<InstallPhase>,
}

struct Target<'c> {
    component: &'c RegistryComponent,
    path: &'c str,
    checksum: &'c str,
    local_path: String,
    target: PathBuf,
}

impl<'a, S: ContentSource> Installer<'a, S> {
    pub fn new(
        fetcher: &'a Fetcher<S>,
        project_dir: impl Into<PathBuf>,
        config: ComponentConfig,
    ) -> Self {
        let mappings = build_path_mappings(&config);
        Self {
            fetcher,
            project_dir: project_dir.into(),
            config,
            mappings,
            progress: None,
            phase: Mutex::new(InstallPhase::Idle),
        }
    }

    /// Report phase changes on `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// The phase the last operation reached.
    pub fn phase(&self) -> InstallPhase {
        self.phase.lock().map(|p| *p).unwrap_or(InstallPhase::Failed)
    }

    fn enter(&self, phase: InstallPhase) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase;
        }
        tracing::info!(target: "installer", "{}", phase);
        if let Some(progress) = &self.progress {
            progress.set_message(phase.to_string());
        }
    }

    fn finish<T>(&self, result: Result<T>) -> Result<T> {
        self.enter(if result.is_ok() { InstallPhase::Done } else { InstallPhase::Failed });
        result
    }

    async fn load_index(&self, git_ref: &str) -> Result<RegistryIndex> {
        RegistryClient::new(self.fetcher)
            .fetch_registry_index(git_ref, FetchIndexOptions::default())
            .await
    }

    /// Install `names` and their dependencies.
    pub async fn install(
        &self,
        names: &[String],
        options: &InstallOptions,
    ) -> Result<InstallReport> {
        let result = self.install_inner(names, options).await;
        self.finish(result)
    }

    async fn install_inner(
        &self,
        names: &[String],
        options: &InstallOptions,
    ) -> Result<InstallReport> {
        self.enter(InstallPhase::Resolving);
        let index = self.load_index(&options.git_ref).await?;
        let resolution = DependencyResolver::new(&index).resolve(names)?;
        let installed = InstalledState::load(&self.project_dir)?;

        let mut report = self
            .prepare(&resolution.components, &resolution.requested, &installed, options)
            .await?;
        report.packages = resolution.packages;
        report.package_conflicts = resolution.package_conflicts;

        let conflicts = report.conflicts();
        if !conflicts.is_empty() && !options.force {
            return Err(GreaterError::InstallConflict {
                files: conflicts,
            }
            .into());
        }

        if options.dry_run {
            report.dry_run = true;
            return Ok(report);
        }

        self.write(&report, options).await?;

        if !options.skip_packages && !report.packages.is_empty() {
            report.installed_packages =
                install_packages(&self.project_dir, &report.packages).await?;
        }
        Ok(report)
    }

    /// Plan reinstalling installed components (all when `names` is empty) without writing.
    ///
    /// Dependencies are not expanded and conflicts are reported, not raised.
    pub async fn diff(&self, names: &[String], options: &InstallOptions) -> Result<InstallReport> {
        let result = self.diff_inner(names, options).await;
        self.finish(result)
    }

    async fn diff_inner(
        &self,
        names: &[String],
        options: &InstallOptions,
    ) -> Result<InstallReport> {
        let installed = InstalledState::load(&self.project_dir)?;
        let names = if names.is_empty() { installed.names() } else { names.to_vec() };
        if names.is_empty() {
            return Ok(InstallReport {
                git_ref: options.git_ref.clone(),
                dry_run: true,
                ..InstallReport::default()
            });
        }

        self.enter(InstallPhase::Resolving);
        let index = self.load_index(&options.git_ref).await?;
        let components = names
            .iter()
            .map(|name| {
                index.find_component(name).cloned().ok_or_else(|| {
                    anyhow::Error::from(GreaterError::ComponentNotFound {
                        name: name.clone(),
                        required_by: None,
                        suggestions: index.similar_names(name),
                    })
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = self.prepare(&components, &names, &installed, options).await?;
        report.dry_run = true;
        Ok(report)
    }

    /// Reinstall installed components (all when `names` is empty) at `options.git_ref`.
    ///
    /// New dependencies are installed too; unmodified files are replaced and edited
    /// ones are conflicts.
    pub async fn update(
        &self,
        names: &[String],
        options: &InstallOptions,
    ) -> Result<InstallReport> {
        let installed = match InstalledState::load(&self.project_dir) {
            Ok(state) => state,
            Err(e) => return self.finish(Err(e)),
        };
        let names = if names.is_empty() { installed.names() } else { names.to_vec() };

        if let Some(missing) = names.iter().find(|n| !installed.is_installed(n)) {
            return self.finish(Err(GreaterError::Other {
                message: format!(
                    "Component '{missing}' is not installed; use 'greater add {missing}'"
                ),
            }
            .into()));
        }
        if names.is_empty() {
            return self.finish(Ok(InstallReport {
                git_ref: options.git_ref.clone(),
                dry_run: options.dry_run,
                ..InstallReport::default()
            }));
        }
        self.install(&names, options).await
    }

    /// Compare every recorded file with what is on disk.
    pub async fn audit(&self) -> Result<AuditReport> {
        let installed = InstalledState::load(&self.project_dir)?;
        let mut report = AuditReport::default();

        for component in &installed.components {
            for file in &component.files {
                let target = resolve_path_within_dir(&self.project_dir, &file.local_path)?;
                let status = if !target.is_file() {
                    AuditStatus::Missing
                } else if compute_file_checksum(&target).await? == file.checksum {
                    AuditStatus::Ok
                } else {
                    AuditStatus::Modified
                };
                if status != AuditStatus::Ok {
                    tracing::debug!(
                        target: "installer",
                        "{} ({}): {}",
                        file.local_path,
                        component.name,
                        status
                    );
                }
                report.entries.push(AuditEntry {
                    component: component.name.clone(),
                    path: file.path.clone(),
                    local_path: file.local_path.clone(),
                    status,
                });
            }
        }
        Ok(report)
    }

    /// Pre-flight for `components`: check paths, fetch, verify, transform, classify.
    async fn prepare(
        &self,
        components: &[RegistryComponent],
        requested: &[String],
        installed: &InstalledState,
        options: &InstallOptions,
    ) -> Result<InstallReport> {
        let git_ref = options.git_ref.as_str();

        let mut targets = Vec::new();
        for component in components {
            for file in &component.files {
                let local_path =
                    sanitize_relative_path(&transform_path(&file.path, &self.mappings))?;
                let target = resolve_path_within_dir(&self.project_dir, &local_path)?;
                targets.push(Target {
                    component,
                    path: &file.path,
                    checksum: &file.checksum,
                    local_path,
                    target,
                });
            }
        }

        self.enter(InstallPhase::Fetching);
        let mut seen = HashSet::new();
        let paths: Vec<String> =
            targets.iter().filter(|t| seen.insert(t.path)).map(|t| t.path.to_string()).collect();

        if self.fetcher.is_offline() && self.fetcher.uses_cache() {
            let status = self.fetcher.cache_status(git_ref, &paths).await?;
            let missing = get_missing_from_cache(&paths, &status);
            if !missing.is_empty() {
                return Err(GreaterError::MissingFromCache {
                    git_ref: git_ref.to_string(),
                    files: missing,
                }
                .into());
            }
        }

        let mut expected = HashSet::new();
        let files: Vec<(String, String)> = targets
            .iter()
            .filter(|t| expected.insert(t.path))
            .map(|t| (t.path.to_string(), t.checksum.to_string()))
            .collect();
        let batch = self.fetcher.fetch_multiple_verified(git_ref, &files).await?;
        let resolved_ref = batch.resolved_ref.clone();
        let contents = batch.into_contents(git_ref)?;

        self.enter(InstallPhase::Verifying);
        let mut checked = HashSet::new();
        let results = verify_multiple_checksums(
            targets.iter().filter(|t| checked.insert(t.path)).filter_map(|t| {
                contents.get(t.path).map(|bytes| (t.path, bytes.as_slice(), t.checksum))
            }),
        );
        let mismatches: Vec<_> = results.into_iter().filter(|r| !r.valid).collect();

        let mut checksum_warnings = Vec::new();
        if !mismatches.is_empty() {
            if options.ignore_checksums {
                for m in &mismatches {
                    tracing::warn!(
                        target: "installer",
                        "Checksum mismatch for {} ignored (expected {}, got {})",
                        m.path,
                        m.expected,
                        m.actual
                    );
                    checksum_warnings.push(m.path.clone());
                }
            } else if let [m] = mismatches.as_slice() {
                return Err(GreaterError::ChecksumMismatch {
                    path: m.path.clone(),
                    expected: m.expected.clone(),
                    actual: m.actual.clone(),
                }
                .into());
            } else {
                return Err(GreaterError::IntegrityCheckFailed {
                    files: mismatches.into_iter().map(|m| m.path).collect(),
                }
                .into());
            }
        }

        self.enter(InstallPhase::Transforming);
        let mut plans: Vec<ComponentPlan> = components
            .iter()
            .map(|c| ComponentPlan {
                name: c.name.clone(),
                transitive: !requested.contains(&c.name),
                files: Vec::new(),
            })
            .collect();

        for t in targets {
            let raw = contents
                .get(t.path)
                .with_context(|| format!("Fetched content for {} went missing", t.path))?;
            let (content, summary) = self.transform_file(t.path, &t.local_path, raw);

            let existing =
                read_optional(&t.target, "comparing with the installed file", "installer::prepare")
                    .await?;
            let recorded = installed.find_file(&t.local_path).map(|(_, f)| f.checksum.as_str());
            let action = determine_action(existing.as_deref(), &content, recorded);
            tracing::debug!(target: "installer", "{} -> {}: {}", t.path, t.local_path, action);

            let file = PlannedFile {
                path: t.path.to_string(),
                local_path: t.local_path,
                target: t.target,
                checksum: compute_checksum(&content),
                source_checksum: t.checksum.to_string(),
                content,
                existing,
                action,
                summary,
            };
            if let Some(plan) = plans.iter_mut().find(|p| p.name == t.component.name) {
                plan.files.push(file);
            }
        }

        Ok(InstallReport {
            git_ref: git_ref.to_string(),
            resolved_ref,
            components: plans,
            checksum_warnings,
            ..InstallReport::default()
        })
    }

    fn transform_file(
        &self,
        path: &str,
        local_path: &str,
        raw: &[u8],
    ) -> (Vec<u8>, TransformSummary) {
        let kind = FileKind::from_path(path);
        if kind == FileKind::Other {
            return (raw.to_vec(), TransformSummary::default());
        }
        match std::str::from_utf8(raw) {
            Ok(text) => {
                let transformed = transform_imports(
                    text,
                    &self.mappings,
                    kind,
                    local_path,
                    &self.config.import_aliases,
                );
                let summary = get_transform_summary(text, &transformed);
                (transformed.into_bytes(), summary)
            }
            Err(_) => {
                tracing::debug!(target: "installer", "{} is not UTF-8, copying verbatim", path);
                (raw.to_vec(), TransformSummary::default())
            }
        }
    }

    async fn write(&self, report: &InstallReport, options: &InstallOptions) -> Result<()> {
        self.enter(InstallPhase::Writing);
        let _lock = ProjectLock::acquire(&self.project_dir, INSTALL_LOCK).await?;
        let mut state = InstalledState::load(&self.project_dir)?;

        for component in &report.components {
            let unchanged = !component.has_changes()
                && state.get(&component.name).is_some_and(|c| c.git_ref == report.git_ref);
            if unchanged {
                tracing::debug!(target: "installer", "{} is up to date", component.name);
                continue;
            }

            let writes: Vec<(PathBuf, Vec<u8>)> = component
                .files
                .iter()
                .filter(|f| f.needs_write(options.force))
                .map(|f| (f.target.clone(), f.content.clone()))
                .collect();
            let written = writes.len();
            tokio::task::spawn_blocking(move || -> Result<()> {
                for (target, content) in &writes {
                    atomic_write(target, content)?;
                }
                Ok(())
            })
            .await
            .context("File write task panicked")??;

            state.upsert(InstalledComponent {
                name: component.name.clone(),
                git_ref: report.git_ref.clone(),
                files: component
                    .files
                    .iter()
                    .map(|f| InstalledFile {
                        path: f.path.clone(),
                        local_path: f.local_path.clone(),
                        checksum: f.checksum.clone(),
                        source_checksum: f.source_checksum.clone(),
                    })
                    .collect(),
                installed_at: Utc::now(),
            });
            state.save(&self.project_dir)?;
            tracing::info!(
                target: "installer",
                "Installed {} ({} file(s) written)",
                component.name,
                written
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::test_utils::{MockSource, RegistryFixture, init_test_logging, sample_registry};
    use tempfile::TempDir;

    struct Env {
        _temp: TempDir,
        project: PathBuf,
        cache: PathBuf,
    }

    impl Env {
        fn new() -> Self {
            init_test_logging(None);
            let temp = TempDir::new().unwrap();
            let project = temp.path().join("project");
            std::fs::create_dir_all(&project).unwrap();
            let cache = temp.path().join("cache");
            Self {
                _temp: temp,
                project,
                cache,
            }
        }

        fn fetcher(&self, source: MockSource) -> Fetcher<MockSource> {
            Fetcher::new(source, CacheStore::new(&self.cache))
        }

        fn read(&self, local: &str) -> String {
            std::fs::read_to_string(self.project.join(local)).unwrap()
        }
    }

    fn options(git_ref: &str) -> InstallOptions {
        InstallOptions {
            git_ref: git_ref.to_string(),
            skip_packages: true,
            ..InstallOptions::default()
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    const BUTTON: &str = "src/lib/components/ui/Button.svelte";
    const ICON: &str = "src/lib/components/ui/Icon.svelte";

    #[tokio::test]
    async fn test_install_writes_dependencies_first_and_records() {
        let env = Env::new();
        let fetcher = env.fetcher(sample_registry("v1.0.0").mock_source());
        let installer = Installer::new(&fetcher, &env.project, ComponentConfig::default());

        let report = installer.install(&names(&["Button"]), &options("v1.0.0")).await.unwrap();
        assert_eq!(installer.phase(), InstallPhase::Done);

        let order: Vec<&str> = report.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(order, vec!["Icon", "utils", "Button"]);
        assert!(report.components[0].transitive);
        assert!(!report.components[2].transitive);
        assert_eq!(report.count(FileAction::Create), 3);
        assert_eq!(report.packages["clsx"], "^2.1.0");

        let button = env.read(BUTTON);
        assert!(button.contains("import Icon from '$lib/components/ui/Icon.svelte';"));
        assert!(button.contains("import { cn } from '$lib/components/ui/utils/cn.ts';"));
        assert!(env.project.join(ICON).is_file());

        let state = InstalledState::load(&env.project).unwrap();
        assert_eq!(state.names(), vec!["Button", "Icon", "utils"]);
        let (owner, file) = state.find_file(BUTTON).unwrap();
        assert_eq!(owner.git_ref, "v1.0.0");
        assert_eq!(file.checksum, compute_checksum(button.as_bytes()));
        assert_ne!(file.checksum, file.source_checksum);
    }

    #[tokio::test]
    async fn test_reinstall_unmodified_is_noop() {
        let env = Env::new();
        let fetcher = env.fetcher(sample_registry("v1.0.0").mock_source());
        let installer = Installer::new(&fetcher, &env.project, ComponentConfig::default());
        installer.install(&names(&["Button"]), &options("v1.0.0")).await.unwrap();
        let before = std::fs::read_to_string(InstalledState::path_in(&env.project)).unwrap();

        let report = installer.install(&names(&["Button"]), &options("v1.0.0")).await.unwrap();
        assert!(!report.has_changes());
        assert_eq!(report.count(FileAction::UpToDate), 3);
        let after = std::fs::read_to_string(InstalledState::path_in(&env.project)).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_local_edit_is_conflict_unless_forced() {
        let env = Env::new();
        let fetcher = env.fetcher(sample_registry("v1.0.0").mock_source());
        let installer = Installer::new(&fetcher, &env.project, ComponentConfig::default());
        installer.install(&names(&["Icon"]), &options("v1.0.0")).await.unwrap();
        std::fs::write(env.project.join(ICON), "<!-- mine -->").unwrap();

        let err = installer.install(&names(&["Icon"]), &options("v1.0.0")).await.unwrap_err();
        assert_eq!(installer.phase(), InstallPhase::Failed);
        match err.downcast_ref::<GreaterError>() {
            Some(GreaterError::InstallConflict {
                files,
            }) => assert_eq!(files, &vec![ICON.to_string()]),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(env.read(ICON), "<!-- mine -->");

        let forced = InstallOptions {
            force: true,
            ..options("v1.0.0")
        };
        installer.install(&names(&["Icon"]), &forced).await.unwrap();
        assert_ne!(env.read(ICON), "<!-- mine -->");
    }

    #[tokio::test]
    async fn test_untracked_existing_file_is_conflict() {
        let env = Env::new();
        std::fs::create_dir_all(env.project.join("src/lib/components/ui")).unwrap();
        std::fs::write(env.project.join(ICON), "hand written").unwrap();
        let fetcher = env.fetcher(sample_registry("v1.0.0").mock_source());
        let installer = Installer::new(&fetcher, &env.project, ComponentConfig::default());

        let err = installer.install(&names(&["Icon"]), &options("v1.0.0")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GreaterError>(),
            Some(GreaterError::InstallConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_writes_nothing() {
        let env = Env::new();
        let fixture = sample_registry("v1.0.0")
            .with_served_content("lib/Button.svelte", "<button>evil</button>");
        let fetcher = env.fetcher(fixture.mock_source());
        let installer = Installer::new(&fetcher, &env.project, ComponentConfig::default());

        let err = installer.install(&names(&["Button"]), &options("v1.0.0")).await.unwrap_err();
        match err.downcast_ref::<GreaterError>() {
            Some(GreaterError::ChecksumMismatch {
                path,
                ..
            }) => assert_eq!(path, "lib/Button.svelte"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!env.project.join("src").exists());
        assert!(!InstalledState::path_in(&env.project).exists());

        let bypass = InstallOptions {
            ignore_checksums: true,
            ..options("v1.0.0")
        };
        let report = installer.install(&names(&["Button"]), &bypass).await.unwrap();
        assert_eq!(report.checksum_warnings, vec!["lib/Button.svelte"]);
        assert_eq!(env.read(BUTTON), "<button>evil</button>");
    }

    #[tokio::test]
    async fn test_bad_response_does_not_poison_cache() {
        let env = Env::new();
        let tampered =
            sample_registry("v1.0.0").with_served_content("lib/Icon.svelte", "<svg>evil</svg>");
        let fetcher = env.fetcher(tampered.mock_source());
        let err = Installer::new(&fetcher, &env.project, ComponentConfig::default())
            .install(&names(&["Icon"]), &options("v1.0.0"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GreaterError>(),
            Some(GreaterError::ChecksumMismatch { .. })
        ));

        // Upstream is healthy again; the next install must not be stuck on cached bytes
        let good = sample_registry("v1.0.0").mock_source();
        let fetcher = env.fetcher(good.clone());
        let report = Installer::new(&fetcher, &env.project, ComponentConfig::default())
            .install(&names(&["Icon"]), &options("v1.0.0"))
            .await
            .unwrap();
        assert_eq!(report.count(FileAction::Create), 1);
        assert_eq!(good.fetch_count(), 1);
        assert!(env.read(ICON).contains("data-icon"));
    }

    #[tokio::test]
    async fn test_offline_partial_cache_names_missing_files() {
        let env = Env::new();
        let source = sample_registry("v1.0.0").mock_source();
        let online = env.fetcher(source.clone());
        Installer::new(&online, &env.project, ComponentConfig::default())
            .install(&names(&["Icon"]), &options("v1.0.0"))
            .await
            .unwrap();

        let other_project = env.project.with_file_name("other");
        std::fs::create_dir_all(&other_project).unwrap();
        let offline = env.fetcher(source).offline(true);
        let err = Installer::new(&offline, &other_project, ComponentConfig::default())
            .install(&names(&["Button"]), &options("v1.0.0"))
            .await
            .unwrap_err();
        match err.downcast_ref::<GreaterError>() {
            Some(GreaterError::MissingFromCache {
                files,
                ..
            }) => assert_eq!(
                files,
                &vec!["lib/utils/cn.ts".to_string(), "lib/Button.svelte".to_string()]
            ),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(std::fs::read_dir(&other_project).unwrap().next().is_none());

        // Everything cached: offline succeeds
        let report = Installer::new(&offline, &other_project, ComponentConfig::default())
            .install(&names(&["Icon"]), &options("v1.0.0"))
            .await
            .unwrap();
        assert_eq!(report.count(FileAction::Create), 1);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let env = Env::new();
        let fetcher = env.fetcher(sample_registry("v1.0.0").mock_source());
        let installer = Installer::new(&fetcher, &env.project, ComponentConfig::default());
        let dry = InstallOptions {
            dry_run: true,
            ..options("v1.0.0")
        };
        let report = installer.install(&names(&["Button"]), &dry).await.unwrap();
        assert!(report.dry_run);
        assert_eq!(report.count(FileAction::Create), 3);
        let (_, button) = report.files().find(|(c, _)| *c == "Button").unwrap();
        assert_eq!(button.summary.changed_imports, 2);
        assert!(!env.project.join("src").exists());
    }

    #[tokio::test]
    async fn test_update_diff_and_audit() {
        let env = Env::new();
        let v1 = sample_registry("v1.0.0");
        let v2 = RegistryFixture::new("v2.0.0")
            .with_component("Icon", &[("lib/Icon.svelte", "<svg class=\"icon-v2\"></svg>\n")], &[]);
        let source = v1.mock_source().merge(&v2.mock_source());
        let fetcher = env.fetcher(source);
        let installer = Installer::new(&fetcher, &env.project, ComponentConfig::default());
        installer.install(&names(&["Icon", "theme"]), &options("v1.0.0")).await.unwrap();

        let diff = installer.diff(&names(&["Icon"]), &options("v2.0.0")).await.unwrap();
        assert_eq!(diff.count(FileAction::Update), 1);
        assert!(diff.dry_run);

        let report = installer.update(&names(&["Icon"]), &options("v2.0.0")).await.unwrap();
        assert_eq!(report.count(FileAction::Update), 1);
        assert_eq!(env.read(ICON), "<svg class=\"icon-v2\"></svg>\n");
        let state = InstalledState::load(&env.project).unwrap();
        assert_eq!(state.get("Icon").unwrap().git_ref, "v2.0.0");
        assert_eq!(state.get("theme").unwrap().git_ref, "v1.0.0");

        let err = installer.update(&names(&["Button"]), &options("v2.0.0")).await.unwrap_err();
        assert!(err.to_string().contains("not installed"));

        assert!(installer.audit().await.unwrap().is_clean());
        std::fs::write(env.project.join(ICON), "edited").unwrap();
        std::fs::remove_file(env.project.join("src/lib/components/shared/theme.css")).unwrap();
        let audit = installer.audit().await.unwrap();
        assert_eq!(audit.count(AuditStatus::Modified), 1);
        assert_eq!(audit.count(AuditStatus::Missing), 1);
        assert!(!audit.is_clean());
    }

    #[tokio::test]
    async fn test_unknown_component_suggests() {
        let env = Env::new();
        let fetcher = env.fetcher(sample_registry("v1.0.0").mock_source());
        let installer = Installer::new(&fetcher, &env.project, ComponentConfig::default());
        let err = installer.install(&names(&["Buton"]), &options("v1.0.0")).await.unwrap_err();
        match err.downcast_ref::<GreaterError>() {
            Some(GreaterError::ComponentNotFound {
                suggestions,
                ..
            }) => assert_eq!(suggestions.first().map(String::as_str), Some("Button")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
