//! Test utilities for greater
//!
//! - [`MockSource`]: an in-memory [`ContentSource`] that counts its calls
//! - [`RegistryFixture`]: a registry (index plus files with correct checksums)
//!   that can be served from memory or written out as a local checkout for
//!   `GREATER_LOCAL_REPO`
//! - [`init_test_logging`]: tracing output for tests
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite.

use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::constants::REGISTRY_INDEX_PATH;
use crate::core::GreaterError;
use crate::fetcher::ContentSource;
use crate::integrity::compute_checksum;
use crate::registry::{ComponentDependency, FileEntry, RegistryComponent, RegistryIndex};

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither nothing is logged.
///
/// ```bash
/// RUST_LOG=fetcher=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

#[derive(Default)]
struct MockState {
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    refs: Mutex<HashMap<String, String>>,
    unreachable: AtomicBool,
    resolves: AtomicUsize,
    fetches: AtomicUsize,
}

/// In-memory content source.
///
/// Clones share state, so a test can keep one handle to read the counters while a
/// fetcher owns another.
#[derive(Clone, Default)]
pub struct MockSource {
    state: Arc<MockState>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the floating `name` resolve to `sha`.
    #[must_use]
    pub fn with_ref(self, name: &str, sha: &str) -> Self {
        if let Ok(mut refs) = self.state.refs.lock() {
            refs.insert(name.to_string(), sha.to_string());
        }
        self
    }

    /// Serve `content` for `path` at `git_ref`.
    #[must_use]
    pub fn with_file(self, git_ref: &str, path: &str, content: &[u8]) -> Self {
        if let Ok(mut files) = self.state.files.lock() {
            files.insert((git_ref.to_string(), path.to_string()), content.to_vec());
        }
        self
    }

    /// Also serve everything `other` serves.
    #[must_use]
    pub fn merge(self, other: &MockSource) -> Self {
        let theirs = other.state.files.lock().map(|f| f.clone()).unwrap_or_default();
        let their_refs = other.state.refs.lock().map(|r| r.clone()).unwrap_or_default();
        if let Ok(mut files) = self.state.files.lock() {
            files.extend(theirs);
        }
        if let Ok(mut refs) = self.state.refs.lock() {
            refs.extend(their_refs);
        }
        self
    }

    /// Fail every request as a network error.
    #[must_use]
    pub fn unreachable(self) -> Self {
        self.state.unreachable.store(true, Ordering::SeqCst);
        self
    }

    /// Number of `resolve_ref` calls so far.
    pub fn resolve_count(&self) -> usize {
        self.state.resolves.load(Ordering::SeqCst)
    }

    /// Number of `fetch_file` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    fn network_error(&self, operation: String, reason: &str) -> anyhow::Error {
        GreaterError::NetworkError {
            operation,
            reason: reason.to_string(),
        }
        .into()
    }
}

impl ContentSource for MockSource {
    async fn fetch_file(&self, git_ref: &str, path: &str) -> Result<Vec<u8>> {
        self.state.fetches.fetch_add(1, Ordering::SeqCst);
        let operation = format!("fetching {path}@{git_ref}");
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(self.network_error(operation, "connection refused"));
        }
        let files = self.state.files.lock().map_err(|_| anyhow!("mock state poisoned"))?;
        match files.get(&(git_ref.to_string(), path.to_string())) {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(self.network_error(operation, "HTTP 404 Not Found")),
        }
    }

    async fn resolve_ref(&self, git_ref: &str) -> Result<String> {
        self.state.resolves.fetch_add(1, Ordering::SeqCst);
        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(self.network_error(format!("resolving {git_ref}"), "connection refused"));
        }
        let refs = self.state.refs.lock().map_err(|_| anyhow!("mock state poisoned"))?;
        refs.get(git_ref).cloned().ok_or_else(|| {
            GreaterError::GitCommandError {
                operation: format!("ls-remote {git_ref}"),
                stderr: format!("ref '{git_ref}' not found"),
            }
            .into()
        })
    }

    async fn is_reachable(&self) -> bool {
        !self.state.unreachable.load(Ordering::SeqCst)
    }

    fn is_local(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        "mock source".to_string()
    }
}

/// A registry built in memory.
///
/// Checksums are computed from the files added; [`with_served_content`] changes
/// what is served without touching the index, to simulate tampering.
///
/// [`with_served_content`]: RegistryFixture::with_served_content
#[derive(Debug, Clone)]
pub struct RegistryFixture {
    git_ref: String,
    components: Vec<RegistryComponent>,
    files: BTreeMap<String, Vec<u8>>,
}

impl RegistryFixture {
    pub fn new(git_ref: &str) -> Self {
        Self {
            git_ref: git_ref.to_string(),
            components: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    /// Add a component with `files` as `(virtual path, content)` and component `deps`.
    #[must_use]
    pub fn with_component(mut self, name: &str, files: &[(&str, &str)], deps: &[&str]) -> Self {
        let entries = files
            .iter()
            .map(|(path, content)| {
                self.files.insert((*path).to_string(), content.as_bytes().to_vec());
                FileEntry {
                    path: (*path).to_string(),
                    checksum: compute_checksum(content.as_bytes()),
                }
            })
            .collect();
        self.components.push(RegistryComponent {
            name: name.to_string(),
            description: Some(format!("{name} component")),
            files: entries,
            dependencies: deps
                .iter()
                .map(|d| ComponentDependency::Component((*d).to_string()))
                .collect(),
        });
        self
    }

    /// Declare an external package requirement on `component`.
    #[must_use]
    pub fn with_package(mut self, component: &str, name: &str, version: &str) -> Self {
        if let Some(c) = self.components.iter_mut().find(|c| c.name == component) {
            c.dependencies.push(ComponentDependency::Package {
                name: name.to_string(),
                version: version.to_string(),
            });
        }
        self
    }

    /// Serve `content` for `path` while the index keeps the original checksum.
    #[must_use]
    pub fn with_served_content(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.as_bytes().to_vec());
        self
    }

    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    pub fn index(&self) -> RegistryIndex {
        RegistryIndex {
            git_ref: self.git_ref.clone(),
            components: self.components.clone(),
        }
    }

    pub fn index_json(&self) -> String {
        serde_json::to_string_pretty(&self.index()).unwrap_or_default()
    }

    /// A source serving this registry at its ref.
    pub fn mock_source(&self) -> MockSource {
        self.files.iter().fold(
            MockSource::new().with_file(
                &self.git_ref,
                REGISTRY_INDEX_PATH,
                self.index_json().as_bytes(),
            ),
            |source, (path, content)| source.with_file(&self.git_ref, path, content),
        )
    }

    /// Write the registry as a checkout under `root`.
    pub fn write_checkout(&self, root: &Path) -> Result<()> {
        for (path, content) in &self.files {
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(target, content)?;
        }
        let index = root.join(REGISTRY_INDEX_PATH);
        if let Some(parent) = index.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(index, self.index_json())?;
        Ok(())
    }
}

/// A small registry: `Button` depends on `Icon` and `utils` and needs `clsx`;
/// `theme` is a standalone stylesheet.
pub fn sample_registry(git_ref: &str) -> RegistryFixture {
    RegistryFixture::new(git_ref)
        .with_component(
            "Icon",
            &[(
                "lib/Icon.svelte",
                "<script lang=\"ts\">\n  export let name: string;\n</script>\n\n\
                 <svg data-icon={name}></svg>\n",
            )],
            &[],
        )
        .with_component(
            "utils",
            &[(
                "lib/utils/cn.ts",
                "export function cn(...classes: string[]) {\n  \
                 return classes.filter(Boolean).join(' ');\n}\n",
            )],
            &[],
        )
        .with_component(
            "Button",
            &[(
                "lib/Button.svelte",
                "<script lang=\"ts\">\n  \
                 import Icon from '$greater/lib/Icon.svelte';\n  \
                 import { cn } from '$greater/lib/utils/cn.ts';\n\
                 </script>\n\n\
                 <button class={cn('btn')}><Icon name=\"x\" /></button>\n",
            )],
            &["Icon", "utils"],
        )
        .with_package("Button", "clsx", "^2.1.0")
        .with_component("theme", &[("shared/theme.css", ":root {\n  --accent: #4f46e5;\n}\n")], &[])
}

/// Index JSON of [`sample_registry`].
pub fn sample_index_json(git_ref: &str) -> String {
    sample_registry(git_ref).index_json()
}
