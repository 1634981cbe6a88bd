//! Library-level runs of the fetch, verify, transform, and write pipeline.

use greater_cli::cache::CacheStore;
use greater_cli::config::ComponentConfig;
use greater_cli::fetcher::{Fetcher, LocalRepoSource};
use greater_cli::installer::{FileAction, InstallOptions, Installer};
use greater_cli::test_utils::{MockSource, RegistryFixture, sample_registry};
use tempfile::TempDir;

use crate::common::{BUTTON, THEME};

const SHA: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

fn options(git_ref: &str) -> InstallOptions {
    InstallOptions {
        git_ref: git_ref.to_string(),
        skip_packages: true,
        ..InstallOptions::default()
    }
}

fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

#[tokio::test]
async fn test_pinned_ref_is_fetched_once_across_projects() {
    let temp = TempDir::new().unwrap();
    let cache = temp.path().join("cache");
    let source = sample_registry("v1.0.0").mock_source();

    let first_project = temp.path().join("first");
    std::fs::create_dir_all(&first_project).unwrap();
    let fetcher = Fetcher::new(source.clone(), CacheStore::new(&cache));
    let report = Installer::new(&fetcher, &first_project, ComponentConfig::default())
        .install(&names(&["Button"]), &options("v1.0.0"))
        .await
        .unwrap();
    assert_eq!(report.count(FileAction::Create), 3);
    let fetches = source.fetch_count();

    let second_project = temp.path().join("second");
    std::fs::create_dir_all(&second_project).unwrap();
    let fetcher = Fetcher::new(source.clone(), CacheStore::new(&cache));
    Installer::new(&fetcher, &second_project, ComponentConfig::default())
        .install(&names(&["Button"]), &options("v1.0.0"))
        .await
        .unwrap();

    assert_eq!(source.fetch_count(), fetches);
    assert_eq!(source.resolve_count(), 0);
    assert!(second_project.join(BUTTON).is_file());
}

#[tokio::test]
async fn test_floating_ref_works_offline_after_one_online_run() {
    let temp = TempDir::new().unwrap();
    let cache = temp.path().join("cache");
    // Content lives at the commit; `main` points at it
    let source = RegistryFixture::new(SHA)
        .with_component("theme", &[("shared/theme.css", ":root {}\n")], &[])
        .mock_source()
        .with_ref("main", SHA);

    let online_project = temp.path().join("online");
    std::fs::create_dir_all(&online_project).unwrap();
    let fetcher = Fetcher::new(source.clone(), CacheStore::new(&cache));
    let report = Installer::new(&fetcher, &online_project, ComponentConfig::default())
        .install(&names(&["theme"]), &options("main"))
        .await
        .unwrap();
    assert_eq!(report.resolved_ref, SHA);
    assert_eq!(source.resolve_count(), 1);

    let offline_project = temp.path().join("offline");
    std::fs::create_dir_all(&offline_project).unwrap();
    let offline = Fetcher::new(source.clone().unreachable(), CacheStore::new(&cache)).offline(true);
    Installer::new(&offline, &offline_project, ComponentConfig::default())
        .install(&names(&["theme"]), &options("main"))
        .await
        .unwrap();

    assert_eq!(source.resolve_count(), 1);
    assert_eq!(std::fs::read_to_string(offline_project.join(THEME)).unwrap(), ":root {}\n");
}

#[tokio::test]
async fn test_offline_floating_ref_never_resolved_fails() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let source = MockSource::new().with_ref("main", SHA);
    let fetcher =
        Fetcher::new(source.clone(), CacheStore::new(temp.path().join("cache"))).offline(true);

    let err = Installer::new(&fetcher, &project, ComponentConfig::default())
        .install(&names(&["theme"]), &options("main"))
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("never been resolved online"));
    assert_eq!(source.resolve_count(), 0);
    assert!(std::fs::read_dir(&project).unwrap().next().is_none());
}

#[tokio::test]
async fn test_local_checkout_bypasses_cache() {
    let temp = TempDir::new().unwrap();
    let checkout = temp.path().join("checkout");
    sample_registry("main").write_checkout(&checkout).unwrap();
    let project = temp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    let cache = temp.path().join("cache");

    let source = LocalRepoSource::open(&checkout).unwrap();
    let fetcher = Fetcher::new(source, CacheStore::new(&cache));
    let report = Installer::new(&fetcher, &project, ComponentConfig::default())
        .install(&names(&["Button", "theme"]), &options("main"))
        .await
        .unwrap();

    assert_eq!(report.count(FileAction::Create), 4);
    assert!(project.join(THEME).is_file());
    assert!(!cache.exists());
}
