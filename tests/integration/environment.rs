use greater_cli::cache::CacheStore;
use greater_cli::fetcher::Fetcher;
use greater_cli::registry::{FetchIndexOptions, RegistryClient};
use greater_cli::test_utils::{RegistryFixture, sample_registry};
use predicates::prelude::*;
use std::path::Path;

use crate::common::{BUTTON, ICON, TestProject};

// Nothing listens on the discard port, so any network attempt fails fast
const UNREACHABLE_CONFIG: &str =
    "raw_base_url = \"http://127.0.0.1:9\"\nrequest_timeout_secs = 2\n";

/// Fill `cache` with the index and every file of `fixture`, as an earlier online run would.
fn seed_cache(cache: &Path, fixture: &RegistryFixture) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let fetcher = Fetcher::new(fixture.mock_source(), CacheStore::new(cache));
        let index = RegistryClient::new(&fetcher)
            .fetch_registry_index(fixture.git_ref(), FetchIndexOptions::default())
            .await
            .unwrap();
        let paths: Vec<String> =
            index.components.iter().flat_map(|c| c.files.iter().map(|f| f.path.clone())).collect();
        let batch = fetcher.fetch_multiple(fixture.git_ref(), &paths).await.unwrap();
        assert!(batch.is_complete());
    });
}

#[test]
fn test_init_writes_config_and_gitignore_once() {
    let project = TestProject::new().unwrap();
    project.cmd().args(["init", "--ref", "v1.0.0"]).assert().success();

    let config: serde_json::Value = serde_json::from_str(&project.read("components.json")).unwrap();
    assert_eq!(config["ref"], "v1.0.0");
    assert!(project.read(".gitignore").contains(".greater/.locks/"));

    project
        .cmd()
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    project.cmd().args(["init", "--force", "--ref", "v2.0.0"]).assert().success();
    assert!(project.read("components.json").contains("v2.0.0"));
    assert_eq!(project.read(".gitignore").matches(".greater/.locks/").count(), 1);
}

#[test]
fn test_doctor_on_initialized_project() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.init();

    project
        .cmd()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("local checkout"))
        .stdout(predicate::str::contains("No problems found"));
}

#[test]
fn test_doctor_fails_on_invalid_config() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.write("components.json", "{ not json");

    project
        .cmd()
        .arg("doctor")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("1 check(s) failed"));
}

#[test]
fn test_offline_without_cache_fails_and_writes_nothing() {
    let project = TestProject::new().unwrap();
    project.write_global_config(UNREACHABLE_CONFIG).unwrap();
    project.cmd().args(["init", "--ref", "v1.0.0"]).assert().success();

    project
        .cmd()
        .args(["add", "Button", "--offline", "--skip-packages"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Registry index error"))
        .stderr(predicate::str::contains("offline"));
    assert!(!project.exists("src"));
    assert!(!project.exists(".greater/installed.json"));
}

#[test]
fn test_offline_install_from_seeded_cache() {
    let project = TestProject::new().unwrap();
    project.write_global_config(UNREACHABLE_CONFIG).unwrap();
    project.cmd().args(["init", "--ref", "v1.0.0"]).assert().success();
    seed_cache(&project.cache, &sample_registry("v1.0.0"));

    project
        .cmd()
        .args(["add", "Button", "--offline", "--skip-packages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 created"));
    assert!(project.read(BUTTON).contains("$lib/components/ui/Icon.svelte"));
    assert!(project.exists(ICON));
    assert_eq!(project.installed().get("Button").unwrap().git_ref, "v1.0.0");
}

#[test]
fn test_cache_info_and_clean() {
    let project = TestProject::new().unwrap();
    project
        .cmd()
        .args(["cache", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache is empty"));

    seed_cache(&project.cache, &sample_registry("v1.0.0"));
    project
        .cmd()
        .arg("cache")
        .assert()
        .success()
        .stdout(predicate::str::contains("Location:"))
        .stdout(predicate::str::contains("v1.0.0 (4 file(s), index)"));

    project
        .cmd()
        .args(["cache", "clean", "--ref", "v2.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing cached for v2.0.0"));

    project
        .cmd()
        .args(["cache", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared cache"));
    assert!(!project.cache.exists());
}
