use greater_cli::test_utils::sample_registry;
use predicates::prelude::*;

use crate::common::{BUTTON, CN, ICON, TestProject};

#[test]
fn test_add_installs_dependencies_and_rewrites_imports() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.init();

    project
        .cmd()
        .args(["add", "Button", "--skip-packages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Button"))
        .stdout(predicate::str::contains("(dependency)"))
        .stdout(predicate::str::contains("3 created"));

    assert_eq!(project.files_under("src"), vec![BUTTON, ICON, CN]);
    let button = project.read(BUTTON);
    assert!(button.contains("import Icon from '$lib/components/ui/Icon.svelte';"));
    assert!(button.contains("import { cn } from '$lib/components/ui/utils/cn.ts';"));
    assert!(!button.contains("$greater/"));

    let installed = project.installed();
    assert_eq!(installed.names(), vec!["Button", "Icon", "utils"]);
    assert_eq!(installed.get("Button").unwrap().git_ref, "main");
}

#[test]
fn test_add_requires_init() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project
        .cmd()
        .args(["add", "Button"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("components.json"));
}

#[test]
fn test_add_unknown_component_suggests_close_name() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.init();
    project
        .cmd()
        .args(["add", "Buton"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Component 'Buton' not found"))
        .stderr(predicate::str::contains("Did you mean: Button"));
    assert!(!project.exists("src"));
}

#[test]
fn test_readd_is_noop_and_edit_is_conflict() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.init();
    project.cmd().args(["add", "Icon"]).assert().success();
    let installed_before = project.read(".greater/installed.json");

    project
        .cmd()
        .args(["add", "Icon"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up to date"));
    assert_eq!(project.read(".greater/installed.json"), installed_before);

    project.write(ICON, "<!-- customized -->\n");
    project
        .cmd()
        .args(["add", "Icon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("locally modified"))
        .stderr(predicate::str::contains(ICON));
    assert_eq!(project.read(ICON), "<!-- customized -->\n");

    project.cmd().args(["add", "Icon", "--force"]).assert().success();
    assert!(project.read(ICON).contains("data-icon"));
}

#[test]
fn test_tampered_file_fails_integrity_and_writes_nothing() {
    let fixture = sample_registry("main")
        .with_served_content("lib/Button.svelte", "<button onclick=\"steal()\" />");
    let project = TestProject::with_registry(&fixture).unwrap();
    project.init();

    project
        .cmd()
        .args(["add", "Button", "--skip-packages"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Checksum mismatch for 'lib/Button.svelte'"));
    assert!(!project.exists("src"));
    assert!(!project.exists(".greater/installed.json"));

    project
        .cmd()
        .args(["add", "Button", "--skip-packages", "--no-verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not verified"));
    assert!(project.exists(BUTTON));
}

#[test]
fn test_dry_run_writes_nothing() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.init();
    project
        .cmd()
        .args(["add", "Button", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("clsx@^2.1.0"))
        .stdout(predicate::str::contains("2 import(s) rewritten"));
    assert!(!project.exists("src"));
}

#[test]
fn test_declared_packages_are_not_installed_again() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.init();
    project.write("package.json", r#"{ "dependencies": { "clsx": "^2.1.1" } }"#);

    project.cmd().args(["add", "Button"]).assert().success();
    assert!(project.exists(BUTTON));
    assert!(!project.exists("node_modules"));
}

#[test]
fn test_custom_aliases_place_files() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.write(
        "components.json",
        r#"{ "aliases": { "lib": "src/ui" }, "importAliases": { "$lib": "src" } }"#,
    );
    project.cmd().args(["add", "Button", "--skip-packages"]).assert().success();

    assert!(project.exists("src/ui/Icon.svelte"));
    assert!(project.read("src/ui/Button.svelte").contains("from '$lib/ui/utils/cn.ts'"));
}

#[test]
fn test_alias_outside_project_is_rejected() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.write("components.json", r#"{ "aliases": { "lib": "../escape" } }"#);
    project
        .cmd()
        .args(["add", "Icon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the project"));
    assert!(!project.project.with_file_name("escape").exists());
}

#[test]
fn test_project_flag_accepts_parent_relative_dir() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    let app = project.project.with_file_name("app");
    std::fs::create_dir_all(&app).unwrap();

    project.cmd().args(["--project", "../app", "init"]).assert().success();
    project
        .cmd()
        .args(["--project", "../app", "add", "Button", "--skip-packages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 created"));

    assert!(app.join(BUTTON).is_file());
    assert!(app.join(ICON).is_file());
    assert!(!project.exists("src"));
}
