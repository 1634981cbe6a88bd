use greater_cli::test_utils::sample_registry;
use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_list_registry_marks_installed() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.init();
    project.cmd().args(["add", "Icon"]).assert().success();

    project
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Button"))
        .stdout(predicate::str::contains("depends on Icon, utils"))
        .stdout(predicate::str::contains("[installed @ main]"));
}

#[test]
fn test_list_json_and_tree() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();

    let output = project
        .cmd()
        .args(["list", "--format", "json", "--tree"])
        .assert()
        .success()
        .get_output()
        .clone();
    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 4);
    assert_eq!(items[0]["name"], "Button");
    assert_eq!(items[0]["packages"]["clsx"], "^2.1.0");
    assert_eq!(items[0]["tree"], "Button\n├── Icon\n└── utils\n");
}

#[test]
fn test_list_installed_needs_no_registry() {
    let registry_project = TestProject::with_registry(&sample_registry("main")).unwrap();
    registry_project.init();
    registry_project.cmd().args(["add", "theme"]).assert().success();

    // Same project, registry no longer reachable
    std::fs::remove_dir_all(&registry_project.registry).unwrap();
    registry_project
        .cmd()
        .args(["list", "--installed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("theme"));
}
