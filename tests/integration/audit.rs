use greater_cli::test_utils::sample_registry;
use predicates::prelude::*;

use crate::common::{ICON, THEME, TestProject};

#[test]
fn test_audit_clean_then_dirty() {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.init();
    project.cmd().args(["add", "Icon", "theme"]).assert().success();

    project
        .cmd()
        .arg("audit")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 file(s) match"));

    project.write(ICON, "changed");
    std::fs::remove_file(project.path(THEME)).unwrap();

    let output = project
        .cmd()
        .args(["audit", "--format", "json"])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let statuses: Vec<(&str, &str)> = report["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["component"].as_str().unwrap(), e["status"].as_str().unwrap()))
        .collect();
    assert_eq!(statuses, vec![("Icon", "modified"), ("theme", "missing")]);
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("1 installed file(s) modified, 1 missing")
    );
}

#[test]
fn test_audit_without_installs() {
    let project = TestProject::new().unwrap();
    project
        .cmd()
        .arg("audit")
        .assert()
        .success()
        .stdout(predicate::str::contains("No components installed"));
}
