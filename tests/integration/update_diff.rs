use greater_cli::test_utils::{RegistryFixture, sample_registry};
use predicates::prelude::*;

use crate::common::{ICON, THEME, TestProject};

const ICON_V2: &str = "<script lang=\"ts\">\n  export let name: string;\n</script>\n\n\
                       <svg data-icon={name} aria-hidden=\"true\"></svg>\n";

fn release_two() -> RegistryFixture {
    RegistryFixture::new("main")
        .with_component("Icon", &[("lib/Icon.svelte", ICON_V2)], &[])
        .with_component("theme", &[("shared/theme.css", ":root {\n  --accent: #4f46e5;\n}\n")], &[])
}

fn installed_project() -> TestProject {
    let project = TestProject::with_registry(&sample_registry("main")).unwrap();
    project.init();
    project.cmd().args(["add", "Icon", "theme"]).assert().success();
    project
}

#[test]
fn test_diff_patch_shows_upstream_change() {
    let project = installed_project();
    project.replace_registry(&release_two()).unwrap();

    project
        .cmd()
        .args(["diff", "--patch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains(format!("+++ b/{ICON}")))
        .stdout(predicate::str::contains("+<svg data-icon={name} aria-hidden=\"true\"></svg>"))
        .stdout(predicate::str::contains("1 updated"));

    // diff never writes
    assert!(!project.read(ICON).contains("aria-hidden"));
}

#[test]
fn test_diff_without_changes() {
    let project = installed_project();
    project
        .cmd()
        .arg("diff")
        .assert()
        .success()
        .stdout(predicate::str::contains("Everything matches"));
}

#[test]
fn test_update_replaces_untouched_files() {
    let project = installed_project();
    project.replace_registry(&release_two()).unwrap();

    project
        .cmd()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 updated"));
    assert_eq!(project.read(ICON), ICON_V2);
    assert!(project.exists(THEME));

    project
        .cmd()
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("Already up to date"));
}

#[test]
fn test_update_keeps_local_edits_unless_forced() {
    let project = installed_project();
    project.replace_registry(&release_two()).unwrap();
    project.write(ICON, "<svg class=\"mine\"></svg>\n");

    project
        .cmd()
        .args(["diff", "Icon"])
        .assert()
        .success()
        .stdout(predicate::str::contains("conflict"));

    project
        .cmd()
        .args(["update", "Icon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(ICON));
    assert_eq!(project.read(ICON), "<svg class=\"mine\"></svg>\n");

    project.cmd().args(["update", "Icon", "--force"]).assert().success();
    assert_eq!(project.read(ICON), ICON_V2);
}

#[test]
fn test_update_of_missing_component_fails() {
    let project = installed_project();
    project
        .cmd()
        .args(["update", "Button"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'Button' is not installed"));
}
