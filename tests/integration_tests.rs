//! Integration tests for the crossport CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a crossport Command
fn crossport() -> Command {
    cargo_bin_cmd!("crossport")
}

#[test]
fn test_crossport_help() {
    crossport().arg("--help").assert().success();
}

#[test]
fn test_crossport_version() {
    crossport().arg("--version").assert().success();
}

#[test]
fn test_plan_check_accepts_a_valid_plan() {
    let dir = TempDir::new().unwrap();
    let plan_file = dir.path().join("plan.md");
    fs::write(
        &plan_file,
        "# AI Plan\n## Step 1: generate tests\nWrite tests.\n## Step 2: update csproj\nUpdate it.\n",
    )
    .unwrap();

    crossport()
        .arg("plan")
        .arg("check")
        .arg(&plan_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("## Step 1: generate tests"))
        .stderr(predicate::str::contains("plan OK: 2 step(s)"));
}

#[test]
fn test_plan_check_canonicalizes_step_names() {
    let dir = TempDir::new().unwrap();
    let plan_file = dir.path().join("plan.md");
    fs::write(
        &plan_file,
        "# AI Plan\n## Step 1: UPGRADE_DOTNET_PROJECT\nUpgrade it.\n",
    )
    .unwrap();

    crossport()
        .arg("plan")
        .arg("check")
        .arg(&plan_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("## Step 1: upgrade dotnet project"));
}

#[test]
fn test_plan_check_rejects_invalid_plans() {
    let dir = TempDir::new().unwrap();
    let plan_file = dir.path().join("plan.md");
    fs::write(&plan_file, "no steps in here").unwrap();

    crossport()
        .arg("plan")
        .arg("check")
        .arg(&plan_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid AI plan"));
}

#[test]
fn test_plan_check_rejects_missing_files() {
    crossport()
        .arg("plan")
        .arg("check")
        .arg("does-not-exist.md")
        .assert()
        .failure();
}

#[test]
fn test_migrate_requires_a_configured_service() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Main.cs"), "class Main {}").unwrap();

    crossport()
        .env_remove("CROSSPORT_SERVICE_URL")
        .current_dir(dir.path())
        .arg("migrate")
        .arg(dir.path())
        .arg("--language")
        .arg("dotnetframework")
        .arg("--target")
        .arg("dotnet8")
        .assert()
        .failure()
        .stderr(predicate::str::contains("base URL is not configured"));
}
