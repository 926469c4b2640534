//! CLI integration tests for steadfast admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use serde_json::Value;

use steadfast::store::{SqliteStore, Store};

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("steadfast").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
            ])
            .assert()
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("steadfast.db")).expect("failed to open store")
    }

    fn list_users_json(&self) -> Value {
        let output = self
            .cmd()
            .args([
                "admin",
                "user",
                "list",
                "--data-dir",
                &self.data_dir_str(),
                "--json",
            ])
            .output()
            .expect("failed to run user list");
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).expect("user list is JSON")
    }
}

#[test]
fn test_init_creates_database_and_admin_token() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Admin token"));

    let token_path = ctx.data_dir().join(".admin_token");
    let token = std::fs::read_to_string(&token_path).expect("admin token file");
    assert!(token.trim().starts_with("steadfast_"));
    assert!(ctx.data_dir().join("steadfast.db").exists());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&token_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    assert!(ctx.store().has_admin_token().unwrap());
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_user_add_requires_init() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args([
            "admin",
            "user",
            "add",
            "--data-dir",
            &ctx.data_dir_str(),
            "--name",
            "Sam",
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("steadfast admin init"));
}

#[test]
fn test_user_add_with_token() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "admin",
            "user",
            "add",
            "--data-dir",
            &ctx.data_dir_str(),
            "--name",
            "Sam",
            "--token",
            "--non-interactive",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created user \"Sam\""))
        .stdout(predicate::str::contains("Token created: steadfast_"));

    let users = ctx.list_users_json();
    let users = users.as_array().expect("array");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["display_name"], "Sam");
    assert_eq!(users[0]["level"], 1);
    assert_eq!(users[0]["xp"], 0);

    let user_id = users[0]["id"].as_str().unwrap();
    assert_eq!(ctx.store().list_user_tokens(user_id).unwrap().len(), 1);
}

#[test]
fn test_user_add_non_interactive_needs_name() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "admin",
            "user",
            "add",
            "--data-dir",
            &ctx.data_dir_str(),
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--name is required"));
}

#[test]
fn test_user_list_table() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args(["admin", "user", "list", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No users."));
}

#[test]
fn test_levels_builtin() {
    let ctx = TestContext::new();
    ctx.cmd()
        .arg("levels")
        .assert()
        .success()
        .stdout(predicate::str::contains("built-in"))
        .stdout(predicate::str::contains("Seedling"))
        .stdout(predicate::str::contains("Legend"));
}

#[test]
fn test_levels_override_is_validated() {
    let ctx = TestContext::new();

    let good = ctx.data_dir().join("levels.toml");
    std::fs::write(
        &good,
        r##"
version = 7

[[tiers]]
level = 1
name = "Start"
description = "First steps"
color = "#000000"
xp_threshold = 0

[[tiers]]
level = 5
name = "Later"
description = "Further along"
color = "#FFFFFF"
xp_threshold = 100
"##,
    )
    .unwrap();

    let output = ctx
        .cmd()
        .args(["levels", "--json", "--levels-path"])
        .arg(&good)
        .output()
        .unwrap();
    assert!(output.status.success());
    let table: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(table["version"], 7);
    assert_eq!(table["tiers"][1]["name"], "Later");

    let bad = ctx.data_dir().join("bad.toml");
    std::fs::write(
        &bad,
        r##"
version = 1

[[tiers]]
level = 1
name = "Start"
description = ""
color = "#000000"
xp_threshold = 10
"##,
    )
    .unwrap();

    ctx.cmd()
        .args(["levels", "--levels-path"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("xp_threshold of 0"));
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();
    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server not initialized"));
}
