//! Integration tests for packrat-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

fn packrat_cmd() -> Command {
    cargo_bin_cmd!("packrat")
}

/// Creates `<temp>/data/project` with a source file, a log and a
/// `node_modules` tree.
fn project(temp: &TempDir) -> PathBuf {
    let root = temp.path().join("data/project");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("node_modules/dep")).unwrap();
    fs::write(root.join("src/main.txt"), "hello").unwrap();
    fs::write(root.join("debug.log"), "noise").unwrap();
    fs::write(root.join("node_modules/dep/index.js"), "x").unwrap();
    root
}

fn write_config(dir: &Path, value: &serde_json::Value) -> PathBuf {
    let path = dir.join("backup.json");
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn member_names(archive: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(fs::File::open(archive).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

#[test]
fn test_version_flag() {
    packrat_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("packrat"));
}

#[test]
fn test_help_flag() {
    packrat_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup archives"));
}

#[test]
fn test_run_help() {
    packrat_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--follow-symlinks"));
}

#[test]
fn test_init_writes_template() {
    let temp = TempDir::new().unwrap();

    packrat_cmd()
        .current_dir(temp.path())
        .args(["init", "settings"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settings.json"));

    let text = fs::read_to_string(temp.path().join("settings.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["passphrase"], "password");
    assert_eq!(value["encryption_method"], "openssl");
    assert_eq!(value["target_paths"], json!([""]));
}

#[test]
fn test_init_never_overwrites() {
    let temp = TempDir::new().unwrap();
    let existing = temp.path().join("settings.json");
    fs::write(&existing, "{}").unwrap();

    packrat_cmd()
        .current_dir(temp.path())
        .args(["init", "settings.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(existing).unwrap(), "{}");
}

#[test]
fn test_validate_accepts_good_config() {
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        &json!({ "target_paths": ["/does/not/need/to/exist"] }),
    );

    packrat_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration valid"));
}

#[test]
fn test_validate_rejects_bad_level() {
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        &json!({ "target_paths": ["/data"], "compress_level": 12 }),
    );

    packrat_cmd()
        .arg("validate")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("compress_level"))
        .stderr(predicate::str::contains("HINT"));
}

#[test]
fn test_validate_missing_file() {
    let temp = TempDir::new().unwrap();

    packrat_cmd()
        .arg("validate")
        .arg(temp.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.json"));
}

#[test]
fn test_run_creates_filtered_archive() {
    let temp = TempDir::new().unwrap();
    let root = project(&temp);
    let config = write_config(
        temp.path(),
        &json!({
            "target_paths": [root],
            "ignore_patterns": ["*.log", "node_modules"],
            "timestamp": false,
        }),
    );

    packrat_cmd()
        .current_dir(temp.path())
        .arg("run")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup complete"));

    let names = member_names(&temp.path().join("Backup.zip"));
    assert!(names.contains(&"project/src/main.txt".to_string()));
    assert!(!names.contains(&"project/debug.log".to_string()));
    assert!(!names.iter().any(|n| n.contains("node_modules")));
}

#[test]
fn test_run_json_output() {
    let temp = TempDir::new().unwrap();
    let root = project(&temp);
    let dest = temp.path().join("dest");
    fs::create_dir(&dest).unwrap();
    let config = write_config(
        temp.path(),
        &json!({
            "target_paths": [root],
            "destination_folder": dest,
            "timestamp": false,
            "cleanup": true,
        }),
    );

    let output = packrat_cmd()
        .current_dir(temp.path())
        .args(["--json", "run"])
        .arg(&config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid JSON output");
    assert_eq!(json["status"], "success");
    assert_eq!(json["operation"], "run");
    assert_eq!(json["data"]["files_added"], 3);
    assert_eq!(json["data"]["relocated"], true);
    assert_eq!(json["data"]["encrypted"], false);
    assert!(dest.join("Backup.zip").is_file());
    assert!(!temp.path().join("Backup.zip").exists());
}

#[test]
fn test_run_missing_targets_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(
        temp.path(),
        &json!({ "target_paths": [temp.path().join("gone")], "timestamp": false }),
    );

    packrat_cmd()
        .current_dir(temp.path())
        .arg("run")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("BUILDING"));

    assert!(!temp.path().join("Backup.zip").exists());
}

#[test]
fn test_run_missing_tool_keeps_archive() {
    let temp = TempDir::new().unwrap();
    let root = project(&temp);
    let config = write_config(
        temp.path(),
        &json!({
            "target_paths": [root],
            "passphrase": "secret",
            "encryption_method": "gpg",
            "timestamp": false,
        }),
    );

    let output = packrat_cmd()
        .current_dir(temp.path())
        .env("PATH", "")
        .args(["--json", "run"])
        .arg(&config)
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid JSON output");
    assert_eq!(json["status"], "error");
    assert!(json["error"].as_str().unwrap().contains("ENCRYPTING"));
    assert!(temp.path().join("Backup.zip").is_file());
    assert!(!temp.path().join("Backup.zip.gpg").exists());
}

#[test]
fn test_decrypt_without_passphrase_fails() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("Backup.zip.enc");
    fs::write(&archive, "ciphertext").unwrap();
    let config = write_config(temp.path(), &json!({ "target_paths": ["/data"] }));

    packrat_cmd()
        .arg("decrypt")
        .arg(&config)
        .arg(&archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("passphrase"));

    assert!(!temp.path().join("Backup.zip").exists());
}

#[test]
fn test_decrypt_rejects_unknown_method() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), &json!({ "target_paths": ["/data"] }));

    packrat_cmd()
        .arg("decrypt")
        .arg(&config)
        .arg(temp.path().join("Backup.zip.enc"))
        .args(["--method", "rot13"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown method"));
}

#[test]
fn test_completion_bash() {
    packrat_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("packrat"));
}
