//! Integration tests for packrat-core.
//!
//! These tests run whole pipelines against real directory trees.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use packrat_core::Cipher;
use packrat_core::CipherError;
use packrat_core::ConfigFile;
use packrat_core::EncryptionMethod;
use packrat_core::PackratError;
use packrat_core::Passphrase;
use packrat_core::Pipeline;
use packrat_core::PipelineConfig;
use packrat_core::Stage;
use packrat_core::decrypt_archive;
use packrat_core::encryption::OpenSslCipher;
use std::fs;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

/// Stands in for an encryption tool by copying bytes through unchanged.
struct CopyCipher;

impl Cipher for CopyCipher {
    fn method(&self) -> EncryptionMethod {
        EncryptionMethod::OpenSsl
    }

    fn encrypt(&self, input: &Path, output: &Path, _passphrase: &Passphrase) -> Result<(), CipherError> {
        fs::copy(input, output).map_err(|_| CipherError::InputMissing {
            path: input.to_path_buf(),
        })?;
        Ok(())
    }

    fn decrypt(&self, input: &Path, output: &Path, passphrase: &Passphrase) -> Result<(), CipherError> {
        self.encrypt(input, output, passphrase)
    }
}

fn member_names(archive: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

fn project_tree(root: &Path) -> PathBuf {
    let project = root.join("data/project");
    fs::create_dir_all(project.join("src")).unwrap();
    fs::create_dir_all(project.join("node_modules/left-pad")).unwrap();
    fs::write(project.join("src/main.txt"), "fn main() {}").unwrap();
    fs::write(project.join("debug.log"), "trace").unwrap();
    fs::write(project.join("node_modules/left-pad/index.js"), "module.exports = 1").unwrap();
    project
}

fn config_for(targets: &[&Path], patterns: &[&str]) -> ConfigFile {
    ConfigFile {
        target_paths: targets.iter().map(|p| p.display().to_string()).collect(),
        ignore_patterns: patterns.iter().map(ToString::to_string).collect(),
        timestamp: false,
        ..ConfigFile::default()
    }
}

fn validated(file: &ConfigFile) -> PipelineConfig {
    file.validate().unwrap()
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_project_scenario_excludes_logs_and_node_modules() {
    let temp = TempDir::new().unwrap();
    let project = project_tree(temp.path());
    let work = temp.path().join("work");
    fs::create_dir(&work).unwrap();

    let config = validated(&config_for(&[&project], &["*.log", "node_modules"]));
    let report = Pipeline::new(config, &work).run().unwrap();

    assert_eq!(report.final_path, work.canonicalize().unwrap().join("Backup.zip"));
    assert!(!report.encrypted);
    assert!(!report.relocated);

    let names = member_names(&report.final_path);
    assert!(names.contains(&"project/src/main.txt".to_string()));
    assert!(!names.contains(&"project/debug.log".to_string()));
    assert!(!names.iter().any(|n| n.starts_with("project/node_modules")));
    assert_eq!(report.build.files_added, 1);
}

#[test]
fn test_every_file_appears_once_with_forward_slashes() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("photos");
    fs::create_dir_all(root.join("2024/summer")).unwrap();
    fs::create_dir_all(root.join("2025")).unwrap();
    fs::write(root.join("2024/summer/beach.jpg"), "jpg").unwrap();
    fs::write(root.join("2024/index.txt"), "idx").unwrap();
    fs::write(root.join("2025/new.jpg"), "jpg").unwrap();

    let config = validated(&config_for(&[&root], &[]));
    let report = Pipeline::new(config, temp.path()).run().unwrap();

    let names = member_names(&report.final_path);
    let files: Vec<&String> = names.iter().filter(|n| !n.ends_with('/')).collect();
    assert_eq!(
        files,
        vec![
            "photos/2024/index.txt",
            "photos/2024/summer/beach.jpg",
            "photos/2025/new.jpg",
        ]
    );
    assert!(names.iter().all(|n| !n.contains('\\')));
}

#[test]
fn test_excluded_directory_hides_whole_subtree() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("home");
    fs::create_dir_all(root.join("cache/deep/keep")).unwrap();
    fs::write(root.join("cache/deep/keep/important.txt"), "x").unwrap();
    fs::write(root.join("notes.txt"), "y").unwrap();

    let config = validated(&config_for(&[&root], &["cache"]));
    let report = Pipeline::new(config, temp.path()).run().unwrap();

    let names = member_names(&report.final_path);
    assert!(names.iter().all(|n| !n.contains("cache")));
    assert!(names.contains(&"home/notes.txt".to_string()));
}

#[test]
fn test_trailing_slash_pattern_is_equivalent() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("user");
    fs::create_dir_all(root.join("Library/Caches")).unwrap();
    fs::write(root.join("Library/Caches/blob"), "x").unwrap();
    fs::write(root.join("readme.md"), "y").unwrap();

    let plain = temp.path().join("plain");
    let slashed = temp.path().join("slashed");
    fs::create_dir(&plain).unwrap();
    fs::create_dir(&slashed).unwrap();

    let a = Pipeline::new(validated(&config_for(&[&root], &["Library"])), &plain)
        .run()
        .unwrap();
    let b = Pipeline::new(validated(&config_for(&[&root], &["Library/"])), &slashed)
        .run()
        .unwrap();

    assert_eq!(member_names(&a.final_path), member_names(&b.final_path));
    assert_eq!(member_names(&a.final_path), vec!["user/", "user/readme.md"]);
}

#[test]
fn test_extension_and_build_patterns() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("repo");
    fs::create_dir_all(root.join("sub/dir")).unwrap();
    fs::create_dir_all(root.join("lib/build/obj")).unwrap();
    fs::write(root.join("a.tmp"), "").unwrap();
    fs::write(root.join("a.tmp.bak"), "").unwrap();
    fs::write(root.join("sub/dir/b.tmp"), "").unwrap();
    fs::write(root.join("lib/build/obj/x.o"), "").unwrap();
    fs::write(root.join("lib/build/out.bin"), "").unwrap();
    fs::write(root.join("sub/build"), "a file named build").unwrap();

    let config = validated(&config_for(&[&root], &["*.tmp", "**/build/**"]));
    let report = Pipeline::new(config, temp.path()).run().unwrap();
    let names = member_names(&report.final_path);

    assert!(names.contains(&"repo/a.tmp.bak".to_string()));
    assert!(names.contains(&"repo/sub/build".to_string()));
    assert!(!names.contains(&"repo/a.tmp".to_string()));
    assert!(!names.contains(&"repo/sub/dir/b.tmp".to_string()));
    assert!(!names.iter().any(|n| n.starts_with("repo/lib/build/")));
}

#[test]
fn test_relocation_with_cleanup_leaves_one_artifact() {
    let temp = TempDir::new().unwrap();
    let project = project_tree(temp.path());
    let staging = temp.path().join("staging");
    let dest = temp.path().join("dest");
    fs::create_dir(&dest).unwrap();

    let mut file = config_for(&[&project], &[]);
    file.compression_folder = staging.display().to_string();
    file.destination_folder = dest.display().to_string();
    file.passphrase = "hunter2".to_string();
    file.cleanup = true;

    let report = Pipeline::new(validated(&file), temp.path())
        .with_cipher(Box::new(CopyCipher))
        .run()
        .unwrap();

    assert!(report.encrypted);
    assert!(report.relocated);
    assert_eq!(report.removed_intermediates.len(), 2);
    assert!(listing(&staging).is_empty());
    assert_eq!(listing(&dest), vec!["Backup.zip.enc"]);
    assert_eq!(report.final_path, dest.canonicalize().unwrap().join("Backup.zip.enc"));
}

#[test]
fn test_missing_encryption_tool_keeps_archive() {
    let temp = TempDir::new().unwrap();
    let project = project_tree(temp.path());
    let work = temp.path().join("work");
    let dest = temp.path().join("dest");
    fs::create_dir(&work).unwrap();
    fs::create_dir(&dest).unwrap();

    let mut file = config_for(&[&project], &[]);
    file.destination_folder = dest.display().to_string();
    file.passphrase = "hunter2".to_string();
    file.cleanup = true;

    let cipher = OpenSslCipher::new().with_program("/nonexistent/bin/openssl");
    let failure = Pipeline::new(validated(&file), &work)
        .with_cipher(Box::new(cipher))
        .run()
        .unwrap_err();

    assert_eq!(failure.stage, Stage::Encrypting);
    assert!(matches!(
        failure.error,
        PackratError::Encryption(CipherError::ToolMissing { .. })
    ));
    let archive = work.canonicalize().unwrap().join("Backup.zip");
    assert!(archive.is_file());
    assert_eq!(failure.retained_artifact, Some(archive));
    assert!(!work.join("Backup.zip.enc").exists());
    assert!(listing(&dest).is_empty());
}

#[test]
fn test_validation_touches_nothing() {
    let temp = TempDir::new().unwrap();
    let before = listing(temp.path());

    let mut file = config_for(&[&temp.path().join("absent")], &["*.log"]);
    file.compression_folder = temp.path().join("would-be-created").display().to_string();
    file.destination_folder = temp.path().join("dest").display().to_string();
    file.passphrase = "pw".to_string();

    for _ in 0..2 {
        let config = file.validate().unwrap();
        assert!(config.encrypts());
    }
    assert_eq!(listing(temp.path()), before);
}

#[test]
fn test_second_run_refuses_to_overwrite() {
    let temp = TempDir::new().unwrap();
    let project = project_tree(temp.path());
    let file = config_for(&[&project], &[]);

    Pipeline::new(validated(&file), temp.path()).run().unwrap();
    let failure = Pipeline::new(validated(&file), temp.path()).run().unwrap_err();

    assert_eq!(failure.stage, Stage::Naming);
    assert!(matches!(failure.error, PackratError::AlreadyExists { .. }));
}

#[test]
fn test_decrypt_with_copy_cipher() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("Backup.zip.enc");
    fs::write(&input, "archive bytes").unwrap();

    let output = decrypt_archive(&input, &Passphrase::new("pw"), &CopyCipher).unwrap();
    assert_eq!(output, temp.path().join("Backup.zip"));
    assert_eq!(fs::read_to_string(output).unwrap(), "archive bytes");
}

#[test]
fn test_openssl_round_trip() {
    if which::which("openssl").is_err() {
        eprintln!("openssl not found, skipping");
        return;
    }

    let temp = TempDir::new().unwrap();
    let project = project_tree(temp.path());
    let work = temp.path().join("work");
    let restore = temp.path().join("restore");
    fs::create_dir(&work).unwrap();
    fs::create_dir(&restore).unwrap();

    let mut file = config_for(&[&project], &[]);
    file.passphrase = "correct horse".to_string();

    let report = Pipeline::new(validated(&file), &work).run().unwrap();
    assert!(report.encrypted);
    let archive = work.join("Backup.zip");
    assert!(archive.is_file());

    let copied = restore.join("Backup.zip.enc");
    fs::copy(&report.final_path, &copied).unwrap();

    let cipher = OpenSslCipher::new();
    let wrong = decrypt_archive(&copied, &Passphrase::new("battery staple"), &cipher).unwrap_err();
    assert!(matches!(wrong, PackratError::Decryption(_)));
    assert!(!restore.join("Backup.zip").exists());

    let output = decrypt_archive(&copied, &Passphrase::new("correct horse"), &cipher).unwrap();
    assert_eq!(fs::read(output).unwrap(), fs::read(archive).unwrap());
}
