use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;

struct TestDirs {
    _root: tempfile::TempDir,
    settings: std::path::PathBuf,
    store: std::path::PathBuf,
    local: std::path::PathBuf,
}

fn test_dirs() -> TestDirs {
    let root = tempfile::tempdir().expect("temp root");
    let dirs = TestDirs {
        settings: root.path().join("settings"),
        store: root.path().join("store"),
        local: root.path().join("local"),
        _root: root,
    };
    fs::create_dir_all(&dirs.local).expect("local dir");
    dirs
}

fn cloudshred(dirs: &TestDirs) -> Command {
    let mut cmd = Command::cargo_bin("cloudshred").expect("binary exists");
    cmd.arg("--settings-dir")
        .arg(&dirs.settings)
        .arg("--store-dir")
        .arg(&dirs.store);
    cmd
}

fn write_local(dirs: &TestDirs, name: &str, content: &str) -> std::path::PathBuf {
    let path = dirs.local.join(name);
    fs::write(&path, content).expect("write local file");
    path
}

#[test]
fn put_then_ls_and_read_roundtrip() {
    let dirs = test_dirs();
    let local = write_local(&dirs, "note.txt", "lorem ipsum dolor sit amet");

    cloudshred(&dirs)
        .arg("put")
        .arg(&local)
        .args(["--as", "docs/note.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored docs/note.txt"));

    cloudshred(&dirs)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("docs/note.txt"));

    cloudshred(&dirs)
        .args(["read", "docs/note.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lorem ipsum dolor sit amet"));
}

#[test]
fn ls_reports_an_empty_store() {
    let dirs = test_dirs();
    cloudshred(&dirs)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("No files found."));
}

#[test]
fn shredded_files_disappear_and_read_fails() {
    let dirs = test_dirs();
    let local = write_local(&dirs, "secret.txt", "to be destroyed");

    cloudshred(&dirs)
        .arg("put")
        .arg(&local)
        .args(["--as", "secret.txt"])
        .assert()
        .success();

    cloudshred(&dirs)
        .args(["shred", "secret.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Shredded secret.txt"));

    cloudshred(&dirs)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("No files found."));

    cloudshred(&dirs)
        .args(["read", "secret.txt"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("no cloud file"));
}

#[test]
fn clean_removes_the_objects_of_shredded_files() {
    let dirs = test_dirs();
    let local = write_local(&dirs, "a.txt", "content");

    cloudshred(&dirs)
        .arg("put")
        .arg(&local)
        .args(["--as", "a.txt"])
        .assert()
        .success();
    cloudshred(&dirs)
        .args(["shred", "a.txt"])
        .assert()
        .success();

    // The shred parked its two deletions in the in-memory queue, so the
    // objects are still present until clean diffs them away.
    cloudshred(&dirs)
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of deleted objects: 2"));

    cloudshred(&dirs)
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of deleted objects: 0"));
}

#[test]
fn rotate_keys_keeps_files_readable() {
    let dirs = test_dirs();
    let local = write_local(&dirs, "keep.txt", "still here after rotation");

    cloudshred(&dirs)
        .arg("put")
        .arg(&local)
        .args(["--as", "keep.txt"])
        .assert()
        .success();

    cloudshred(&dirs)
        .arg("rotate-keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("Number of re-wrapped keys: 1"));

    cloudshred(&dirs)
        .args(["read", "keep.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("still here after rotation"));
}

#[test]
fn put_recurses_into_directories() {
    let dirs = test_dirs();
    let tree = dirs.local.join("tree/sub");
    fs::create_dir_all(&tree).expect("tree dirs");
    fs::write(dirs.local.join("tree/top.txt"), "top").expect("write");
    fs::write(tree.join("deep.txt"), "deep").expect("write");

    cloudshred(&dirs)
        .arg("put")
        .arg(dirs.local.join("tree"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored 2 files"));

    cloudshred(&dirs)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("top.txt").and(predicate::str::contains("deep.txt")));
}

#[test]
fn json_mode_emits_parseable_output() {
    let dirs = test_dirs();
    let local = write_local(&dirs, "j.txt", "json test");

    cloudshred(&dirs)
        .arg("put")
        .arg(&local)
        .args(["--as", "j.txt"])
        .assert()
        .success();

    let output = cloudshred(&dirs).args(["ls", "--json"]).output().expect("ls output");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let files = json
        .pointer("/meta/files")
        .and_then(Value::as_array)
        .expect("files array");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].as_str(), Some("j.txt"));
}

#[test]
fn export_key_writes_the_key_file() {
    let dirs = test_dirs();
    let local = write_local(&dirs, "f.txt", "content");
    cloudshred(&dirs)
        .arg("put")
        .arg(&local)
        .args(["--as", "f.txt"])
        .assert()
        .success();

    let raw_out = dirs.local.join("exported.key");
    cloudshred(&dirs)
        .args(["export-key", "--out"])
        .arg(&raw_out)
        .assert()
        .success();
    let raw = fs::read(&raw_out).expect("exported key");
    assert!(!raw.is_empty());

    let sealed_out = dirs.local.join("sealed.key");
    cloudshred(&dirs)
        .args(["export-key", "--password", "hunter2", "--out"])
        .arg(&sealed_out)
        .assert()
        .success();
    let sealed = fs::read(&sealed_out).expect("sealed key");
    // salt + nonce + ciphertext: strictly longer than the raw export.
    assert!(sealed.len() > raw.len());
    assert_ne!(sealed, raw);
}

#[test]
fn state_persists_across_invocations() {
    let dirs = test_dirs();
    let local = write_local(&dirs, "persist.txt", "written in session one");

    cloudshred(&dirs)
        .arg("put")
        .arg(&local)
        .args(["--as", "persist.txt"])
        .assert()
        .success();

    assert!(dirs.settings.join("pkw.key").exists());
    assert!(dirs.settings.join("lookup.key").exists());
    assert!(dirs.settings.join("properties.cli").exists());
    assert!(Path::new(&dirs.store).join("T").exists());

    // A brand-new process restores the bindings and the key.
    cloudshred(&dirs)
        .args(["read", "persist.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("written in session one"));
}

#[test]
fn missing_local_file_is_a_usage_error() {
    let dirs = test_dirs();
    cloudshred(&dirs)
        .arg("put")
        .arg(dirs.local.join("does-not-exist.txt"))
        .assert()
        .code(64)
        .stderr(predicate::str::contains("was not found"));
}
