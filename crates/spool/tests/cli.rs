//! CLI regression tests for the `spool` binary.
//!
//! These invoke the binary as a subprocess to catch regressions in flag
//! names, exit codes, and output formats.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

const CONTENT_TYPE: &str = "multipart/form-data; boundary=XyZ";

/// Returns an assert_cmd Command wrapping the `spool` binary.
fn spool() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("spool").expect("spool binary not found")
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

#[test]
fn parse_lists_files_and_fields() {
    let dir = TempDir::new().unwrap();

    let output = spool()
        .args(["parse", "--content-type", CONTENT_TYPE, "--input"])
        .arg(fixture("two-parts.multipart"))
        .arg("--upload-dir")
        .arg(dir.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "unexpected output: {stdout}");

    let (filename, path) = lines[0].split_once('\t').unwrap();
    assert_eq!(filename, "a.txt");
    assert_eq!(std::fs::read(path).unwrap(), b"hello");
    assert_eq!(lines[1], "title=greeting");
}

#[test]
fn parse_reads_stdin() {
    let dir = TempDir::new().unwrap();
    let body = std::fs::read(fixture("two-parts.multipart")).unwrap();

    spool()
        .args(["parse", "--content-type", CONTENT_TYPE])
        .arg("--upload-dir")
        .arg(dir.path())
        .write_stdin(body)
        .assert()
        .success()
        .stdout(contains("a.txt\t"))
        .stdout(contains("title=greeting"));
}

#[test]
fn parse_field_policy_file_spools_fields() {
    let dir = TempDir::new().unwrap();

    spool()
        .args(["parse", "--content-type", CONTENT_TYPE, "--field-policy", "file"])
        .arg("--input")
        .arg(fixture("two-parts.multipart"))
        .arg("--upload-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(contains("title\t"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn parse_keeps_logs_off_stdout() {
    let dir = TempDir::new().unwrap();

    let assert = spool()
        .args(["parse", "--content-type", CONTENT_TYPE, "--input"])
        .arg(fixture("duplicate-filename.multipart"))
        .arg("--upload-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(contains("duplicate filename"));

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "unexpected output: {stdout}");

    let (filename, path) = lines[0].split_once('\t').unwrap();
    assert_eq!(filename, "d.txt");
    assert_eq!(std::fs::read(path).unwrap(), b"second");
    // the earlier file stays on disk
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn parse_truncated_body_exits_one() {
    let dir = TempDir::new().unwrap();

    spool()
        .args(["parse", "--content-type", CONTENT_TYPE, "--input"])
        .arg(fixture("truncated.multipart"))
        .arg("--upload-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(contains("truncated"));
}

#[test]
fn parse_missing_boundary_exits_one() {
    let dir = TempDir::new().unwrap();

    spool()
        .args(["parse", "--content-type", "multipart/form-data", "--input"])
        .arg(fixture("two-parts.multipart"))
        .arg("--upload-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(contains("boundary"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn parse_missing_input_exits_one() {
    spool()
        .args(["parse", "--content-type", CONTENT_TYPE])
        .args(["--input", "this-file-does-not-exist.multipart"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("cannot open"));
}

#[test]
fn serve_rejects_invalid_field_policy() {
    spool()
        .args(["serve", "--listen", "127.0.0.1:0", "--field-policy", "disk"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("invalid field policy"));
}
