//! Integration tests for the CLI interface
//!
//! Exercises the collect, export, validate, and alerts subcommands end to
//! end against fixture project trees.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn sample_project(dir: &TempDir) -> std::path::PathBuf {
    let root = dir.path().join("sample");
    write(&root, "src/app.py", "import os\n\nprint('hello')\n");
    write(&root, "src/util.py", "def add(a, b):\n    return a + b\n");
    write(&root, "tests/test_app.py", "def test_hello():\n    assert True\n");
    write(&root, "README.md", "# sample\n");
    write(&root, ".venv/lib/junk.py", "ignored = True\n");
    root
}

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("pymetra").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("collect"))
        .stdout(predicate::str::contains("aggregate"))
        .stdout(predicate::str::contains("alerts"));
}

#[test]
fn invalid_command_fails() {
    let mut cmd = Command::cargo_bin("pymetra").unwrap();
    cmd.arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn collect_writes_every_format() {
    let dir = TempDir::new().unwrap();
    let project = sample_project(&dir);
    let output = dir.path().join("out");

    let mut cmd = Command::cargo_bin("pymetra").unwrap();
    cmd.arg("collect")
        .arg(&project)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Metrics written"));

    for name in ["metrics.json", "metrics.md", "metrics.html", "metrics.csv", "metrics.yaml"] {
        assert!(output.join(name).exists(), "{name} missing");
    }

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("metrics.json")).unwrap()).unwrap();
    assert_eq!(json["python_file_count"], 3);
    assert_eq!(json["core_file_count"], 2);
    assert_eq!(json["test_file_count"], 1);
    assert_eq!(json["documentation_file_count"], 1);
}

#[test]
fn collect_excluded_tree_reports_zero() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("empty");
    write(&root, ".venv/lib/module.py", "x = 1\n");
    let output = dir.path().join("out");

    let mut cmd = Command::cargo_bin("pymetra").unwrap();
    cmd.arg("collect")
        .arg(&root)
        .arg("-o")
        .arg(&output)
        .arg("-f")
        .arg("json")
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(output.join("metrics.json")).unwrap()).unwrap();
    assert_eq!(json["python_file_count"], 0);
    assert_eq!(json["lines_of_code"], 0);
}

#[test]
fn export_rerenders_a_collected_file() {
    let dir = TempDir::new().unwrap();
    let project = sample_project(&dir);
    let first = dir.path().join("first");
    let second = dir.path().join("second");

    Command::cargo_bin("pymetra")
        .unwrap()
        .arg("collect")
        .arg(&project)
        .arg("-o")
        .arg(&first)
        .arg("-f")
        .arg("json")
        .assert()
        .success();

    Command::cargo_bin("pymetra")
        .unwrap()
        .arg("export")
        .arg(first.join("metrics.json"))
        .arg("-o")
        .arg(&second)
        .arg("-f")
        .arg("markdown")
        .assert()
        .success();

    let markdown = fs::read_to_string(second.join("metrics.md")).unwrap();
    assert!(markdown.contains("| Python files | 3 |"));
}

#[test]
fn validate_accepts_a_consistent_project() {
    let dir = TempDir::new().unwrap();
    let project = sample_project(&dir);

    let mut cmd = Command::cargo_bin("pymetra").unwrap();
    cmd.arg("validate")
        .arg(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("consistent"));
}

#[test]
fn collect_counts_are_stable_across_runs() {
    let dir = TempDir::new().unwrap();
    let project = sample_project(&dir);

    let mut counts = Vec::new();
    for run in ["a", "b"] {
        let output = dir.path().join(run);
        Command::cargo_bin("pymetra")
            .unwrap()
            .arg("collect")
            .arg(&project)
            .arg("-o")
            .arg(&output)
            .arg("-f")
            .arg("json")
            .assert()
            .success();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(output.join("metrics.json")).unwrap())
                .unwrap();
        counts.push((
            json["python_file_count"].clone(),
            json["lines_of_code"].clone(),
            json["test_count"].clone(),
        ));
    }
    assert_eq!(counts[0], counts[1]);
}
