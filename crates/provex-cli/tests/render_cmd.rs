//! Integration tests for the `render` subcommand's input handling.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("provex").unwrap()
}

#[test]
fn render_without_exam_pdf_fails_with_path() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .args(["render", "2020", "--data-root"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing input"))
        .stderr(predicate::str::contains("p20.pdf"));
}

#[test]
fn ingest_without_exam_pdf_fails_with_path() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .args(["ingest", "2019", "--no-vision", "--no-ocr", "--data-root"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("p19.pdf"));
}
