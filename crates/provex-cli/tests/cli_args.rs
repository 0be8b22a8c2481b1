//! Argument-parsing behavior of the `provex` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("provex").unwrap()
}

#[test]
fn help_lists_every_subcommand() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("recrop"))
        .stdout(predicate::str::contains("enrich"))
        .stdout(predicate::str::contains("qa"))
        .stdout(predicate::str::contains("audit"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn no_subcommand_is_an_error() {
    cmd().assert().failure();
}

#[test]
fn unknown_subcommand_is_an_error() {
    cmd().arg("frobnicate").assert().failure();
}

#[test]
fn qa_requires_a_year() {
    cmd()
        .arg("qa")
        .assert()
        .failure()
        .stderr(predicate::str::contains("YEAR"));
}

#[test]
fn non_numeric_year_is_rejected() {
    cmd().args(["qa", "twenty-twenty"]).assert().failure();
}

#[test]
fn render_rejects_non_numeric_dpi() {
    cmd()
        .args(["render", "2020", "--dpi", "high"])
        .assert()
        .failure();
}
