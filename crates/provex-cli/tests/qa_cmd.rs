//! Integration tests for the `qa` subcommand.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};

fn cmd() -> Command {
    Command::cargo_bin("provex").unwrap()
}

fn question(year: u16, number: u8) -> Value {
    json!({
        "id": format!("fuvest-{year}-q{number:02}"),
        "year": year,
        "number": number,
        "page": 2,
        "bbox": { "x": 0, "y": 100, "w": 800, "h": 700 },
        "stem": "Um enunciado perfeitamente razoável para o teste.",
        "options": (["A", "B", "C", "D", "E"].iter().map(|k| json!({
            "key": k,
            "text": format!("alternativa {k}"),
        })).collect::<Vec<_>>()),
        "answer": { "correct": "A" },
        "explanation": {
            "theory": "Pendente",
            "steps": [],
            "distractors": {},
            "finalSummary": "",
        },
        "assets": { "questionImage": format!("/assets/{year}/q{number:02}/image.png") },
    })
}

fn write_dataset(root: &std::path::Path, year: u16, count: u8) {
    let value = json!({
        "year": year,
        "source": {
            "provaPdf": format!("provas/p{:02}.pdf", year % 100),
            "gabaritoPdf": format!("provas/g{:02}.pdf", year % 100),
        },
        "generatedAt": "2026-01-10T12:00:00Z",
        "questions": (1..=count).map(|n| question(year, n)).collect::<Vec<_>>(),
    });
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join(format!("fuvest-{year}.json")),
        serde_json::to_vec_pretty(&value).unwrap(),
    )
    .unwrap();
}

#[test]
fn missing_dataset_fails_the_gate() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .args(["qa", "2020", "--data-root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAILED"))
        .stdout(predicate::str::contains("dataset not found"));
}

#[test]
fn complete_dataset_passes_with_warnings() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 2020, 90);

    cmd()
        .args(["qa", "2020", "--data-root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK]"))
        .stdout(predicate::str::contains("questions: 90/90"));
}

#[test]
fn short_dataset_fails_with_missing_numbers() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 2020, 88);

    cmd()
        .args(["qa", "2020", "--data-root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("expected 90 questions, found 88"));
}

#[test]
fn json_flag_emits_the_structured_report() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 2020, 90);

    cmd()
        .args(["qa", "2020", "--json", "--data-root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"passed\": true"))
        .stdout(predicate::str::contains("\"questionCount\": 90"));
}
