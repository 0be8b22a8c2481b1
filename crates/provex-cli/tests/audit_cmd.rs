//! Integration tests for the `audit` subcommand.

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
fn audit_without_dataset_fails() {
    let dir = tempfile::tempdir().unwrap();

    cmd()
        .args(["audit", "2020", "--data-root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing input"));
}

#[test]
fn audit_flags_missing_crops_and_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), 2020, 2);

    cmd()
        .args(["audit", "2020", "--data-root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 crops audited, 2 flagged"));

    let json_report = dir.path().join("out").join("audit_crops_2020.json");
    let csv_report = dir.path().join("out").join("audit_crops_2020.csv");
    assert!(json_report.is_file());
    let csv = fs::read_to_string(csv_report).unwrap();
    assert!(csv.starts_with("year;number;width"));
    assert_eq!(csv.lines().count(), 3);
}
