//! QA gate: read-only checks a year must pass before publication.
//!
//! Errors fail the gate (wrong question count, gaps in numbering, unreadable
//! dataset). Warnings surface quality signals without failing it: missing
//! assets, placeholder percentages, suspiciously short bboxes, incomplete
//! enrichment.

use std::fs;

use serde::Serialize;

use provex_core::QUESTIONS_PER_EXAM;

use crate::dataset::Dataset;
use crate::layout::DataLayout;

/// Crops shorter than this many pixels are suspicious: a question that fits
/// in under 300 px at 200 dpi is usually a truncated interval.
const SMALL_BBOX_HEIGHT: u32 = 300;

#[derive(Debug, Clone, Serialize)]
pub struct QaReport {
    pub year: u16,
    pub passed: bool,
    pub checks: QaChecks,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QaChecks {
    pub json_exists: bool,
    pub json_valid: bool,
    pub question_count: usize,
    pub missing_numbers: Vec<u8>,
    pub missing_assets: Vec<u8>,
    pub page_count: usize,
    pub stems_placeholder_pct: f64,
    pub options_placeholder_pct: f64,
    pub small_bboxes: Vec<u8>,
    pub enriched_pct: f64,
}

fn is_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty() || trimmed.to_lowercase().contains("veja a imagem da quest")
}

fn pct(part: usize, whole: usize) -> f64 {
    (part as f64 / whole.max(1) as f64 * 1000.0).round() / 10.0
}

/// Run every check for one year. Never writes anything.
pub fn run_qa(layout: &DataLayout, year: u16) -> QaReport {
    let mut report = QaReport {
        year,
        passed: true,
        checks: QaChecks::default(),
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    let path = layout.dataset_path(year);
    if !path.is_file() {
        report.errors.push(format!("dataset not found: {}", path.display()));
        report.passed = false;
        return report;
    }
    report.checks.json_exists = true;

    let dataset: Dataset = match fs::read(&path)
        .map_err(|e| e.to_string())
        .and_then(|bytes| serde_json::from_slice(&bytes).map_err(|e| e.to_string()))
    {
        Ok(dataset) => dataset,
        Err(e) => {
            report.errors.push(format!("dataset unreadable: {e}"));
            report.passed = false;
            return report;
        }
    };
    report.checks.json_valid = true;

    let questions = &dataset.questions;
    report.checks.question_count = questions.len();
    if questions.len() != QUESTIONS_PER_EXAM as usize {
        report.errors.push(format!(
            "expected {QUESTIONS_PER_EXAM} questions, found {}",
            questions.len()
        ));
        report.passed = false;
    }

    let present: Vec<u8> = questions.iter().map(|q| q.number).collect();
    report.checks.missing_numbers = (1..=QUESTIONS_PER_EXAM)
        .filter(|n| !present.contains(n))
        .collect();
    if !report.checks.missing_numbers.is_empty() {
        report.errors.push(format!(
            "missing questions: {:?}",
            report.checks.missing_numbers
        ));
        report.passed = false;
    }

    for question in questions {
        let reference = question.assets.question_image.trim();
        if reference.is_empty() || !layout.resolve_asset_ref(reference).is_file() {
            report.checks.missing_assets.push(question.number);
        }
    }
    if !report.checks.missing_assets.is_empty() {
        report.warnings.push(format!(
            "{} questions without asset: {:?}",
            report.checks.missing_assets.len(),
            report.checks.missing_assets
        ));
    }

    let pages_dir = layout.pages_dir(year);
    match fs::read_dir(&pages_dir) {
        Ok(entries) => {
            report.checks.page_count = entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
                .count();
        }
        Err(_) => {
            report
                .warnings
                .push(format!("pages directory not found: {}", pages_dir.display()));
        }
    }

    let placeholder_stems = questions
        .iter()
        .filter(|q| is_placeholder(&q.stem) || q.stem.trim().chars().count() < 20)
        .count();
    let total_options: usize = questions.iter().map(|q| q.options.len()).sum();
    let placeholder_options = questions
        .iter()
        .flat_map(|q| &q.options)
        .filter(|o| is_placeholder(&o.text))
        .count();
    report.checks.stems_placeholder_pct = pct(placeholder_stems, questions.len());
    report.checks.options_placeholder_pct = pct(placeholder_options, total_options);
    if report.checks.stems_placeholder_pct > 50.0 {
        report.warnings.push(format!(
            "{}% of stems are placeholders",
            report.checks.stems_placeholder_pct
        ));
    }
    if report.checks.options_placeholder_pct > 50.0 {
        report.warnings.push(format!(
            "{}% of options are placeholders",
            report.checks.options_placeholder_pct
        ));
    }

    report.checks.small_bboxes = questions
        .iter()
        .filter(|q| q.bbox.h > 0 && q.bbox.h < SMALL_BBOX_HEIGHT)
        .map(|q| q.number)
        .collect();
    if report.checks.small_bboxes.len() >= 5 {
        report.warnings.push(format!(
            "{} bboxes under {SMALL_BBOX_HEIGHT}px tall, intervals may be truncated",
            report.checks.small_bboxes.len()
        ));
    }

    let enriched = questions
        .iter()
        .filter(|q| !q.explanation.is_pending())
        .count();
    report.checks.enriched_pct = pct(enriched, questions.len());
    if report.checks.enriched_pct < 100.0 {
        report.warnings.push(format!(
            "only {}% of questions enriched",
            report.checks.enriched_pct
        ));
    }

    report
}

/// Human-readable summary for the terminal.
pub fn format_report(report: &QaReport) -> String {
    let mut out = String::new();
    let status = if report.passed { "[OK]" } else { "[FAILED]" };
    out.push_str(&format!("QA GATE - FUVEST {} {status}\n", report.year));
    let c = &report.checks;
    out.push_str(&format!(
        "  questions: {}/{QUESTIONS_PER_EXAM}\n  missing: {:?}\n  missing assets: {}\n  pages: {}\n",
        c.question_count,
        c.missing_numbers,
        c.missing_assets.len(),
        c.page_count,
    ));
    out.push_str(&format!(
        "  placeholder stems: {}%\n  placeholder options: {}%\n  small bboxes: {}\n  enriched: {}%\n",
        c.stems_placeholder_pct,
        c.options_placeholder_pct,
        c.small_bboxes.len(),
        c.enriched_pct,
    ));
    for error in &report.errors {
        out.push_str(&format!("  error: {error}\n"));
    }
    for warning in &report.warnings {
        out.push_str(&format!("  warning: {warning}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{
        self, Answer, Assets, Dataset, Explanation, OptionEntry, Question, Source,
    };
    use provex_core::{OPTION_KEYS, PLACEHOLDER, PixelBox};

    fn question(number: u8) -> Question {
        Question {
            id: Question::make_id(2020, number),
            year: 2020,
            number,
            page: 2,
            bbox: PixelBox {
                x: 0,
                y: 100,
                w: 800,
                h: 700,
            },
            stem: "Um enunciado perfeitamente razoável para teste.".to_string(),
            options: OPTION_KEYS
                .iter()
                .map(|&key| OptionEntry {
                    key,
                    text: format!("alternativa {key}"),
                })
                .collect(),
            answer: Answer { correct: 'A' },
            explanation: Explanation::pending(),
            assets: Assets {
                question_image: format!("/assets/2020/q{number:02}/image.png"),
            },
        }
    }

    fn full_dataset() -> Dataset {
        Dataset {
            year: 2020,
            source: Source {
                prova_pdf: "provas/p20.pdf".to_string(),
                gabarito_pdf: "provas/g20.pdf".to_string(),
            },
            generated_at: "2026-01-10T12:00:00Z".to_string(),
            questions: (1..=90).map(question).collect(),
        }
    }

    #[test]
    fn missing_dataset_fails_the_gate() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_qa(&DataLayout::new(dir.path()), 2020);
        assert!(!report.passed);
        assert!(!report.checks.json_exists);
    }

    #[test]
    fn complete_dataset_passes_with_warnings_only() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        dataset::save(&full_dataset(), &layout.dataset_path(2020)).unwrap();

        let report = run_qa(&layout, 2020);
        assert!(report.passed, "errors: {:?}", report.errors);
        assert_eq!(report.checks.question_count, 90);
        assert!(report.checks.missing_numbers.is_empty());
        // Assets were never written; warning, not error.
        assert_eq!(report.checks.missing_assets.len(), 90);
        assert_eq!(report.checks.enriched_pct, 0.0);
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn gaps_in_numbering_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let mut dataset = full_dataset();
        dataset.questions.retain(|q| q.number != 37 && q.number != 38);
        dataset::save(&dataset, &layout.dataset_path(2020)).unwrap();

        let report = run_qa(&layout, 2020);
        assert!(!report.passed);
        assert_eq!(report.checks.missing_numbers, vec![37, 38]);
    }

    #[test]
    fn placeholder_percentages_are_measured() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let mut dataset = full_dataset();
        for question in dataset.questions.iter_mut().take(63) {
            question.stem = PLACEHOLDER.to_string();
        }
        dataset::save(&dataset, &layout.dataset_path(2020)).unwrap();

        let report = run_qa(&layout, 2020);
        assert_eq!(report.checks.stems_placeholder_pct, 70.0);
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("stems are placeholders"))
        );
    }

    #[test]
    fn small_bboxes_are_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let mut dataset = full_dataset();
        for question in dataset.questions.iter_mut().take(6) {
            question.bbox.h = 120;
        }
        dataset::save(&dataset, &layout.dataset_path(2020)).unwrap();

        let report = run_qa(&layout, 2020);
        assert_eq!(report.checks.small_bboxes.len(), 6);
        assert!(report.warnings.iter().any(|w| w.contains("truncated")));
    }
}
