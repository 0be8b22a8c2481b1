//! The per-year dataset: serde model, atomic persistence, structural
//! validation, and the content hash that keys enrichment carry-over.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use provex_core::{OPTION_KEYS, PixelBox, QUESTIONS_PER_EXAM};

use crate::error::{PipelineError, Result};

/// Sentinel stored in `explanation.theory` until enrichment runs.
pub const PENDING: &str = "Pendente";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub year: u16,
    pub source: Source,
    pub generated_at: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub prova_pdf: String,
    pub gabarito_pdf: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub year: u16,
    pub number: u8,
    pub page: u32,
    pub bbox: PixelBox,
    pub stem: String,
    pub options: Vec<OptionEntry>,
    pub answer: Answer,
    pub explanation: Explanation,
    pub assets: Assets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub key: char,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub correct: char,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub theory: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub distractors: BTreeMap<char, String>,
    #[serde(default)]
    pub final_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assets {
    pub question_image: String,
}

impl Explanation {
    /// The not-yet-enriched state every question starts in.
    pub fn pending() -> Self {
        Self {
            theory: PENDING.to_string(),
            steps: Vec::new(),
            distractors: OPTION_KEYS.iter().map(|&k| (k, String::new())).collect(),
            final_summary: String::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.theory.is_empty() || self.theory == PENDING
    }
}

impl Question {
    pub fn make_id(year: u16, number: u8) -> String {
        format!("fuvest-{year}-q{number:02}")
    }

    /// Hash of the content an explanation depends on. Carry-over across
    /// re-ingestion only keeps an old explanation when this is unchanged.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.stem.as_bytes());
        for option in &self.options {
            hasher.update([option.key as u8]);
            hasher.update(option.text.as_bytes());
        }
        hasher.update([self.answer.correct as u8]);
        hex_digest(hasher)
    }
}

pub(crate) fn hex_digest(hasher: Sha256) -> String {
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub fn load(path: &Path) -> Result<Dataset> {
    if !path.is_file() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write the dataset atomically: serialize to a sibling temp file, then
/// rename over the target. A process killed mid-write never leaves a
/// truncated dataset behind.
pub fn save(dataset: &Dataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(dataset)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Structural validation of a finalized dataset.
///
/// Returns every problem found rather than stopping at the first, so one run
/// gives the operator the full picture.
pub fn validate(dataset: &Dataset) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = BTreeMap::new();

    for question in &dataset.questions {
        let label = format!("q{:02}", question.number);

        if question.number == 0 || question.number > QUESTIONS_PER_EXAM {
            problems.push(format!("{label}: number out of range 1..=90"));
        }
        if let Some(previous) = seen.insert(question.number, question.page) {
            problems.push(format!(
                "{label}: duplicate number (also on page {previous})"
            ));
        }
        if question.year != dataset.year {
            problems.push(format!(
                "{label}: year {} does not match dataset year {}",
                question.year, dataset.year
            ));
        }
        if question.id != Question::make_id(dataset.year, question.number) {
            problems.push(format!("{label}: malformed id {:?}", question.id));
        }
        if question.page == 0 {
            problems.push(format!("{label}: page must be 1-based"));
        }
        if question.bbox.w == 0 || question.bbox.h == 0 {
            problems.push(format!("{label}: degenerate bbox"));
        }
        if question.stem.trim().is_empty() {
            problems.push(format!("{label}: empty stem"));
        }

        let keys: Vec<char> = question.options.iter().map(|o| o.key).collect();
        if keys != OPTION_KEYS {
            problems.push(format!("{label}: options are not exactly A..E, got {keys:?}"));
        }
        for option in &question.options {
            if option.text.trim().is_empty() {
                problems.push(format!("{label}: option {} has empty text", option.key));
            }
        }

        if !OPTION_KEYS.contains(&question.answer.correct) && question.answer.correct != '*' {
            problems.push(format!(
                "{label}: answer {:?} not in A..E",
                question.answer.correct
            ));
        }
        if question.assets.question_image.trim().is_empty() {
            problems.push(format!("{label}: missing asset path"));
        }
    }
    problems
}
