//! Local OCR fallback for pages whose embedded text layer is garbled.
//!
//! Shells out to tesseract with the Portuguese language pack. OCR is a
//! best-effort rescue before giving up and writing the placeholder, so every
//! failure mode (binary missing, bad exit, undecodable output) collapses to
//! "no text".

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use provex_core::{OPTION_KEYS, PLACEHOLDER};

/// Text recognition over an image file.
pub trait OcrEngine {
    /// Extracted text, or an empty string when recognition fails.
    fn image_to_text(&self, image: &Path) -> String;
}

pub struct TesseractOcr {
    lang: String,
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self {
            lang: "por".to_string(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractOcr {
    fn image_to_text(&self, image: &Path) -> String {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output();
        match output {
            Ok(out) if out.status.success() => {
                String::from_utf8_lossy(&out.stdout).trim().to_string()
            }
            Ok(out) => {
                debug!("tesseract exited with {}", out.status);
                String::new()
            }
            Err(e) => {
                debug!("tesseract not runnable: {e}");
                String::new()
            }
        }
    }
}

fn paren_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([A-E])\)").unwrap())
}

fn close_paren_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^([A-E])\)").unwrap())
}

/// Each option body runs from the end of its marker to the start of the next
/// marker (or the end of the text).
fn collect_options(re: &Regex, text: &str) -> Vec<(char, String)> {
    let marks: Vec<(usize, usize, char)> = re
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1)?.as_str().chars().next()?;
            Some((whole.start(), whole.end(), key))
        })
        .collect();
    marks
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start, key))| {
            let body_end = marks.get(i + 1).map_or(text.len(), |&(start, _, _)| start);
            let body: String = text[body_start..body_end].trim().chars().take(500).collect();
            (key, body)
        })
        .collect()
}

fn option_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\(?[A-E]\)?\s*[.\-–:]?\s*\w").unwrap())
}

fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d{1,2}\s*[.)]\s*").unwrap())
}

/// Pull lettered options out of OCR text.
///
/// Tries `(A) ...` then `A) ...` markers; a parse is accepted only when at
/// least three options are found, otherwise noise would masquerade as
/// alternatives. Missing keys are filled with the placeholder.
pub fn parse_options(text: &str) -> Option<[String; 5]> {
    let mut found: Vec<(char, String)> = Vec::new();
    for re in [paren_marker_re(), close_paren_marker_re()] {
        found = collect_options(re, text);
        if found.len() >= 3 {
            break;
        }
    }
    if found.len() < 3 {
        return None;
    }

    let mut options: [String; 5] = std::array::from_fn(|_| PLACEHOLDER.to_string());
    for (key, body) in found {
        if let Some(slot) = OPTION_KEYS.iter().position(|&k| k == key) {
            if !body.is_empty() {
                options[slot] = body;
            }
        }
    }
    Some(options)
}

/// Everything before the first option marker, minus a leading question
/// number.
pub fn parse_stem(text: &str) -> String {
    let stripped = leading_number_re().replace(text, "");
    let head = match option_start_re().find(&stripped) {
        Some(m) => &stripped[..m.start()],
        None => &stripped,
    };
    head.trim().to_string()
}
