//! Generative-model client.
//!
//! Stages depend on the [`TextModel`]/[`VisionModel`] traits; the concrete
//! [`GeminiClient`] is plain state handed in by the caller, never a global.
//! Responses are requested in JSON mode and decoded leniently: a malformed
//! entry becomes a skip, not a panic, because a single bad page must not sink
//! a whole batch run.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use base64::Engine;
use log::{debug, warn};
use serde_json::{Value, json};

use crate::dataset::Explanation;
use crate::error::{PipelineError, Result};

/// Text-only generation returning a JSON value.
pub trait TextModel {
    fn generate_json(&self, prompt: &str) -> Result<Value>;
}

/// Generation over a prompt plus one PNG image.
pub trait VisionModel {
    fn generate_json_with_image(&self, prompt: &str, png: &[u8]) -> Result<Value>;
}

const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const FALLBACK_RATE_LIMIT_WAIT: Duration = Duration::from_secs(30);

pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
    /// Minimum spacing between consecutive API calls.
    min_interval: Duration,
    max_attempts: u32,
    last_call: Cell<Option<Instant>>,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            min_interval: Duration::from_secs(4),
            max_attempts: 4,
            last_call: Cell::new(None),
        }
    }

    /// Build a client from `GEMINI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| PipelineError::Api("GEMINI_API_KEY is not set".into()))?;
        Ok(Self::new(api_key, model))
    }

    fn throttle(&self) {
        if let Some(last) = self.last_call.get() {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last_call.set(Some(Instant::now()));
    }

    fn call(&self, parts: Vec<Value>) -> Result<Value> {
        let url = format!(
            "{ENDPOINT}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "response_mime_type": "application/json" },
        });

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.throttle();
            let response = self.http.post(&url).json(&body).send()?;
            let status = response.status();

            if status.is_success() {
                let envelope: Value = response.json()?;
                return extract_payload(&envelope);
            }

            let payload = response.text().unwrap_or_default();
            if attempt >= self.max_attempts {
                return Err(PipelineError::Api(format!(
                    "giving up after {attempt} attempts: {status}: {payload}"
                )));
            }

            let wait = if status.as_u16() == 429 {
                let wait = retry_delay(&payload).unwrap_or(FALLBACK_RATE_LIMIT_WAIT);
                warn!("rate limited, waiting {}s", wait.as_secs());
                wait
            } else if status.is_server_error() {
                Duration::from_secs(2u64.pow(attempt))
            } else {
                return Err(PipelineError::Api(format!("{status}: {payload}")));
            };
            debug!("attempt {attempt} failed with {status}, retrying");
            thread::sleep(wait);
        }
    }
}

impl TextModel for GeminiClient {
    fn generate_json(&self, prompt: &str) -> Result<Value> {
        self.call(vec![json!({ "text": prompt })])
    }
}

impl VisionModel for GeminiClient {
    fn generate_json_with_image(&self, prompt: &str, png: &[u8]) -> Result<Value> {
        let data = base64::engine::general_purpose::STANDARD.encode(png);
        self.call(vec![
            json!({ "text": prompt }),
            json!({ "inline_data": { "mime_type": "image/png", "data": data } }),
        ])
    }
}

/// Pull the JSON the model was asked for out of the response envelope.
fn extract_payload(envelope: &Value) -> Result<Value> {
    let text = envelope
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| PipelineError::Api("response has no candidate text".into()))?;
    serde_json::from_str(text)
        .map_err(|e| PipelineError::Api(format!("candidate is not valid json: {e}")))
}

/// Server-suggested wait from a rate-limit error body (`retryDelay: "30s"`).
fn retry_delay(payload: &str) -> Option<Duration> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let details = value.pointer("/error/details")?.as_array()?;
    for detail in details {
        if let Some(delay) = detail.get("retryDelay").and_then(Value::as_str) {
            let seconds: f64 = delay.trim_end_matches('s').parse().ok()?;
            return Some(Duration::from_secs_f64(seconds.max(1.0)));
        }
    }
    None
}

/// One question as extracted from a rendered page by the vision model.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedQuestion {
    pub number: u8,
    pub stem: String,
    /// `(key, text)` pairs as returned; callers normalize to exactly A..E.
    pub options: Vec<(char, String)>,
}

/// Decode a page-extraction response, skipping malformed entries.
pub fn parse_page_extraction(value: &Value) -> Vec<ExtractedQuestion> {
    let Some(questions) = value.get("questions").and_then(Value::as_array) else {
        return Vec::new();
    };
    questions
        .iter()
        .filter_map(|q| {
            let number = lenient_u8(q.get("number")?)?;
            if number == 0 || number > 90 {
                return None;
            }
            let stem = q
                .get("stem")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            let options = q
                .get("options")
                .and_then(Value::as_array)
                .map(|opts| {
                    opts.iter()
                        .filter_map(|o| {
                            let key = o.get("key")?.as_str()?.trim().chars().next()?;
                            let text = o.get("text").and_then(Value::as_str).unwrap_or_default();
                            key.is_ascii_uppercase()
                                .then(|| (key, text.trim().to_string()))
                        })
                        .collect()
                })
                .unwrap_or_default();
            Some(ExtractedQuestion {
                number,
                stem,
                options,
            })
        })
        .collect()
}

/// Decode an enrichment response into an [`Explanation`].
///
/// Requires a non-empty `theory`; everything else defaults to empty so a
/// partially-filled response is still usable.
pub fn parse_explanation(value: &Value) -> Option<Explanation> {
    let theory = value.get("theory")?.as_str()?.trim().to_string();
    if theory.is_empty() {
        return None;
    }
    let steps = value
        .get("steps")
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let distractors = value
        .get("distractors")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| {
                    let key = k.trim().chars().next()?;
                    Some((key, v.as_str().unwrap_or_default().to_string()))
                })
                .collect()
        })
        .unwrap_or_default();
    let final_summary = value
        .get("finalSummary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(Explanation {
        theory,
        steps,
        distractors,
        final_summary,
    })
}

/// Decode an answer-key response shaped as `{"1": "A", "2": "C", ...}`.
pub fn parse_answer_key_map(value: &Value) -> BTreeMap<u8, char> {
    let mut key_map = BTreeMap::new();
    let Some(map) = value.as_object() else {
        return key_map;
    };
    for (number, letter) in map {
        let Ok(number) = number.trim().parse::<u8>() else {
            continue;
        };
        let Some(letter) = letter.as_str().and_then(|s| s.trim().chars().next()) else {
            continue;
        };
        if (1..=90).contains(&number) && ('A'..='E').contains(&letter) {
            key_map.entry(number).or_insert(letter);
        }
    }
    key_map
}

fn lenient_u8(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => u8::try_from(n.as_u64()?).ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
