use log::warn;

use provex_pipeline::DataLayout;
use provex_pipeline::client::{GeminiClient, VisionModel};
use provex_pipeline::document::ExamDocument;
use provex_pipeline::ingest::{self, IngestOptions};
use provex_pipeline::ocr::{OcrEngine, TesseractOcr};

use crate::shared;

pub fn run(
    layout: &DataLayout,
    year: u16,
    dpi: u32,
    skip_enrichment_carryover: bool,
    model: &str,
    no_vision: bool,
    no_ocr: bool,
) -> Result<(), i32> {
    let exam = shared::open_document(&layout.exam_pdf(year))?;

    let key_path = layout.answer_key_pdf(year);
    let answer_key = if key_path.is_file() {
        Some(shared::open_document(&key_path)?)
    } else {
        warn!("no answer-key pdf at {}", key_path.display());
        None
    };

    let vision = if no_vision {
        None
    } else {
        match GeminiClient::from_env(model) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("vision fallback disabled: {e}");
                None
            }
        }
    };
    let ocr = (!no_ocr).then(TesseractOcr::new);

    let options = IngestOptions {
        dpi,
        carry_over: !skip_enrichment_carryover,
    };
    let summary = ingest::ingest_year(
        &exam,
        answer_key.as_ref().map(|d| d as &dyn ExamDocument),
        vision.as_ref().map(|c| c as &dyn VisionModel),
        ocr.as_ref().map(|o| o as &dyn OcrEngine),
        layout,
        year,
        &options,
    )
    .map_err(shared::fail)?;

    println!(
        "{year}: {} questions from {} pages, {} explanations carried over",
        summary.questions, summary.pages, summary.carried_over
    );
    println!("dataset: {}", layout.dataset_path(year).display());
    Ok(())
}
