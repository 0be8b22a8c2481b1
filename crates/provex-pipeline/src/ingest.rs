//! Pipeline Driver: PDFs in, per-year dataset out.
//!
//! The geometric rect index is authoritative for bboxes; extracted text is
//! best-effort with OCR and vision fallbacks, degrading to the placeholder
//! with the cropped image as ground truth. Re-running is safe: geometry is
//! deterministic and non-pending explanations are carried over when a
//! question's content hash is unchanged.

use std::collections::BTreeMap;
use std::fs;

use chrono::Utc;
use image::DynamicImage;
use log::{info, warn};

use provex_core::{
    ColumnOptions, MarkerOptions, OPTION_KEYS, OptionVerdict, PLACEHOLDER, PageMarkers,
    QuestionRegion, ReferenceBlock, ReferenceTarget, SanitizeOptions, SegmentOptions, TextClass,
    build_rect_index, build_reference_blocks, classify, classify_option, detect_markers,
    missing_numbers, parse_answer_key, segment_question, stem_mentions_label,
    words::clip_words,
};

use crate::assets;
use crate::cache::ContentCache;
use crate::client::{VisionModel, parse_answer_key_map, parse_page_extraction};
use crate::dataset::{self, Answer, Assets, Dataset, Explanation, OptionEntry, Question, Source};
use crate::document::ExamDocument;
use crate::error::{PipelineError, Result};
use crate::layout::DataLayout;
use crate::ocr::{self, OcrEngine};

/// Stems are capped at this many characters; anything longer is a
/// segmentation accident, not a real stem.
pub const MAX_STEM_CHARS: usize = 2000;

const PAGE_PROMPT: &str = "\
Sua tarefa e transcrever CADA QUESTAO numerada visivel nesta pagina de prova.
REGRAS:
1) Transcreva o enunciado e as cinco alternativas (A..E) exatamente como impressos.
2) IGNORE cabecalhos, rodapes e logos.
3) Output deve ser SOMENTE JSON estrito.
Schema de saida:
{\"questions\": [{\"number\": number, \"stem\": string, \"options\": [{\"key\": \"A\", \"text\": string}]}]}";

const ANSWER_KEY_PROMPT: &str = "\
Esta imagem e um gabarito oficial com pares numero-letra.
Transcreva TODOS os pares como um objeto JSON {\"1\": \"A\", \"2\": \"C\", ...}.
Output deve ser SOMENTE JSON estrito.";

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    pub dpi: u32,
    /// Preserve prior non-pending explanations on unchanged questions.
    pub carry_over: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            dpi: 200,
            carry_over: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub pages: u32,
    pub questions: usize,
    pub carried_over: usize,
}

struct PageData {
    /// 1-based PDF page number.
    number: u32,
    content: crate::document::PageContent,
    image: DynamicImage,
    png_bytes: Vec<u8>,
}

/// Run full ingestion for one year.
pub fn ingest_year(
    exam: &dyn ExamDocument,
    answer_key_doc: Option<&dyn ExamDocument>,
    vision: Option<&dyn VisionModel>,
    ocr_engine: Option<&dyn OcrEngine>,
    layout: &DataLayout,
    year: u16,
    options: &IngestOptions,
) -> Result<IngestSummary> {
    let pages = render_and_load_pages(exam, layout, year, options.dpi)?;
    let index = build_index(&pages, options.dpi);
    info!("{} question regions on {} pages", index.len(), pages.len());

    let references = collect_references(&pages, options.dpi);
    let extraction_cache = ContentCache::new(layout.cache_dir(year, "extraction"));

    let mut questions = Vec::with_capacity(index.len());
    for (&number, region) in &index {
        let page = pages
            .iter()
            .find(|p| p.number == region.page)
            .ok_or_else(|| PipelineError::Invalid(format!("region on unknown page {}", region.page)))?;

        let crop = assets::auto_trim(&assets::crop_question(&page.image, &region.bbox));
        let asset_path = layout.question_asset(year, number);
        if let Some(parent) = asset_path.parent() {
            fs::create_dir_all(parent)?;
        }
        crop.save(&asset_path)?;

        let (stem, option_texts) = question_text(
            page,
            region,
            number,
            ocr_engine,
            &asset_path,
            vision,
            &extraction_cache,
        )?;

        questions.push(Question {
            id: Question::make_id(year, number),
            year,
            number,
            page: region.page,
            bbox: region.bbox,
            stem,
            options: OPTION_KEYS
                .iter()
                .zip(option_texts)
                .map(|(&key, text)| OptionEntry { key, text })
                .collect(),
            answer: Answer { correct: '?' },
            explanation: Explanation::pending(),
            assets: Assets {
                question_image: layout.question_asset_ref(year, number),
            },
        });
    }

    attach_references(&mut questions, &references, &pages, layout, year)?;

    let key = merge_answer_key(answer_key_doc, vision, layout, year, options.dpi)?;
    let missing: Vec<u8> = questions
        .iter()
        .map(|q| q.number)
        .filter(|n| !key.contains_key(n))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::IncompleteAnswerKey { missing });
    }
    for question in &mut questions {
        if let Some(&letter) = key.get(&question.number) {
            question.answer.correct = letter;
        }
    }

    let mut carried_over = 0;
    if options.carry_over {
        carried_over = carry_over_explanations(&mut questions, layout, year)?;
    }

    let dataset = Dataset {
        year,
        source: Source {
            prova_pdf: format!("provas/p{:02}.pdf", year % 100),
            gabarito_pdf: format!("provas/g{:02}.pdf", year % 100),
        },
        generated_at: Utc::now().to_rfc3339(),
        questions,
    };
    for problem in dataset::validate(&dataset) {
        warn!("{year}: {problem}");
    }
    dataset::save(&dataset, &layout.dataset_path(year))?;

    Ok(IngestSummary {
        pages: pages.len() as u32,
        questions: dataset.questions.len(),
        carried_over,
    })
}

/// Recompute geometry and crops for an existing dataset without touching
/// text, answers, or explanations. Makes no external-model calls.
pub fn recrop_year(
    exam: &dyn ExamDocument,
    layout: &DataLayout,
    year: u16,
    options: &IngestOptions,
) -> Result<IngestSummary> {
    let mut dataset = dataset::load(&layout.dataset_path(year))?;
    let pages = render_and_load_pages(exam, layout, year, options.dpi)?;
    let index = build_index(&pages, options.dpi);
    let references = collect_references(&pages, options.dpi);

    let mut recropped = 0;
    for question in &mut dataset.questions {
        let Some(region) = index.get(&question.number) else {
            warn!("q{:02}: no region found, keeping previous crop", question.number);
            continue;
        };
        let Some(page) = pages.iter().find(|p| p.number == region.page) else {
            continue;
        };
        question.page = region.page;
        question.bbox = region.bbox;

        let mut crop = assets::auto_trim(&assets::crop_question(&page.image, &region.bbox));
        if let Some((reference, ref_page)) = owning_reference(&references, &pages, question) {
            let ref_crop = assets::auto_trim(&assets::crop_padded(
                &ref_page.image,
                &reference.bbox,
                assets::CROP_PADDING,
            ));
            crop = assets::stack_vertical(&ref_crop, &crop);
        }
        let asset_path = layout.question_asset(year, question.number);
        if let Some(parent) = asset_path.parent() {
            fs::create_dir_all(parent)?;
        }
        crop.save(&asset_path)?;
        question.assets.question_image = layout.question_asset_ref(year, question.number);
        recropped += 1;
    }

    dataset.generated_at = Utc::now().to_rfc3339();
    dataset::save(&dataset, &layout.dataset_path(year))?;
    Ok(IngestSummary {
        pages: pages.len() as u32,
        questions: recropped,
        carried_over: 0,
    })
}

fn render_and_load_pages(
    exam: &dyn ExamDocument,
    layout: &DataLayout,
    year: u16,
    dpi: u32,
) -> Result<Vec<PageData>> {
    let count = exam.page_count()?;
    let pages_dir = layout.pages_dir(year);
    fs::create_dir_all(&pages_dir)?;

    let mut pages = Vec::with_capacity(count as usize);
    for number in 1..=count {
        let image = exam.render_page(number, dpi)?;
        let path = layout.page_image(year, number);
        image.save(&path)?;
        let png_bytes = fs::read(&path)?;
        pages.push(PageData {
            number,
            content: exam.page(number)?,
            image,
            png_bytes,
        });
    }
    info!("rendered {count} pages at {dpi} dpi");
    Ok(pages)
}

fn build_index(pages: &[PageData], dpi: u32) -> BTreeMap<u8, QuestionRegion> {
    let marker_options = MarkerOptions::default();
    let page_markers: Vec<PageMarkers> = pages
        .iter()
        .map(|page| PageMarkers {
            page: page.number,
            width: page.content.width,
            height: page.content.height,
            markers: detect_markers(
                &page.content.words,
                (page.number - 1) as usize,
                &page.content.text,
                &marker_options,
            ),
        })
        .collect();
    build_rect_index(&page_markers, dpi, &ColumnOptions::default())
}

/// All reference blocks in the document, deduplicated by title + page +
/// rectangle so overlapping detections attach only once.
fn collect_references(pages: &[PageData], dpi: u32) -> Vec<ReferenceBlock> {
    let marker_options = MarkerOptions::default();
    let column_options = ColumnOptions::default();
    let mut references: Vec<ReferenceBlock> = Vec::new();
    for page in pages {
        let markers = detect_markers(
            &page.content.words,
            (page.number - 1) as usize,
            &page.content.text,
            &marker_options,
        );
        for candidate in build_reference_blocks(
            &page.content.blocks,
            &markers,
            page.number,
            page.content.width,
            page.content.height,
            dpi,
            column_options.pad,
        ) {
            let duplicate = references.iter().any(|r| {
                r.page == candidate.page
                    && r.title == candidate.title
                    && r.rect.approx_eq(&candidate.rect, 1.0)
            });
            if !duplicate {
                references.push(candidate);
            }
        }
    }
    references
}

/// Extract stem and option texts for one question, falling back from the
/// embedded text layer to OCR to the vision model to the placeholder.
fn question_text(
    page: &PageData,
    region: &QuestionRegion,
    number: u8,
    ocr_engine: Option<&dyn OcrEngine>,
    asset_path: &std::path::Path,
    vision: Option<&dyn VisionModel>,
    extraction_cache: &ContentCache,
) -> Result<(String, [String; 5])> {
    let sanitize_options = SanitizeOptions::default();
    let words = clip_words(&page.content.words, &region.rect);
    let segmented = segment_question(&words, &SegmentOptions::default());

    let mut stem = segmented
        .as_ref()
        .map(|s| s.stem.clone())
        .filter(|s| classify(s, &sanitize_options) == TextClass::Reliable)
        .unwrap_or_default();

    let mut option_texts: [String; 5] = std::array::from_fn(|_| PLACEHOLDER.to_string());
    if let Some(segmented) = &segmented {
        for (slot, text) in segmented.options.iter().enumerate() {
            option_texts[slot] = match classify_option(text, &sanitize_options) {
                OptionVerdict::Keep => text.clone(),
                OptionVerdict::TruncateAt(at) => text[..at].trim().to_string(),
                OptionVerdict::Replace => PLACEHOLDER.to_string(),
            };
        }
    }

    let text_unusable =
        stem.is_empty() || option_texts.iter().all(|t| t == PLACEHOLDER);
    if text_unusable {
        if let Some(engine) = ocr_engine {
            let recognized = engine.image_to_text(asset_path);
            if stem.is_empty() {
                let ocr_stem = ocr::parse_stem(&recognized);
                if !ocr_stem.is_empty()
                    && classify(&ocr_stem, &sanitize_options) == TextClass::Reliable
                {
                    stem = ocr_stem;
                }
            }
            if option_texts.iter().all(|t| t == PLACEHOLDER) {
                if let Some(parsed) = ocr::parse_options(&recognized) {
                    option_texts = parsed;
                }
            }
        }
    }

    if stem.is_empty() || option_texts.iter().all(|t| t == PLACEHOLDER) {
        if let Some(model) = vision {
            apply_vision_extraction(
                model,
                extraction_cache,
                page,
                number,
                &mut stem,
                &mut option_texts,
                &sanitize_options,
            )?;
        }
    }

    if stem.is_empty() {
        stem = PLACEHOLDER.to_string();
    }
    if stem.chars().count() > MAX_STEM_CHARS {
        stem = stem.chars().take(MAX_STEM_CHARS).collect();
    }
    Ok((stem, option_texts))
}

fn apply_vision_extraction(
    model: &dyn VisionModel,
    cache: &ContentCache,
    page: &PageData,
    number: u8,
    stem: &mut String,
    option_texts: &mut [String; 5],
    sanitize_options: &SanitizeOptions,
) -> Result<()> {
    let key = ContentCache::key_for(&page.png_bytes);
    let value = match cache.get::<serde_json::Value>(&key)? {
        Some(hit) => hit,
        None => {
            let response = model.generate_json_with_image(PAGE_PROMPT, &page.png_bytes)?;
            cache.put(&key, &response)?;
            response
        }
    };

    for extracted in parse_page_extraction(&value) {
        if extracted.number != number {
            continue;
        }
        if stem.is_empty()
            && !extracted.stem.is_empty()
            && classify(&extracted.stem, sanitize_options) == TextClass::Reliable
        {
            *stem = extracted.stem.clone();
        }
        for (key, text) in &extracted.options {
            let Some(slot) = OPTION_KEYS.iter().position(|k| k == key) else {
                continue;
            };
            if option_texts[slot] == PLACEHOLDER
                && classify_option(text, sanitize_options) == OptionVerdict::Keep
            {
                option_texts[slot] = text.clone();
            }
        }
    }
    Ok(())
}

fn owning_reference<'a>(
    references: &'a [ReferenceBlock],
    pages: &'a [PageData],
    question: &Question,
) -> Option<(&'a ReferenceBlock, &'a PageData)> {
    let reference = references.iter().find(|r| match &r.target {
        ReferenceTarget::Numbers(numbers) => numbers.contains(&question.number),
        ReferenceTarget::Label(label) => stem_mentions_label(&question.stem, label),
    })?;
    let page = pages.iter().find(|p| p.number == reference.page)?;
    Some((reference, page))
}

/// Prepend reference text to owning stems and composite the reference crop
/// above the question crop.
fn attach_references(
    questions: &mut [Question],
    references: &[ReferenceBlock],
    pages: &[PageData],
    layout: &DataLayout,
    year: u16,
) -> Result<()> {
    for question in questions.iter_mut() {
        let Some((reference, page)) = owning_reference(references, pages, question) else {
            continue;
        };

        if question.stem != PLACEHOLDER && !question.stem.starts_with(&reference.text) {
            question.stem = format!("{}\n\n{}", reference.text, question.stem);
            if question.stem.chars().count() > MAX_STEM_CHARS {
                question.stem = question.stem.chars().take(MAX_STEM_CHARS).collect();
            }
        }

        let asset_path = layout.question_asset(year, question.number);
        let question_crop = image::open(&asset_path)?;
        let ref_crop = assets::auto_trim(&assets::crop_padded(
            &page.image,
            &reference.bbox,
            assets::CROP_PADDING,
        ));
        assets::stack_vertical(&ref_crop, &question_crop).save(&asset_path)?;
    }
    Ok(())
}

/// Answer key from the gabarito text layer, topped up by vision OCR when
/// pairs are missing.
fn merge_answer_key(
    answer_key_doc: Option<&dyn ExamDocument>,
    vision: Option<&dyn VisionModel>,
    layout: &DataLayout,
    year: u16,
    dpi: u32,
) -> Result<BTreeMap<u8, char>> {
    let Some(doc) = answer_key_doc else {
        return Ok(BTreeMap::new());
    };
    let mut key = parse_answer_key(&doc.full_text()?, provex_core::QUESTIONS_PER_EXAM);

    let unresolved = missing_numbers(&key, provex_core::QUESTIONS_PER_EXAM);
    if !unresolved.is_empty() {
        info!(
            "answer key text layer left {} numbers unresolved: {unresolved:?}",
            unresolved.len()
        );
        if let Some(model) = vision {
            let cache = ContentCache::new(layout.cache_dir(year, "answer-key"));
            for page in 1..=doc.page_count()? {
                let image = doc.render_page(page, dpi)?;
                let mut png = Vec::new();
                image.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)?;
                let cache_key = ContentCache::key_for(&png);
                let value = match cache.get::<serde_json::Value>(&cache_key)? {
                    Some(hit) => hit,
                    None => {
                        let response = model.generate_json_with_image(ANSWER_KEY_PROMPT, &png)?;
                        cache.put(&cache_key, &response)?;
                        response
                    }
                };
                for (number, letter) in parse_answer_key_map(&value) {
                    key.entry(number).or_insert(letter);
                }
            }
        }
    }
    Ok(key)
}

/// Keep prior non-pending explanations for questions whose content hash is
/// unchanged. Returns how many were preserved.
fn carry_over_explanations(
    questions: &mut [Question],
    layout: &DataLayout,
    year: u16,
) -> Result<usize> {
    let path = layout.dataset_path(year);
    if !path.is_file() {
        return Ok(0);
    }
    let previous = dataset::load(&path)?;
    let by_id: BTreeMap<&str, &Question> = previous
        .questions
        .iter()
        .map(|q| (q.id.as_str(), q))
        .collect();

    let mut carried = 0;
    for question in questions.iter_mut() {
        let Some(old) = by_id.get(question.id.as_str()) else {
            continue;
        };
        if !old.explanation.is_pending() && old.content_hash() == question.content_hash() {
            question.explanation = old.explanation.clone();
            carried += 1;
        }
    }
    info!("carried over {carried} explanations");
    Ok(carried)
}
