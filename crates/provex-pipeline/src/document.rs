//! Document backend: the seam between the pipeline and the PDF library.
//!
//! Stages consume [`ExamDocument`], never pdfium directly, so the geometric
//! pipeline can be driven by an in-memory fake in tests. The production
//! backend converts pdfium's bottom-left-origin coordinates to the top-left
//! origin the core works in.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use pdfium_render::prelude::*;
use provex_core::{PointRect, TextBlock, Word};

use crate::error::{PipelineError, Result};

/// Everything the pipeline needs from one page, extracted eagerly.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
    /// The word layer, top-left origin.
    pub words: Vec<Word>,
    /// Paragraph-level blocks reconstructed from the word layer.
    pub blocks: Vec<TextBlock>,
    /// Raw page text in reading order.
    pub text: String,
}

/// Read access to one exam PDF. Pages are 1-based.
pub trait ExamDocument {
    fn page_count(&self) -> Result<u32>;

    fn page(&self, page: u32) -> Result<PageContent>;

    /// Rasterize one page at the given DPI.
    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage>;

    /// Concatenated text of every page.
    fn full_text(&self) -> Result<String> {
        let mut out = String::new();
        for page in 1..=self.page_count()? {
            out.push_str(&self.page(page)?.text);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Production backend over the pdfium library.
///
/// A `PdfDocument` borrows the library binding, so the file is reopened per
/// operation rather than held across calls. Pipeline stages sweep pages
/// sequentially and the reopen cost is small next to rendering.
pub struct PdfiumDocument {
    pdfium: Pdfium,
    path: PathBuf,
}

impl PdfiumDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(PipelineError::MissingInput(path));
        }
        let bindings = Pdfium::bind_to_system_library()
            .map_err(|e| PipelineError::Document(format!("pdfium binding failed: {e:?}")))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            path,
        })
    }

    fn load(&self) -> Result<PdfDocument<'_>> {
        self.pdfium
            .load_pdf_from_file(&self.path, None)
            .map_err(|e| PipelineError::Document(format!("{}: {e:?}", self.path.display())))
    }

    fn get_page<'a>(&self, document: &'a PdfDocument<'_>, page: u32) -> Result<PdfPage<'a>> {
        if page == 0 {
            return Err(PipelineError::Document("page numbers are 1-based".into()));
        }
        document
            .pages()
            .get((page - 1) as u16)
            .map_err(|e| PipelineError::Document(format!("page {page}: {e:?}")))
    }
}

impl ExamDocument for PdfiumDocument {
    fn page_count(&self) -> Result<u32> {
        Ok(self.load()?.pages().len() as u32)
    }

    fn page(&self, page: u32) -> Result<PageContent> {
        let document = self.load()?;
        let pdf_page = self.get_page(&document, page)?;
        let width = pdf_page.width().value as f64;
        let height = pdf_page.height().value as f64;

        let text = pdf_page
            .text()
            .map_err(|e| PipelineError::Document(format!("page {page} text: {e:?}")))?;

        let mut words = Vec::new();
        for (segment_idx, segment) in text.segments().iter().enumerate() {
            let bounds = segment.bounds();
            let rect = flip_rect(&bounds, height);
            split_segment(&segment.text(), rect, segment_idx as u32, &mut words);
        }

        let blocks = words_to_blocks(&words, width, 18.0);

        Ok(PageContent {
            width,
            height,
            words,
            blocks,
            text: text.all(),
        })
    }

    fn render_page(&self, page: u32, dpi: u32) -> Result<DynamicImage> {
        let document = self.load()?;
        let pdf_page = self.get_page(&document, page)?;
        let config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| PipelineError::Document(format!("page {page} render: {e:?}")))?;
        Ok(bitmap.as_image())
    }
}

/// Convert a pdfium rect (bottom-left origin, y grows upward) to top-left.
fn flip_rect(rect: &PdfRect, page_height: f64) -> PointRect {
    PointRect::new(
        rect.left.value as f64,
        page_height - rect.top.value as f64,
        rect.right.value as f64,
        page_height - rect.bottom.value as f64,
    )
}

/// Split one text segment into word tokens, interpolating each token's
/// horizontal extent from its character positions within the segment.
fn split_segment(text: &str, rect: PointRect, segment_idx: u32, out: &mut Vec<Word>) {
    let total = text.chars().count();
    if total == 0 {
        return;
    }
    let char_width = rect.width() / total as f64;

    let mut token = String::new();
    let mut token_start = 0usize;
    let mut token_idx = 0u32;
    let mut flush = |token: &mut String, start: usize, end: usize, token_idx: &mut u32| {
        if token.is_empty() {
            return;
        }
        let x0 = rect.x0 + start as f64 * char_width;
        let x1 = rect.x0 + end as f64 * char_width;
        out.push(Word::new(
            std::mem::take(token),
            PointRect::new(x0, rect.y0, x1, rect.y1),
            segment_idx,
            *token_idx,
        ));
        *token_idx += 1;
    };

    for (i, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            flush(&mut token, token_start, i, &mut token_idx);
        } else {
            if token.is_empty() {
                token_start = i;
            }
            token.push(ch);
        }
    }
    flush(&mut token, token_start, total, &mut token_idx);
}

/// Reconstruct paragraph-level blocks from the word layer.
///
/// Words are split by page column, grouped into visual lines, and consecutive
/// lines closer than `gap` points are merged into one block whose rect is the
/// union of its lines.
pub fn words_to_blocks(words: &[Word], page_width: f64, gap: f64) -> Vec<TextBlock> {
    let mid_x = page_width / 2.0;
    let mut blocks = Vec::new();

    for left in [true, false] {
        let column: Vec<&Word> = words
            .iter()
            .filter(|w| ((w.rect.x0 + w.rect.x1) / 2.0 < mid_x) == left)
            .collect();
        if column.is_empty() {
            continue;
        }

        // Visual lines within the column, top to bottom.
        let mut sorted = column.clone();
        sorted.sort_by(|a, b| {
            a.rect
                .y0
                .total_cmp(&b.rect.y0)
                .then(a.rect.x0.total_cmp(&b.rect.x0))
        });
        let mut lines: Vec<(f64, Vec<&Word>)> = Vec::new();
        for word in sorted {
            match lines.last_mut() {
                Some((y0, line)) if (word.rect.y0 - *y0).abs() <= 2.0 => line.push(word),
                _ => lines.push((word.rect.y0, vec![word])),
            }
        }

        let mut current: Option<(PointRect, String, f64)> = None;
        for (y0, mut line) in lines {
            line.sort_by(|a, b| a.rect.x0.total_cmp(&b.rect.x0));
            let line_text = line
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let line_rect = line.iter().fold(line[0].rect, |acc, w| {
                PointRect::new(
                    acc.x0.min(w.rect.x0),
                    acc.y0.min(w.rect.y0),
                    acc.x1.max(w.rect.x1),
                    acc.y1.max(w.rect.y1),
                )
            });

            match current.as_mut() {
                Some((rect, text, last_y0)) if y0 - *last_y0 <= gap => {
                    rect.x0 = rect.x0.min(line_rect.x0);
                    rect.y0 = rect.y0.min(line_rect.y0);
                    rect.x1 = rect.x1.max(line_rect.x1);
                    rect.y1 = rect.y1.max(line_rect.y1);
                    text.push('\n');
                    text.push_str(&line_text);
                    *last_y0 = y0;
                }
                _ => {
                    if let Some((rect, text, _)) = current.take() {
                        blocks.push(TextBlock { text, rect });
                    }
                    current = Some((line_rect, line_text, y0));
                }
            }
        }
        if let Some((rect, text, _)) = current.take() {
            blocks.push(TextBlock { text, rect });
        }
    }
    blocks
}
