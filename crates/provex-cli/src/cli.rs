use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Batch pipeline: Fuvest exam PDFs in, per-question JSON datasets out.
#[derive(Debug, Parser)]
#[command(name = "provex", about, version)]
pub struct Cli {
    /// Root directory holding provas/, data/, assets/, out/
    #[arg(long, global = true, default_value = ".", value_name = "DIR")]
    pub data_root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render every page of a year's exam PDF to PNG
    Render {
        /// Exam year (e.g. 2020)
        #[arg(value_name = "YEAR")]
        year: u16,

        /// Render resolution in dots per inch
        #[arg(long, default_value_t = 200)]
        dpi: u32,
    },

    /// Build the per-question dataset for one year
    Ingest {
        /// Exam year (e.g. 2020)
        #[arg(value_name = "YEAR")]
        year: u16,

        /// Render resolution in dots per inch
        #[arg(long, default_value_t = 200)]
        dpi: u32,

        /// Reset every explanation to pending instead of carrying over
        /// unchanged ones
        #[arg(long)]
        skip_enrichment_carryover: bool,

        /// Generative model used for text and answer-key fallbacks
        #[arg(long, default_value = "gemini-2.0-flash", value_name = "MODEL")]
        model: String,

        /// Disable the vision-model text fallback
        #[arg(long)]
        no_vision: bool,

        /// Disable the tesseract OCR fallback
        #[arg(long)]
        no_ocr: bool,
    },

    /// Recompute geometry and crops without touching text or explanations
    Recrop {
        /// Exam year (e.g. 2020)
        #[arg(value_name = "YEAR")]
        year: u16,

        /// Render resolution in dots per inch
        #[arg(long, default_value_t = 200)]
        dpi: u32,
    },

    /// Generate explanations for pending questions
    Enrich {
        /// Exam year (e.g. 2020)
        #[arg(value_name = "YEAR")]
        year: u16,

        /// Stop after this many pending questions (0 = no limit)
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Generative model used for explanations
        #[arg(long, default_value = "gemini-2.0-flash", value_name = "MODEL")]
        model: String,
    },

    /// Run the QA gate for one year
    Qa {
        /// Exam year (e.g. 2020)
        #[arg(value_name = "YEAR")]
        year: u16,

        /// Emit the full report as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// Audit question crops and write JSON + CSV reports
    Audit {
        /// Exam year (e.g. 2020)
        #[arg(value_name = "YEAR")]
        year: u16,

        /// Flag crops whose white-pixel ratio is at least this
        #[arg(long, default_value_t = 0.72)]
        white_threshold: f64,

        /// Flag crops whose pixel area is at most this
        #[arg(long, default_value_t = 220_000)]
        min_area: u64,
    },

    /// Check a saved dataset for structural problems
    Validate {
        /// Exam year (e.g. 2020)
        #[arg(value_name = "YEAR")]
        year: u16,
    },
}
