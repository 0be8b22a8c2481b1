use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while running a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document error: {0}")]
    Document(String),

    #[error("missing input: {0}")]
    MissingInput(PathBuf),

    #[error("answer key incomplete, missing questions: {missing:?}")]
    IncompleteAnswerKey { missing: Vec<u8> },

    #[error("dataset invalid: {0}")]
    Invalid(String),

    #[error("enrichment lock held by pid {pid}")]
    LockHeld { pid: u32 },

    #[error("model api error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
