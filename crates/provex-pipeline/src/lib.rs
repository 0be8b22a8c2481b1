//! provex-pipeline: the batch stages around the core engine.
//!
//! [`ingest`] turns a year's exam PDF into the per-question dataset,
//! [`enrich`] fills in explanations via a generative model, [`qa`] and
//! [`audit`] check the result, and the remaining modules are the shared
//! plumbing: document backend, on-disk layout, dataset persistence, asset
//! cropping, model client, content cache, advisory lock, and OCR fallback.

pub mod assets;
pub mod audit;
pub mod cache;
pub mod client;
pub mod dataset;
pub mod document;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod layout;
pub mod lock;
pub mod ocr;
pub mod qa;

pub use error::{PipelineError, Result};
pub use layout::DataLayout;
