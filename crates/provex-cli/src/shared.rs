use std::path::Path;

use provex_pipeline::PipelineError;
use provex_pipeline::document::PdfiumDocument;

/// Exit code when another process holds the year's enrichment lock.
pub const EXIT_LOCKED: i32 = 3;

fn exit_code(error: &PipelineError) -> i32 {
    match error {
        PipelineError::LockHeld { .. } => EXIT_LOCKED,
        _ => 1,
    }
}

/// Report a pipeline error on stderr and map it to the process exit code.
pub fn fail(error: PipelineError) -> i32 {
    eprintln!("error: {error}");
    exit_code(&error)
}

pub fn open_document(path: &Path) -> Result<PdfiumDocument, i32> {
    PdfiumDocument::open(path).map_err(fail)
}
