use provex_pipeline::DataLayout;
use provex_pipeline::ingest::{self, IngestOptions};

use crate::shared;

pub fn run(layout: &DataLayout, year: u16, dpi: u32) -> Result<(), i32> {
    let exam = shared::open_document(&layout.exam_pdf(year))?;
    let options = IngestOptions {
        dpi,
        carry_over: true,
    };
    let summary = ingest::recrop_year(&exam, layout, year, &options).map_err(shared::fail)?;
    println!("{year}: recropped {} questions", summary.questions);
    Ok(())
}
