use provex_pipeline::DataLayout;
use provex_pipeline::document::ExamDocument;

use crate::shared;

pub fn run(layout: &DataLayout, year: u16, dpi: u32) -> Result<(), i32> {
    let exam = shared::open_document(&layout.exam_pdf(year))?;
    let count = exam.page_count().map_err(shared::fail)?;

    let pages_dir = layout.pages_dir(year);
    std::fs::create_dir_all(&pages_dir).map_err(|e| {
        eprintln!("error: cannot create {}: {e}", pages_dir.display());
        1
    })?;

    for page in 1..=count {
        let image = exam.render_page(page, dpi).map_err(shared::fail)?;
        let path = layout.page_image(year, page);
        image.save(&path).map_err(|e| {
            eprintln!("error: cannot write {}: {e}", path.display());
            1
        })?;
    }

    println!("{year}: rendered {count} pages at {dpi} dpi to {}", pages_dir.display());
    Ok(())
}
