use provex_pipeline::DataLayout;
use provex_pipeline::dataset;

use crate::shared;

pub fn run(layout: &DataLayout, year: u16) -> Result<(), i32> {
    let dataset = dataset::load(&layout.dataset_path(year)).map_err(shared::fail)?;
    let problems = dataset::validate(&dataset);

    if problems.is_empty() {
        println!(
            "{year}: {} questions, no structural problems",
            dataset.questions.len()
        );
        return Ok(());
    }
    for problem in &problems {
        eprintln!("{year}: {problem}");
    }
    eprintln!("{} problems found", problems.len());
    Err(1)
}
