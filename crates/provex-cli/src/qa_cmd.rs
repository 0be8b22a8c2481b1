use provex_pipeline::DataLayout;
use provex_pipeline::qa;

pub fn run(layout: &DataLayout, year: u16, json: bool) -> Result<(), i32> {
    let report = qa::run_qa(layout, year);

    if json {
        let rendered = serde_json::to_string_pretty(&report).map_err(|e| {
            eprintln!("error: cannot serialize report: {e}");
            1
        })?;
        println!("{rendered}");
    } else {
        print!("{}", qa::format_report(&report));
    }

    if report.passed { Ok(()) } else { Err(1) }
}
