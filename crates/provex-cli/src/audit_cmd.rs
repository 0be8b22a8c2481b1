use provex_pipeline::DataLayout;
use provex_pipeline::audit::{self, AuditOptions};

use crate::shared;

pub fn run(layout: &DataLayout, year: u16, white_threshold: f64, min_area: u64) -> Result<(), i32> {
    let options = AuditOptions {
        white_threshold,
        min_area,
    };
    let report = audit::audit_year(layout, year, &options).map_err(shared::fail)?;
    println!(
        "{year}: {} crops audited, {} flagged",
        report.total, report.flagged
    );
    println!("report: {}", layout.audit_report(year, "json").display());
    Ok(())
}
