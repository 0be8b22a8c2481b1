use provex_pipeline::DataLayout;
use provex_pipeline::client::GeminiClient;
use provex_pipeline::enrich::{self, EnrichOptions};

use crate::shared;

pub fn run(layout: &DataLayout, year: u16, limit: usize, model: &str) -> Result<(), i32> {
    let client = GeminiClient::from_env(model).map_err(shared::fail)?;
    let summary = enrich::enrich_year(&client, layout, year, &EnrichOptions { limit })
        .map_err(shared::fail)?;
    println!(
        "{year}: enriched {}/{} attempted questions",
        summary.enriched, summary.attempted
    );
    Ok(())
}
