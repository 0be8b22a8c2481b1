mod audit_cmd;
mod cli;
mod enrich_cmd;
mod ingest_cmd;
mod qa_cmd;
mod recrop_cmd;
mod render_cmd;
mod shared;
mod validate_cmd;

use clap::Parser;
use provex_pipeline::DataLayout;

use cli::Cli;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let layout = DataLayout::new(&cli.data_root);

    let result = match cli.command {
        cli::Commands::Render { year, dpi } => render_cmd::run(&layout, year, dpi),
        cli::Commands::Ingest {
            year,
            dpi,
            skip_enrichment_carryover,
            ref model,
            no_vision,
            no_ocr,
        } => ingest_cmd::run(
            &layout,
            year,
            dpi,
            skip_enrichment_carryover,
            model,
            no_vision,
            no_ocr,
        ),
        cli::Commands::Recrop { year, dpi } => recrop_cmd::run(&layout, year, dpi),
        cli::Commands::Enrich {
            year,
            limit,
            ref model,
        } => enrich_cmd::run(&layout, year, limit, model),
        cli::Commands::Qa { year, json } => qa_cmd::run(&layout, year, json),
        cli::Commands::Audit {
            year,
            white_threshold,
            min_area,
        } => audit_cmd::run(&layout, year, white_threshold, min_area),
        cli::Commands::Validate { year } => validate_cmd::run(&layout, year),
    };

    if let Err(code) = result {
        std::process::exit(code);
    }
}
