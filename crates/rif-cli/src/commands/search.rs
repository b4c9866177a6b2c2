use super::catalog;
use crate::cli::SearchArgs;
use crate::config::{CatalogSource, PartialSearchFile, SearchRun};
use crate::error::Result;
use crate::utils::progress::{CliProgressHandler, StageSummary};
use rifdock::core::rotamers::catalog::RotamerCatalog;
use rifdock::core::utils::format::kmgt;
use rifdock::engine::progress::ProgressReporter;
use rifdock::workflows::dock::{self, DockResult};
use std::sync::Arc;
use tracing::{info, warn};

fn load_catalog(source: &CatalogSource) -> Result<RotamerCatalog> {
    match source {
        CatalogSource::Binary { path, templates } => {
            catalog::load_binary(path, templates.as_deref())
        }
        CatalogSource::Spec { path, templates } => {
            catalog::build_from_spec(path, templates.as_deref())
        }
    }
}

fn execute(run: &SearchRun, reporter: &ProgressReporter) -> Result<DockResult> {
    let catalog = Arc::new(load_catalog(&run.catalog)?);
    info!("{}", catalog);
    Ok(dock::run(&run.dock, catalog, reporter)?)
}

fn print_results(run: &SearchRun, result: &DockResult, stages: &[StageSummary]) {
    for summary in stages {
        println!("  {}", summary);
    }
    println!(
        "Search effort: {} samples, {} nonzero coarse cells",
        kmgt(result.counters.total_search_effort as f64),
        kmgt(result.counters.non0_space_size as f64)
    );
    if let Some(stage) = result.failed_stage {
        println!("Warning: no sample passed the global score cut at stage {}.", stage);
        return;
    }
    for (rank, point) in result.points.iter().take(run.top).enumerate() {
        let scaffold = usize::try_from(point.index.scaffold_index.position)
            .ok()
            .and_then(|i| run.dock.scaffolds.get(i))
            .map_or("?", String::as_str);
        println!(
            "{:>4}  {:>10.4}  {:<16} {}",
            rank + 1,
            point.score,
            scaffold,
            point.index
        );
    }
}

pub fn run(args: SearchArgs, threads: Option<usize>) -> Result<()> {
    let run = PartialSearchFile::from_file(&args.config)?.merge_with_cli(&args, threads)?;
    info!(
        stages = run.dock.search.n_stages(),
        beam = run.dock.search.beam_size,
        scaffolds = run.dock.scaffolds.len(),
        "Merged search configuration."
    );

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting hierarchical search...");
    let result = execute(&run, &reporter)?;
    info!("Search finished with {} result(s).", result.points.len());
    if result.points.is_empty() {
        warn!("Search completed but produced no results.");
    }
    print_results(&run, &result, &progress_handler.stage_summaries());
    Ok(())
}
