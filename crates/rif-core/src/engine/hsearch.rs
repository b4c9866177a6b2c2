use super::beam::expand;
use super::context::SearchContext;
use super::error::EngineError;
use super::interfaces::Scene;
use super::progress::Progress;
use super::scene_pool::ScenePool;
use super::stage::run_stage;
use super::state::{SearchOutcome, SearchState};
use crate::core::models::index::{BigIndex, SearchPoint, SearchPointWithRots, TreeIndex};
use crate::core::utils::format::kmgt;
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Prepares every scaffold's one-body tables and seeds the coarsest samples.
fn seed<S>(ctx: &SearchContext<'_, S>) -> Result<Vec<SearchPoint>, EngineError> {
    let provider = ctx.scaffold_provider;
    if provider.is_morphing() {
        provider.expand_children(TreeIndex::new(0, 0))?;
    }

    let limits = provider.scaffold_index_limits();
    let num_scaffolds = limits.count_at_level;
    for position in 0..num_scaffolds {
        provider
            .data_cache(TreeIndex::new(1, position))?
            .setup_onebody_tables(ctx.catalog, ctx.config)?;
    }

    let coarse = ctx.director.size(0);
    let n_samples = usize::try_from(num_scaffolds.saturating_mul(coarse)).map_err(|_| {
        EngineError::Internal(format!(
            "{} scaffolds x {} coarse cells do not fit in memory",
            num_scaffolds, coarse
        ))
    })?;
    info!(
        scaffolds = num_scaffolds,
        coarse_cells = coarse,
        samples = n_samples,
        "Seeding hierarchical search."
    );

    let mut samples = Vec::with_capacity(n_samples);
    for position in 0..num_scaffolds {
        let scaffold = TreeIndex::new(1, position);
        samples.extend((0..coarse).map(|nest| SearchPoint::new(BigIndex::new(nest, scaffold))));
    }
    Ok(samples)
}

fn sort_all(samples: &mut [SearchPoint]) {
    #[cfg(feature = "parallel")]
    samples.par_sort_unstable();

    #[cfg(not(feature = "parallel"))]
    samples.sort_unstable();
}

/// Runs the multi-resolution beam search described by `ctx`.
///
/// Every stage scores its samples with the matching objective, keeps the
/// beam and expands the survivors under the global cut. The last stage is
/// sorted in full instead of expanded. Running out of survivors yields
/// [`SearchOutcome::Failed`].
#[instrument(skip_all, name = "hierarchical_search")]
pub fn hierarchical_search<S: Scene>(
    ctx: &mut SearchContext<'_, S>,
    scene_template: &S,
) -> Result<SearchOutcome, EngineError> {
    let n_stages = ctx.n_stages();
    ctx.reporter.report(Progress::PhaseStart {
        name: "Hierarchical search",
    });
    let mut state = SearchState::Seeding;
    let mut samples = Vec::new();
    let mut pool = None;
    let mut outcome = None;

    while !state.is_terminal() {
        debug!(%state, "Search state.");
        state = match state {
            SearchState::Seeding => {
                samples = seed(ctx)?;
                pool = Some(ScenePool::new(scene_template, ctx.config.num_threads)?);
                if samples.is_empty() {
                    warn!("No samples to search.");
                    outcome = Some(SearchOutcome::Failed { stage: 0 });
                    SearchState::Failed
                } else {
                    SearchState::Scoring(0)
                }
            }
            SearchState::Scoring(stage) => {
                let pool = pool
                    .as_ref()
                    .ok_or_else(|| EngineError::Internal("scene pool missing".to_string()))?;
                ctx.reporter.report(Progress::StageStart {
                    stage,
                    resolution: ctx.config.resolutions[stage],
                    samples: samples.len() as u64,
                });
                let stage_outcome = run_stage(stage, &mut samples, ctx, pool)?;
                debug!(
                    stage,
                    kept = stage_outcome.kept,
                    min = stage_outcome.min_score,
                    max = stage_outcome.max_score,
                    "Beam selected."
                );
                SearchState::Pruning(stage)
            }
            SearchState::Pruning(stage) if stage + 1 == n_stages => {
                sort_all(&mut samples);
                let points = samples
                    .drain(..)
                    .map(SearchPointWithRots::from)
                    .collect();
                outcome = Some(SearchOutcome::Completed(points));
                SearchState::Completed
            }
            SearchState::Pruning(stage) => {
                samples.truncate(ctx.config.beam_width());
                SearchState::Expanding(stage)
            }
            SearchState::Expanding(stage) => {
                samples = expand(&samples, stage, ctx.config, &mut ctx.counters);
                if samples.is_empty() {
                    warn!(stage, "No sample scored under the global cut; search failed.");
                    outcome = Some(SearchOutcome::Failed { stage });
                    SearchState::Failed
                } else {
                    SearchState::Scoring(stage + 1)
                }
            }
            SearchState::Failed | SearchState::Completed => state,
        };
    }
    debug!(%state, "Search state.");
    ctx.reporter.report(Progress::PhaseFinish);

    info!(
        total_search_effort = %kmgt(ctx.counters.total_search_effort as f64),
        non0_space_size = %kmgt(ctx.counters.non0_space_size as f64),
        "Hierarchical search finished."
    );

    outcome.ok_or_else(|| EngineError::Internal("search ended without an outcome".to_string()))
}
