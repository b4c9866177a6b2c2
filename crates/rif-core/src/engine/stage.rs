use super::beam::select_beam;
use super::context::SearchContext;
use super::error::{EngineError, ScoringError};
use super::interfaces::Scene;
use super::progress::Progress;
use super::scene_pool::ScenePool;
use super::state::StageOutcome;
use crate::core::models::index::{BigIndex, SearchPoint};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Scores one sample in the calling worker's scene.
fn score_sample<S: Scene>(
    ctx: &SearchContext<'_, S>,
    stage: usize,
    index: BigIndex,
    scene: &mut S,
) -> Result<f32, EngineError> {
    ctx.director.set_scene(&index, stage, scene)?;
    let score = ctx
        .objective(stage)?
        .score(scene)
        .and_then(|score| {
            if score.is_nan() {
                Err(ScoringError::NotANumber)
            } else {
                Ok(score)
            }
        })
        .map_err(|source| EngineError::Scoring {
            index,
            stage,
            source,
        })?;
    trace!(%index, stage, score, "Scored sample.");
    Ok(score)
}

/// Scores every sample of `stage` in place, then moves the beam to the front.
///
/// The first scoring failure stops the remaining samples and is returned once
/// every worker has joined.
#[instrument(skip_all, name = "search_stage", fields(stage = stage))]
pub fn run_stage<S: Scene>(
    stage: usize,
    samples: &mut [SearchPoint],
    ctx: &mut SearchContext<'_, S>,
    pool: &ScenePool<S>,
) -> Result<StageOutcome, EngineError> {
    let n_scored = samples.len();
    ctx.counters.total_search_effort += n_scored as u64;
    ctx.reporter.report(Progress::TaskStart {
        total_steps: n_scored as u64,
    });

    let failure: Mutex<Option<EngineError>> = Mutex::new(None);
    let abort = AtomicBool::new(false);
    {
        let ctx: &SearchContext<'_, S> = ctx;
        let score_one = |point: &mut SearchPoint| {
            if abort.load(Ordering::Relaxed) {
                return;
            }
            match pool
                .with_scene(|scene| score_sample(ctx, stage, point.index, scene))
                .and_then(|result| result)
            {
                Ok(score) => point.score = score,
                Err(e) => {
                    abort.store(true, Ordering::Relaxed);
                    if let Ok(mut slot) = failure.lock() {
                        slot.get_or_insert(e);
                    }
                }
            }
            ctx.reporter.report(Progress::TaskIncrement);
        };

        #[cfg(feature = "parallel")]
        pool.install(|| {
            samples
                .par_iter_mut()
                .with_min_len(ctx.config.chunk_size)
                .for_each(score_one)
        });

        #[cfg(not(feature = "parallel"))]
        pool.install(|| samples.iter_mut().for_each(score_one));
    }
    ctx.reporter.report(Progress::TaskFinish);

    let failure = failure
        .into_inner()
        .map_err(|_| EngineError::Internal("scoring failure slot was poisoned".to_string()))?;
    if let Some(e) = failure {
        return Err(e);
    }

    let (kept, min_score, max_score) = select_beam(samples, ctx.config.beam_width());
    info!(
        stage,
        resolution = ctx.config.resolutions[stage],
        scored = n_scored,
        kept,
        min_score,
        max_score,
        "Stage scored."
    );
    ctx.reporter.report(Progress::StageFinish {
        stage,
        kept,
        min_score,
        max_score,
    });

    Ok(StageOutcome {
        stage,
        n_scored,
        kept,
        min_score,
        max_score,
    })
}
