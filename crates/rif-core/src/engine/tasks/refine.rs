use crate::core::models::index::SearchPointWithRots;
use crate::engine::config::{RefineConfig, RefineMode};
use crate::engine::error::{EngineError, ScoringError};
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// External rescoring or minimization of a single search result.
pub trait Refiner: Send + Sync {
    /// Returns the refined score of `point`.
    fn refine(&self, point: &SearchPointWithRots, mode: RefineMode) -> Result<f32, ScoringError>;
}

/// Refines every point, drops those at or above the score cut and returns the
/// rest sorted best first.
#[instrument(skip_all, name = "refine_task")]
pub fn run(
    points: Vec<SearchPointWithRots>,
    refiner: &dyn Refiner,
    config: &RefineConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<SearchPointWithRots>, EngineError> {
    info!(points = points.len(), mode = ?config.mode, "Refining search results.");
    reporter.report(Progress::TaskStart {
        total_steps: points.len() as u64,
    });

    let refine_one = |mut point: SearchPointWithRots| {
        let result = refiner.refine(&point, config.mode);
        reporter.report(Progress::TaskIncrement);
        match result {
            Ok(score) if score.is_nan() => Err(EngineError::Task {
                task: "refine",
                reason: format!("refined score of {} is NaN", point.index),
            }),
            Ok(score) => {
                point.score = score;
                Ok(point)
            }
            Err(e) => Err(EngineError::Task {
                task: "refine",
                reason: format!("{}: {}", point.index, e),
            }),
        }
    };

    #[cfg(feature = "parallel")]
    let refined: Result<Vec<_>, _> = points.into_par_iter().map(refine_one).collect();

    #[cfg(not(feature = "parallel"))]
    let refined: Result<Vec<_>, _> = points.into_iter().map(refine_one).collect();

    reporter.report(Progress::TaskFinish);
    let refined = refined?;

    let before = refined.len();
    let mut kept: Vec<_> = refined
        .into_iter()
        .filter(|p| p.score < config.score_cut)
        .collect();
    if kept.is_empty() && before > 0 {
        warn!(score_cut = config.score_cut, "No point survived refinement.");
    }
    kept.sort_by(|a, b| a.as_search_point().cmp(&b.as_search_point()));
    info!(before, after = kept.len(), "Refinement complete.");
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::index::{BigIndex, TreeIndex};

    struct Offset(f32);

    impl Refiner for Offset {
        fn refine(&self, point: &SearchPointWithRots, mode: RefineMode) -> Result<f32, ScoringError> {
            match mode {
                RefineMode::Score => Ok(point.score + self.0),
                RefineMode::Minimize => Ok(point.score + 2.0 * self.0),
            }
        }
    }

    struct Broken;

    impl Refiner for Broken {
        fn refine(&self, _: &SearchPointWithRots, _: RefineMode) -> Result<f32, ScoringError> {
            Err(ScoringError::Failed("minimizer diverged".to_string()))
        }
    }

    fn points(scores: &[f32]) -> Vec<SearchPointWithRots> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| SearchPointWithRots {
                index: BigIndex::new(i as u64, TreeIndex::new(1, 0)),
                score,
                rotamers: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn rescoring_drops_points_above_the_cut_and_sorts() {
        let config = RefineConfig {
            mode: RefineMode::Score,
            score_cut: 0.0,
        };
        let out = run(points(&[-1.0, -5.0, 1.0, -0.5]), &Offset(0.75), &config, &ProgressReporter::new()).unwrap();
        let scores: Vec<f32> = out.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![-4.25, -0.25]);
    }

    #[test]
    fn minimization_uses_the_minimize_mode() {
        let config = RefineConfig {
            mode: RefineMode::Minimize,
            score_cut: f32::INFINITY,
        };
        let out = run(points(&[1.0]), &Offset(-1.0), &config, &ProgressReporter::new()).unwrap();
        assert_eq!(out[0].score, -1.0);
    }

    #[test]
    fn refiner_failures_become_task_errors() {
        let config = RefineConfig {
            mode: RefineMode::Minimize,
            score_cut: 0.0,
        };
        let result = run(points(&[1.0, 2.0]), &Broken, &config, &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::Task { task: "refine", .. })));
    }
}
