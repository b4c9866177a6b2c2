use crate::core::models::index::SearchPointWithRots;
use crate::engine::config::{MinFilterConfig, ScoreFilterConfig};
use crate::engine::error::EngineError;
use tracing::{info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

fn check_fraction(task: &'static str, fraction: f32) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(EngineError::Task {
            task,
            reason: format!("fraction {} is outside [0, 1]", fraction),
        });
    }
    Ok(())
}

fn sort_points(points: &mut [SearchPointWithRots]) {
    let by_score = |a: &SearchPointWithRots, b: &SearchPointWithRots| {
        a.as_search_point().cmp(&b.as_search_point())
    };

    #[cfg(feature = "parallel")]
    points.par_sort_by(by_score);

    #[cfg(not(feature = "parallel"))]
    points.sort_by(by_score);
}

fn fraction_of(len: usize, fraction: f32) -> usize {
    (len as f64 * f64::from(fraction)).ceil() as usize
}

/// Number of points a score filter keeps out of `points`, which must be
/// sorted best first.
pub fn score_filter_count(points: &[SearchPointWithRots], config: &ScoreFilterConfig) -> usize {
    let wanted = match config.then_min_below_thresh {
        Some(thresh) => points.iter().take_while(|p| p.score <= thresh).count(),
        None => fraction_of(points.len(), config.fraction),
    };
    wanted
        .max(config.at_least)
        .min(config.at_most)
        .min(points.len())
}

/// Keeps the best points ahead of a scoring pass.
#[instrument(skip_all, name = "filter_for_score_task")]
pub fn filter_for_score(
    mut points: Vec<SearchPointWithRots>,
    config: &ScoreFilterConfig,
) -> Result<Vec<SearchPointWithRots>, EngineError> {
    check_fraction("filter_for_score", config.fraction)?;
    if config.at_least > config.at_most {
        return Err(EngineError::Task {
            task: "filter_for_score",
            reason: format!(
                "at_least ({}) exceeds at_most ({})",
                config.at_least, config.at_most
            ),
        });
    }

    sort_points(&mut points);
    let before = points.len();
    points.truncate(score_filter_count(&points, config));
    info!(before, after = points.len(), "Filtered points for scoring.");
    Ok(points)
}

/// Keeps the best `fraction` of points ahead of a minimization pass.
#[instrument(skip_all, name = "filter_for_min_task")]
pub fn filter_for_min(
    mut points: Vec<SearchPointWithRots>,
    config: &MinFilterConfig,
) -> Result<Vec<SearchPointWithRots>, EngineError> {
    check_fraction("filter_for_min", config.fraction)?;
    sort_points(&mut points);
    let before = points.len();
    points.truncate(fraction_of(before, config.fraction).min(before));
    info!(before, after = points.len(), "Filtered points for minimization.");
    Ok(points)
}
