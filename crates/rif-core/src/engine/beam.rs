use super::config::SearchConfig;
use super::state::SearchCounters;
use crate::core::models::index::SearchPoint;

/// Moves the `keep` best samples to the front of `samples`.
///
/// Returns the number kept and the score range among them (`+inf..-inf` when
/// nothing is kept). The kept set depends only on the samples, never on
/// their incoming order.
pub fn select_beam(samples: &mut [SearchPoint], keep: usize) -> (usize, f32, f32) {
    let kept = if samples.len() > keep {
        if keep > 0 {
            samples.select_nth_unstable(keep);
        }
        keep
    } else {
        samples.len()
    };

    let (min, max) = samples[..kept]
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.score), hi.max(p.score))
        });
    (kept, min, max)
}

/// Children of every kept sample scoring under the global cut.
///
/// Counts coarsest-stage survivors into `counters.non0_space_size`.
pub fn expand(
    kept: &[SearchPoint],
    stage: usize,
    config: &SearchConfig,
    counters: &mut SearchCounters,
) -> Vec<SearchPoint> {
    let dimpow2 = config.dimpow2;
    let mut children = Vec::with_capacity(kept.len() * dimpow2 as usize);
    for sample in kept {
        if !(sample.score < config.global_score_cut) {
            continue;
        }
        if stage == 0 {
            counters.non0_space_size += 1;
        }
        children.extend((0..dimpow2).map(|j| SearchPoint::new(sample.index.child(dimpow2, j))));
    }
    children
}
