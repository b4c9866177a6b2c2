use crate::core::models::index::SearchPointWithRots;
use std::fmt;

/// Phases the search driver moves through, in order, for every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Seeding,
    Scoring(usize),
    Pruning(usize),
    Expanding(usize),
    Failed,
    Completed,
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchState::Failed | SearchState::Completed)
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchState::Seeding => write!(f, "seeding"),
            SearchState::Scoring(stage) => write!(f, "scoring stage {}", stage),
            SearchState::Pruning(stage) => write!(f, "pruning stage {}", stage),
            SearchState::Expanding(stage) => write!(f, "expanding stage {}", stage),
            SearchState::Failed => write!(f, "failed"),
            SearchState::Completed => write!(f, "completed"),
        }
    }
}

/// Running totals of a search, kept on the context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchCounters {
    /// Samples scored over all stages.
    pub total_search_effort: u64,
    /// Coarsest-stage samples that survived the global score cut.
    pub non0_space_size: u64,
}

/// Summary of one scored and pruned stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageOutcome {
    pub stage: usize,
    pub n_scored: usize,
    /// Samples kept by the beam, which sit at the front of the sample list.
    pub kept: usize,
    pub min_score: f32,
    pub max_score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Every stage ran; points are sorted best first.
    Completed(Vec<SearchPointWithRots>),
    /// No sample of `stage` scored under the global cut.
    Failed { stage: usize },
}

impl SearchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Completed(_))
    }

    pub fn points(&self) -> &[SearchPointWithRots] {
        match self {
            SearchOutcome::Completed(points) => points,
            SearchOutcome::Failed { .. } => &[],
        }
    }

    pub fn into_points(self) -> Vec<SearchPointWithRots> {
        match self {
            SearchOutcome::Completed(points) => points,
            SearchOutcome::Failed { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_failed_and_completed_are_terminal() {
        assert!(SearchState::Failed.is_terminal());
        assert!(SearchState::Completed.is_terminal());
        assert!(!SearchState::Seeding.is_terminal());
        assert!(!SearchState::Expanding(2).is_terminal());
    }

    #[test]
    fn failed_outcome_has_no_points() {
        let outcome = SearchOutcome::Failed { stage: 1 };
        assert!(!outcome.is_success());
        assert!(outcome.points().is_empty());
        assert!(outcome.into_points().is_empty());
    }

    #[test]
    fn states_display_their_stage() {
        assert_eq!(SearchState::Pruning(3).to_string(), "pruning stage 3");
    }
}
