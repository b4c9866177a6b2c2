//! Collaborator contracts of the hierarchical search.
//!
//! The engine never inspects a pose or a score function directly. It asks a
//! [`Director`] to write a sample into a [`Scene`], asks the [`Objective`] of
//! the current stage to score that scene, and consults a [`ScaffoldProvider`]
//! for the scaffolds the nest is searched against.

use super::config::SearchConfig;
use super::error::{EngineError, ScoringError};
use crate::core::models::index::{BigIndex, TreeIndex, TreeLimits};
use crate::core::rotamers::catalog::RotamerCatalog;
use std::sync::Arc;

/// Mutable pose state a worker scores samples in.
pub trait Scene: Clone + Send {
    /// Copy of this scene whose bodies at the given levels are deep-copied, so
    /// the copy can be mutated independently of `self`.
    fn clone_specific_deep(&self, levels: &[u64]) -> Self;
}

/// Maps a [`BigIndex`] at a resolution onto a concrete pose.
pub trait Director<S>: Send + Sync {
    /// Number of nest cells at resolution `resl`.
    fn size(&self, resl: usize) -> u64;

    fn set_scene(&self, index: &BigIndex, resl: usize, scene: &mut S) -> Result<(), EngineError>;
}

/// Scores a scene; lower is better.
pub trait Objective<S>: Send + Sync {
    fn score(&self, scene: &S) -> Result<f32, ScoringError>;
}

/// Per-scaffold lookup tables that must exist before any sample on the
/// scaffold is scored.
pub trait ScaffoldDataCache: Send + Sync {
    fn setup_onebody_tables(
        &self,
        catalog: &RotamerCatalog,
        config: &SearchConfig,
    ) -> Result<(), EngineError>;
}

pub trait ScaffoldProvider: Send + Sync {
    fn scaffold_index_limits(&self) -> TreeLimits;

    fn data_cache(&self, index: TreeIndex) -> Result<Arc<dyn ScaffoldDataCache>, EngineError>;

    /// Whether scaffolds are generated on demand from a root scaffold.
    fn is_morphing(&self) -> bool {
        false
    }

    /// Materializes the children of `index`. Only meaningful for morphing
    /// providers.
    fn expand_children(&self, _index: TreeIndex) -> Result<(), EngineError> {
        Ok(())
    }
}
