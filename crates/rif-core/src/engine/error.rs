use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::index::BigIndex;
use crate::core::rotamers::error::CatalogError;

/// Failure raised by an objective while scoring one scene.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScoringError {
    #[error("Scene is not scoreable: {0}")]
    InvalidScene(String),

    #[error("Score is not a number")]
    NotANumber,

    #[error("Objective failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid search configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Scoring failed for sample {index} at stage {stage}: {source}")]
    Scoring {
        index: BigIndex,
        stage: usize,
        source: ScoringError,
    },

    #[error("Director failed to materialize sample {index} at resolution {resl}: {message}")]
    Director {
        index: BigIndex,
        resl: usize,
        message: String,
    },

    #[error("Scaffold provider error: {0}")]
    Scaffold(String),

    #[error("Rotamer catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Failed to build worker thread pool: {0}")]
    ThreadPool(String),

    #[error("Task '{task}' failed: {reason}")]
    Task { task: &'static str, reason: String },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
