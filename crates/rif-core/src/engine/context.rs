use super::config::{ConfigError, SearchConfig, validate};
use super::error::EngineError;
use super::interfaces::{Director, Objective, ScaffoldProvider};
use super::progress::ProgressReporter;
use super::state::SearchCounters;
use crate::core::rotamers::catalog::RotamerCatalog;

/// Everything one hierarchical search run reads, plus the counters it keeps.
pub struct SearchContext<'a, S> {
    pub director: &'a dyn Director<S>,
    /// One objective per stage, coarsest first.
    pub objectives: Vec<&'a dyn Objective<S>>,
    pub scaffold_provider: &'a dyn ScaffoldProvider,
    pub catalog: &'a RotamerCatalog,
    pub config: &'a SearchConfig,
    pub reporter: &'a ProgressReporter<'a>,
    pub counters: SearchCounters,
}

impl<'a, S> SearchContext<'a, S> {
    /// Fails when `config` does not validate or the objectives do not match
    /// its stages one to one.
    pub fn new(
        director: &'a dyn Director<S>,
        objectives: Vec<&'a dyn Objective<S>>,
        scaffold_provider: &'a dyn ScaffoldProvider,
        catalog: &'a RotamerCatalog,
        config: &'a SearchConfig,
        reporter: &'a ProgressReporter<'a>,
    ) -> Result<Self, EngineError> {
        validate(config)?;
        if objectives.len() != config.n_stages() {
            return Err(ConfigError::InvalidParameter {
                parameter: "objectives",
                reason: format!(
                    "{} objectives given for {} resolutions",
                    objectives.len(),
                    config.n_stages()
                ),
            }
            .into());
        }
        Ok(Self {
            director,
            objectives,
            scaffold_provider,
            catalog,
            config,
            reporter,
            counters: SearchCounters::default(),
        })
    }

    pub fn n_stages(&self) -> usize {
        self.config.n_stages()
    }

    pub fn objective(&self, stage: usize) -> Result<&'a dyn Objective<S>, EngineError> {
        self.objectives
            .get(stage)
            .copied()
            .ok_or_else(|| EngineError::Internal(format!("no objective for stage {}", stage)))
    }
}
