use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

/// Fan-out of the 6-DOF rigid-body nest: one bit per degree of freedom.
pub const DEFAULT_DIMPOW2: u64 = 64;

/// Minimum number of samples a worker takes at once when splitting a stage.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Resolution (Angstroms) of each search stage, coarsest first. Stage `i`
    /// is scored with objective `i`.
    pub resolutions: Vec<f64>,
    /// Number of samples carried into each stage; `beam_size / dimpow2`
    /// survivors are expanded per stage.
    ///
    /// Must be at least `dimpow2`. A smaller beam would keep no survivor, so
    /// [`validate`] rejects it up front rather than letting the search end as
    /// failed after the first stage.
    pub beam_size: usize,
    /// Children per expanded sample. A power of two.
    pub dimpow2: u64,
    /// Samples scoring at or above this are never expanded.
    pub global_score_cut: f32,
    /// Worker threads; `None` uses every logical core.
    pub num_threads: Option<usize>,
    pub chunk_size: usize,
}

impl SearchConfig {
    pub fn n_stages(&self) -> usize {
        self.resolutions.len()
    }

    /// Survivors kept per stage.
    pub fn beam_width(&self) -> usize {
        self.beam_size / self.dimpow2 as usize
    }
}

#[derive(Default)]
pub struct SearchConfigBuilder {
    resolutions: Option<Vec<f64>>,
    beam_size: Option<usize>,
    dimpow2: Option<u64>,
    global_score_cut: Option<f32>,
    num_threads: Option<usize>,
    chunk_size: Option<usize>,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolutions(mut self, resolutions: Vec<f64>) -> Self {
        self.resolutions = Some(resolutions);
        self
    }
    pub fn beam_size(mut self, beam_size: usize) -> Self {
        self.beam_size = Some(beam_size);
        self
    }
    pub fn dimpow2(mut self, dimpow2: u64) -> Self {
        self.dimpow2 = Some(dimpow2);
        self
    }
    pub fn global_score_cut(mut self, cut: f32) -> Self {
        self.global_score_cut = Some(cut);
        self
    }
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn build(self) -> Result<SearchConfig, ConfigError> {
        let config = SearchConfig {
            resolutions: self
                .resolutions
                .ok_or(ConfigError::MissingParameter("resolutions"))?,
            beam_size: self
                .beam_size
                .ok_or(ConfigError::MissingParameter("beam_size"))?,
            dimpow2: self.dimpow2.unwrap_or(DEFAULT_DIMPOW2),
            global_score_cut: self.global_score_cut.unwrap_or(f32::INFINITY),
            num_threads: self.num_threads,
            chunk_size: self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
        };
        validate(&config)?;
        Ok(config)
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter,
        reason: reason.into(),
    }
}

pub fn validate(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.resolutions.is_empty() {
        return Err(invalid("resolutions", "at least one stage is required"));
    }
    if config.resolutions.iter().any(|r| !r.is_finite() || *r <= 0.0) {
        return Err(invalid("resolutions", "every resolution must be positive"));
    }
    if config.dimpow2 == 0 || !config.dimpow2.is_power_of_two() {
        return Err(invalid(
            "dimpow2",
            format!("{} is not a power of two", config.dimpow2),
        ));
    }
    if (config.beam_size as u64) < config.dimpow2 {
        return Err(invalid(
            "beam_size",
            format!(
                "{} is smaller than the fan-out {}; no sample would survive a stage",
                config.beam_size, config.dimpow2
            ),
        ));
    }
    if config.global_score_cut.is_nan() {
        return Err(invalid("global_score_cut", "must not be NaN"));
    }
    if config.num_threads == Some(0) {
        return Err(invalid("num_threads", "must be at least 1"));
    }
    if config.chunk_size == 0 {
        return Err(invalid("chunk_size", "must be at least 1"));
    }
    Ok(())
}

/// Keeps the best `fraction` of points, optionally cut at a score threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreFilterConfig {
    pub fraction: f32,
    /// When set, keep the points scoring at or below this instead of a fraction.
    pub then_min_below_thresh: Option<f32>,
    pub at_least: usize,
    pub at_most: usize,
}

impl Default for ScoreFilterConfig {
    fn default() -> Self {
        Self {
            fraction: 1.0,
            then_min_below_thresh: None,
            at_least: 0,
            at_most: usize::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinFilterConfig {
    pub fraction: f32,
}

/// Whether a refinement pass only rescores or also minimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefineMode {
    Score,
    Minimize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefineConfig {
    pub mode: RefineMode,
    /// Points refined to a score at or above this are dropped.
    pub score_cut: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
            .resolutions(vec![4.0, 2.0, 1.0])
            .beam_size(1024)
    }

    #[test]
    fn build_applies_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.dimpow2, DEFAULT_DIMPOW2);
        assert_eq!(config.global_score_cut, f32::INFINITY);
        assert_eq!(config.n_stages(), 3);
        assert_eq!(config.beam_width(), 16);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.num_threads, None);
    }

    #[test]
    fn missing_parameters_are_reported() {
        let err = SearchConfigBuilder::new().beam_size(64).build().unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("resolutions"));
        let err = SearchConfigBuilder::new()
            .resolutions(vec![1.0])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("beam_size"));
    }

    #[test]
    fn rejects_fan_out_that_is_not_a_power_of_two() {
        let err = builder().dimpow2(48).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { parameter: "dimpow2", .. }));
    }

    #[test]
    fn rejects_beam_smaller_than_fan_out() {
        let err = builder().beam_size(8).dimpow2(16).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { parameter: "beam_size", .. }));

        let config = builder().beam_size(16).dimpow2(16).build().unwrap();
        assert_eq!(config.beam_width(), 1);
        let mut narrowed = config.clone();
        narrowed.beam_size = 15;
        assert!(matches!(
            validate(&narrowed),
            Err(ConfigError::InvalidParameter { parameter: "beam_size", .. })
        ));
    }

    #[test]
    fn validate_catches_fields_edited_after_building() {
        let mut config = builder().build().unwrap();
        config.dimpow2 = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidParameter { parameter: "dimpow2", .. })
        ));
        config.dimpow2 = DEFAULT_DIMPOW2;
        config.chunk_size = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidParameter { parameter: "chunk_size", .. })
        ));
    }

    #[test]
    fn rejects_empty_stages_and_zero_threads() {
        let err = builder().resolutions(vec![]).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { parameter: "resolutions", .. }));
        let err = builder().num_threads(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { parameter: "num_threads", .. }));
    }

    #[test]
    fn rejects_nan_score_cut() {
        let err = builder().global_score_cut(f32::NAN).build().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter { parameter: "global_score_cut", .. }
        ));
    }
}
