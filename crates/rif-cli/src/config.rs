use crate::cli::SearchArgs;
use crate::error::{CliError, Result};
use rifdock::core::kinematics::nest::NestBounds;
use rifdock::engine::config::{
    self as core_config, RefineConfig, RefineMode, ScoreFilterConfig, SearchConfigBuilder,
};
use rifdock::workflows::dock::DockConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod defaults {
    pub const TOP_RESULTS: usize = 10;
    pub const REFINE_SCORE_CUT: f32 = f32::INFINITY;
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSearchConfig {
    resolutions: Option<Vec<f64>>,
    beam_size: Option<usize>,
    global_score_cut: Option<f32>,
    chunk_size: Option<usize>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialProbeConfig {
    mobile: Vec<[f64; 3]>,
    target: Vec<[f64; 3]>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialScoreFilterConfig {
    fraction: Option<f32>,
    then_min_below_thresh: Option<f32>,
    at_least: Option<usize>,
    at_most: Option<usize>,
}

impl From<PartialScoreFilterConfig> for ScoreFilterConfig {
    fn from(p: PartialScoreFilterConfig) -> Self {
        let defaults = ScoreFilterConfig::default();
        Self {
            fraction: p.fraction.unwrap_or(defaults.fraction),
            then_min_below_thresh: p.then_min_below_thresh,
            at_least: p.at_least.unwrap_or(defaults.at_least),
            at_most: p.at_most.unwrap_or(defaults.at_most),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
enum PartialRefineMode {
    Score,
    Minimize,
}

impl From<PartialRefineMode> for RefineMode {
    fn from(p: PartialRefineMode) -> Self {
        match p {
            PartialRefineMode::Score => RefineMode::Score,
            PartialRefineMode::Minimize => RefineMode::Minimize,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialRefineConfig {
    mode: Option<PartialRefineMode>,
    score_cut: Option<f32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputConfig {
    top: Option<usize>,
}

/// Where the search takes its rotamer catalog from. Exactly one is required.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialCatalogConfig {
    /// Binary catalog written by `catalog build`.
    path: Option<PathBuf>,
    /// Rotamer spec list to build the catalog from.
    spec: Option<PathBuf>,
    templates: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialSearchFile {
    scaffolds: Option<Vec<String>>,
    search: Option<PartialSearchConfig>,
    nest: Option<NestBounds>,
    probes: Option<PartialProbeConfig>,
    catalog: Option<PartialCatalogConfig>,
    filter: Option<PartialScoreFilterConfig>,
    refine: Option<PartialRefineConfig>,
    output: Option<PartialOutputConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    Binary {
        path: PathBuf,
        templates: Option<PathBuf>,
    },
    Spec {
        path: PathBuf,
        templates: Option<PathBuf>,
    },
}

/// Everything the `search` command needs after merging file and flags.
#[derive(Debug, Clone)]
pub struct SearchRun {
    pub dock: DockConfig,
    pub catalog: CatalogSource,
    pub top: usize,
}

fn required<T>(value: Option<T>, key: &str) -> Result<T> {
    value.ok_or_else(|| {
        CliError::Config(format!(
            "A value for '{}' is required either in the config file or via CLI argument.",
            key
        ))
    })
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

/// Relative paths in the file are taken relative to the file itself.
fn resolve_path(base: Option<&Path>, path: PathBuf) -> PathBuf {
    match base {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}

impl PartialSearchFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading search configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut file: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        file.rebase_paths(path.parent());
        Ok(file)
    }

    fn rebase_paths(&mut self, base: Option<&Path>) {
        if let Some(catalog) = &mut self.catalog {
            catalog.path = catalog.path.take().map(|p| resolve_path(base, p));
            catalog.spec = catalog.spec.take().map(|p| resolve_path(base, p));
            catalog.templates = catalog.templates.take().map(|p| resolve_path(base, p));
        }
    }

    pub fn merge_with_cli(mut self, args: &SearchArgs, threads: Option<usize>) -> Result<SearchRun> {
        self.apply_set_values(&args.set_values)?;

        let search = self.search.take().unwrap_or_default();
        let resolutions = required(search.resolutions, "search.resolutions")?;
        let beam_size = required(args.beam_size.or(search.beam_size), "search.beam-size")?;
        let mut builder = SearchConfigBuilder::new()
            .resolutions(resolutions)
            .beam_size(beam_size)
            .dimpow2(rifdock::core::kinematics::nest::NEST_DIMPOW2);
        if let Some(cut) = args.score_cut.or(search.global_score_cut) {
            builder = builder.global_score_cut(cut);
        }
        if let Some(chunk) = search.chunk_size {
            builder = builder.chunk_size(chunk);
        }
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let search_config = builder
            .build()
            .map_err(|e: core_config::ConfigError| CliError::Config(e.to_string()))?;

        let nest = required(self.nest.take(), "nest")?;
        let probes = required(self.probes.take(), "probes")?;
        let scaffolds = self
            .scaffolds
            .take()
            .unwrap_or_else(|| vec!["default".to_string()]);

        let refine = if args.no_refine {
            None
        } else {
            self.refine.take().map(|p| RefineConfig {
                mode: p.mode.unwrap_or(PartialRefineMode::Score).into(),
                score_cut: p.score_cut.unwrap_or(defaults::REFINE_SCORE_CUT),
            })
        };

        let catalog = Self::merge_catalog(self.catalog.take())?;
        let top = args
            .top
            .or(self.output.and_then(|o| o.top))
            .unwrap_or(defaults::TOP_RESULTS);

        Ok(SearchRun {
            dock: DockConfig {
                search: search_config,
                nest,
                probes: probes.mobile.into_iter().map(Into::into).collect(),
                targets: probes.target.into_iter().map(Into::into).collect(),
                scaffolds,
                score_filter: self.filter.map(Into::into),
                refine,
            },
            catalog,
            top,
        })
    }

    fn merge_catalog(partial: Option<PartialCatalogConfig>) -> Result<CatalogSource> {
        let partial = required(partial, "catalog")?;
        match (partial.path, partial.spec) {
            (Some(path), None) => Ok(CatalogSource::Binary {
                path,
                templates: partial.templates,
            }),
            (None, Some(path)) => Ok(CatalogSource::Spec {
                path,
                templates: partial.templates,
            }),
            (Some(_), Some(_)) => Err(CliError::Config(
                "`catalog` takes either `path` or `spec`, not both.".to_string(),
            )),
            (None, None) => Err(CliError::Config(
                "`catalog` requires either `path` or `spec`.".to_string(),
            )),
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            match key {
                "search.beam-size" => {
                    self.search.get_or_insert_with(Default::default).beam_size =
                        Some(parse_value(key, value)?);
                }
                "search.global-score-cut" => {
                    self.search
                        .get_or_insert_with(Default::default)
                        .global_score_cut = Some(parse_value(key, value)?);
                }
                "search.chunk-size" => {
                    self.search.get_or_insert_with(Default::default).chunk_size =
                        Some(parse_value(key, value)?);
                }
                "filter.fraction" => {
                    self.filter.get_or_insert_with(Default::default).fraction =
                        Some(parse_value(key, value)?);
                }
                "refine.score-cut" => {
                    self.refine.get_or_insert_with(Default::default).score_cut =
                        Some(parse_value(key, value)?);
                }
                "output.top" => {
                    self.output.get_or_insert_with(Default::default).top =
                        Some(parse_value(key, value)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    const BASIC: &str = r#"
scaffolds = ["first", "second"]

[search]
resolutions = [4.0, 2.0]
beam-size = 256
global-score-cut = 5.0

[nest]
translation-lower = [-4.0, -4.0, -4.0]
translation-upper = [4.0, 4.0, 4.0]
rotation-extent = 15.0
coarse-cells = [4, 4, 4, 1, 1, 1]

[probes]
mobile = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
target = [[2.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 1.0]]

[catalog]
spec = "rotamers.txt"

[filter]
fraction = 0.5

[refine]
mode = "minimize"
score-cut = 1.0
"#;

    fn search_args(extra: &[&str]) -> SearchArgs {
        let mut argv = vec!["rifdock", "search", "--config", "unused.toml"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Search(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    fn parse(content: &str) -> PartialSearchFile {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn file_values_reach_the_dock_config() {
        let run = parse(BASIC).merge_with_cli(&search_args(&[]), None).unwrap();
        assert_eq!(run.dock.search.resolutions, vec![4.0, 2.0]);
        assert_eq!(run.dock.search.beam_size, 256);
        assert_eq!(run.dock.search.global_score_cut, 5.0);
        assert_eq!(run.dock.scaffolds, vec!["first", "second"]);
        assert_eq!(run.dock.probes.len(), 3);
        assert_eq!(run.dock.nest.coarse_cells, [4, 4, 4, 1, 1, 1]);
        assert_eq!(run.dock.score_filter.as_ref().unwrap().fraction, 0.5);
        assert_eq!(run.dock.refine.as_ref().unwrap().mode, RefineMode::Minimize);
        assert_eq!(run.top, defaults::TOP_RESULTS);
        assert!(matches!(run.catalog, CatalogSource::Spec { .. }));
    }

    #[test]
    fn cli_flags_override_the_file() {
        let args = search_args(&["--beam-size", "512", "--score-cut", "-1.5", "-n", "3", "--no-refine"]);
        let run = parse(BASIC).merge_with_cli(&args, None).unwrap();
        assert_eq!(run.dock.search.beam_size, 512);
        assert_eq!(run.dock.search.global_score_cut, -1.5);
        assert_eq!(run.top, 3);
        assert!(run.dock.refine.is_none());
    }

    #[test]
    fn set_values_override_the_file() {
        let args = search_args(&["-S", "search.beam-size=128", "-S", "output.top=7"]);
        let run = parse(BASIC).merge_with_cli(&args, None).unwrap();
        assert_eq!(run.dock.search.beam_size, 128);
        assert_eq!(run.top, 7);
    }

    #[test]
    fn unknown_set_key_is_rejected() {
        let args = search_args(&["-S", "search.nonsense=1"]);
        let result = parse(BASIC).merge_with_cli(&args, None);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn missing_resolutions_is_a_config_error() {
        let content = BASIC.replace("resolutions = [4.0, 2.0]\n", "");
        let result = parse(&content).merge_with_cli(&search_args(&[]), None);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("search.resolutions")));
    }

    #[test]
    fn beam_smaller_than_the_fan_out_is_rejected() {
        let args = search_args(&["--beam-size", "32"]);
        let result = parse(BASIC).merge_with_cli(&args, None);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn catalog_needs_exactly_one_source() {
        let both = BASIC.replace("spec = \"rotamers.txt\"", "spec = \"a.txt\"\npath = \"b.cat\"");
        assert!(parse(&both).merge_with_cli(&search_args(&[]), None).is_err());
        let neither = BASIC.replace("spec = \"rotamers.txt\"", "");
        assert!(parse(&neither).merge_with_cli(&search_args(&[]), None).is_err());
    }

    #[test]
    fn unknown_fields_fail_to_parse() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search.toml");
        fs::write(&path, format!("{}\nbogus = 1\n", BASIC)).unwrap();
        let result = PartialSearchFile::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn catalog_paths_are_relative_to_the_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search.toml");
        fs::write(&path, BASIC).unwrap();
        let run = PartialSearchFile::from_file(&path)
            .unwrap()
            .merge_with_cli(&search_args(&[]), Some(2))
            .unwrap();
        assert_eq!(run.dock.search.num_threads, Some(2));
        match run.catalog {
            CatalogSource::Spec { path, templates } => {
                assert_eq!(path, dir.path().join("rotamers.txt"));
                assert!(templates.is_none());
            }
            other => panic!("unexpected catalog source {:?}", other),
        }
    }
}
