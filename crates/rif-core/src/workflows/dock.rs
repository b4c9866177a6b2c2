use super::reference::{NestDirector, ProbeObjective, ProbeRefiner};
use crate::core::kinematics::nest::{NestBounds, RigidBodyNest};
use crate::core::kinematics::probe::ProbeMatch;
use crate::core::kinematics::scene::{RigidBody, RigidScene};
use crate::core::models::index::SearchPointWithRots;
use crate::core::rotamers::catalog::RotamerCatalog;
use crate::engine::config::{ConfigError, RefineConfig, ScoreFilterConfig, SearchConfig, validate};
use crate::engine::context::SearchContext;
use crate::engine::error::EngineError;
use crate::engine::hsearch::hierarchical_search;
use crate::engine::interfaces::Objective;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::scaffold::StaticScaffoldProvider;
use crate::engine::state::{SearchCounters, SearchOutcome};
use crate::engine::tasks::{filter, refine};
use nalgebra::Point3;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Inputs of a probe-docking run.
#[derive(Debug, Clone)]
pub struct DockConfig {
    pub search: SearchConfig,
    pub nest: NestBounds,
    /// Points on the mobile body, in its own frame.
    pub probes: Vec<Point3<f64>>,
    /// Where each probe should land, in the target frame.
    pub targets: Vec<Point3<f64>>,
    pub scaffolds: Vec<String>,
    pub score_filter: Option<ScoreFilterConfig>,
    pub refine: Option<RefineConfig>,
}

#[derive(Debug, Clone)]
pub struct DockResult {
    /// Results sorted best first; empty when the search failed.
    pub points: Vec<SearchPointWithRots>,
    pub counters: SearchCounters,
    /// Stage at which no sample survived the global cut.
    pub failed_stage: Option<usize>,
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> EngineError {
    ConfigError::InvalidParameter {
        parameter,
        reason: reason.into(),
    }
    .into()
}

/// Searches the nest for poses that put the probes onto their targets, then
/// applies the optional filter and refinement passes.
#[instrument(skip_all, name = "dock_workflow")]
pub fn run(
    config: &DockConfig,
    catalog: Arc<RotamerCatalog>,
    reporter: &ProgressReporter,
) -> Result<DockResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    validate(&config.search)?;
    if config.probes.is_empty() || config.probes.len() != config.targets.len() {
        return Err(invalid(
            "probes",
            format!(
                "{} probes for {} targets",
                config.probes.len(),
                config.targets.len()
            ),
        ));
    }
    if config.scaffolds.is_empty() {
        return Err(invalid("scaffolds", "at least one scaffold is required"));
    }
    let nest = Arc::new(
        RigidBodyNest::new(&config.nest)
            .ok_or_else(|| invalid("nest", "bounds must be finite and non-empty"))?,
    );
    let matcher = Arc::new(ProbeMatch::new(config.targets.clone()));
    let scene = RigidScene::new(
        RigidBody::new(config.targets.clone()),
        RigidBody::new(config.probes.clone()),
    );
    let director = NestDirector::new(Arc::clone(&nest));
    let stage_objectives = ProbeObjective::for_stages(
        Arc::clone(&matcher),
        &nest,
        &config.probes,
        config.search.n_stages(),
    );
    let objectives: Vec<&dyn Objective<RigidScene>> = stage_objectives
        .iter()
        .map(|o| o as &dyn Objective<RigidScene>)
        .collect();
    let scaffolds = StaticScaffoldProvider::new(config.scaffolds.iter().cloned());
    info!(
        coarse_cells = nest.coarse_size(),
        stages = config.search.n_stages(),
        scaffolds = scaffolds.len(),
        "Prepared docking run."
    );
    reporter.report(Progress::PhaseFinish);

    let mut ctx = SearchContext::new(
        &director,
        objectives,
        &scaffolds,
        &catalog,
        &config.search,
        reporter,
    )?;
    let outcome = hierarchical_search(&mut ctx, &scene)?;
    let counters = ctx.counters;

    let mut points = match outcome {
        SearchOutcome::Completed(points) => points,
        SearchOutcome::Failed { stage } => {
            warn!(stage, "Search found no pose under the global score cut.");
            return Ok(DockResult {
                points: Vec::new(),
                counters,
                failed_stage: Some(stage),
            });
        }
    };

    if let Some(filter_config) = &config.score_filter {
        reporter.report(Progress::PhaseStart { name: "Filtering" });
        points = filter::filter_for_score(points, filter_config)?;
        reporter.report(Progress::PhaseFinish);
    }

    if let Some(refine_config) = &config.refine {
        reporter.report(Progress::PhaseStart { name: "Refinement" });
        let finest = config.search.n_stages() - 1;
        let refiner = ProbeRefiner::new(Arc::clone(&nest), Arc::clone(&matcher), scene, finest);
        points = refine::run(points, &refiner, refine_config, reporter)?;
        reporter.report(Progress::PhaseFinish);
    }

    info!(results = points.len(), "Docking workflow complete.");
    Ok(DockResult {
        points,
        counters,
        failed_stage: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kinematics::nest::NEST_DIMPOW2;
    use crate::core::rotamers::generator::TemplateRotamerGenerator;
    use crate::engine::config::{RefineMode, SearchConfigBuilder};

    fn catalog() -> Arc<RotamerCatalog> {
        let generator = TemplateRotamerGenerator::builtin().unwrap();
        let mut builder = RotamerCatalog::builder(&generator);
        builder.add_rotamer("ALA", &[], 0, None, false).unwrap();
        builder.add_rotamer("SER", &[60.0, 180.0], 1, None, false).unwrap();
        Arc::new(builder.build().unwrap())
    }

    fn config(cut: f32) -> DockConfig {
        let probes = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let shift = nalgebra::Vector3::new(1.25, -0.75, 0.5);
        DockConfig {
            search: SearchConfigBuilder::new()
                .resolutions(vec![4.0, 2.0])
                .beam_size(4 * NEST_DIMPOW2 as usize)
                .dimpow2(NEST_DIMPOW2)
                .global_score_cut(cut)
                .num_threads(2)
                .build()
                .unwrap(),
            nest: NestBounds {
                translation_lower: [-4.0, -4.0, -4.0],
                translation_upper: [4.0, 4.0, 4.0],
                rotation_extent: 15.0,
                coarse_cells: [4, 4, 4, 1, 1, 1],
            },
            targets: probes.iter().map(|p| p + shift).collect(),
            probes,
            scaffolds: vec!["scaffold".to_string()],
            score_filter: None,
            refine: None,
        }
    }

    #[test]
    fn finds_the_cell_containing_the_true_pose() {
        let result = run(&config(f32::INFINITY), catalog(), &ProgressReporter::new()).unwrap();
        assert!(result.failed_stage.is_none());
        assert!(!result.points.is_empty());
        assert!(result.points[0].score < 0.5);
        assert_eq!(result.counters.total_search_effort, 64 + 4 * 64);
        assert_eq!(result.counters.non0_space_size, 4);
    }

    #[test]
    fn filter_and_refine_trim_and_rescore() {
        let mut config = config(f32::INFINITY);
        config.score_filter = Some(ScoreFilterConfig {
            fraction: 0.1,
            ..Default::default()
        });
        config.refine = Some(RefineConfig {
            mode: RefineMode::Minimize,
            score_cut: 1.0,
        });
        let result = run(&config, catalog(), &ProgressReporter::new()).unwrap();
        assert!(!result.points.is_empty());
        assert!(result.points.len() <= 26);
        assert!(result.points.windows(2).all(|w| w[0].score <= w[1].score));
        assert!(result.points.iter().all(|p| p.score < 1.0));
    }

    #[test]
    fn impossible_cut_reports_the_failed_stage() {
        let result = run(&config(-10.0), catalog(), &ProgressReporter::new()).unwrap();
        assert_eq!(result.failed_stage, Some(0));
        assert!(result.points.is_empty());
    }

    #[test]
    fn mismatched_probes_are_a_config_error() {
        let mut config = config(f32::INFINITY);
        config.targets.pop();
        let result = run(&config, catalog(), &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn unvalidated_search_settings_are_a_config_error() {
        let mut config = config(f32::INFINITY);
        config.refine = Some(RefineConfig {
            mode: RefineMode::Score,
            score_cut: 1.0,
        });
        config.search.dimpow2 = 0;
        let result = run(&config, catalog(), &ProgressReporter::new());
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::InvalidParameter { parameter: "dimpow2", .. }))
        ));

        config.search.dimpow2 = NEST_DIMPOW2;
        config.search.resolutions.clear();
        let result = run(&config, catalog(), &ProgressReporter::new());
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::InvalidParameter { parameter: "resolutions", .. }))
        ));
    }
}
