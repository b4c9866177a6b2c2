//! Probe-matching collaborators for the search engine.
//!
//! A mobile body carries probe points that should land on target points of
//! the fixed body. The nest places the mobile body, and each stage scores
//! the probe RMSD minus how far any pose inside the cell could improve it.

use crate::core::kinematics::nest::RigidBodyNest;
use crate::core::kinematics::probe::ProbeMatch;
use crate::core::kinematics::scene::RigidScene;
use crate::core::models::index::{BigIndex, SearchPointWithRots};
use crate::engine::config::RefineMode;
use crate::engine::error::{EngineError, ScoringError};
use crate::engine::interfaces::{Director, Objective, Scene};
use crate::engine::tasks::refine::Refiner;
use nalgebra::Point3;
use std::sync::Arc;

/// Body the director moves.
pub const MOBILE_BODY: usize = 1;

impl Scene for RigidScene {
    fn clone_specific_deep(&self, levels: &[u64]) -> Self {
        self.deep_copy_bodies(levels)
    }
}

/// Places the mobile body at the centre of a nest cell.
#[derive(Debug, Clone)]
pub struct NestDirector {
    nest: Arc<RigidBodyNest>,
}

impl NestDirector {
    pub fn new(nest: Arc<RigidBodyNest>) -> Self {
        Self { nest }
    }
}

impl Director<RigidScene> for NestDirector {
    fn size(&self, resl: usize) -> u64 {
        self.nest.size(resl)
    }

    fn set_scene(&self, index: &BigIndex, resl: usize, scene: &mut RigidScene) -> Result<(), EngineError> {
        let pose = self
            .nest
            .pose(index.nest_part, resl)
            .ok_or_else(|| EngineError::Director {
                index: *index,
                resl,
                message: format!("cell outside the nest ({} cells)", self.nest.size(resl)),
            })?;
        if !scene.set_pose(MOBILE_BODY, pose) {
            return Err(EngineError::Director {
                index: *index,
                resl,
                message: "scene has no mobile body".to_string(),
            });
        }
        Ok(())
    }
}

/// Probe RMSD at one resolution, lowered by the cell's reach.
#[derive(Debug, Clone)]
pub struct ProbeObjective {
    matcher: Arc<ProbeMatch>,
    slack: f64,
}

impl ProbeObjective {
    pub fn new(matcher: Arc<ProbeMatch>, slack: f64) -> Self {
        Self { matcher, slack }
    }

    /// One objective per stage; a probe can move at most the translation
    /// radius plus its lever arm times the rotation radius within a cell.
    pub fn for_stages(
        matcher: Arc<ProbeMatch>,
        nest: &RigidBodyNest,
        probes: &[Point3<f64>],
        n_stages: usize,
    ) -> Vec<Self> {
        let lever = probes
            .iter()
            .map(|p| p.coords.norm())
            .fold(0.0, f64::max);
        (0..n_stages)
            .map(|resl| {
                let slack = nest.translation_radius(resl) + lever * nest.rotation_radius(resl);
                Self::new(Arc::clone(&matcher), slack)
            })
            .collect()
    }

    pub fn slack(&self) -> f64 {
        self.slack
    }
}

impl Objective<RigidScene> for ProbeObjective {
    fn score(&self, scene: &RigidScene) -> Result<f32, ScoringError> {
        let mobile = scene
            .body(MOBILE_BODY)
            .ok_or_else(|| ScoringError::InvalidScene("missing mobile body".to_string()))?;
        self.matcher
            .bounded_rmsd(mobile, self.slack)
            .map(|rmsd| rmsd as f32)
            .ok_or_else(|| ScoringError::InvalidScene("probe and target counts differ".to_string()))
    }
}

/// Rescores results at the exact cell pose; minimization also slides the
/// probes onto the target centroid.
#[derive(Debug, Clone)]
pub struct ProbeRefiner {
    nest: Arc<RigidBodyNest>,
    matcher: Arc<ProbeMatch>,
    scene: RigidScene,
    resl: usize,
}

impl ProbeRefiner {
    pub fn new(nest: Arc<RigidBodyNest>, matcher: Arc<ProbeMatch>, scene: RigidScene, resl: usize) -> Self {
        Self {
            nest,
            matcher,
            scene,
            resl,
        }
    }
}

fn centroid(points: impl Iterator<Item = Point3<f64>>) -> Option<Point3<f64>> {
    let (sum, n) = points.fold((nalgebra::Vector3::zeros(), 0usize), |(s, n), p| (s + p.coords, n + 1));
    (n > 0).then(|| Point3::from(sum / n as f64))
}

impl Refiner for ProbeRefiner {
    fn refine(&self, point: &SearchPointWithRots, mode: RefineMode) -> Result<f32, ScoringError> {
        let pose = self
            .nest
            .pose(point.index.nest_part, self.resl)
            .ok_or_else(|| ScoringError::InvalidScene(format!("{} is outside the nest", point.index)))?;
        let mut scene = self.scene.deep_copy_bodies(&[MOBILE_BODY as u64]);
        if !scene.set_pose(MOBILE_BODY, pose) {
            return Err(ScoringError::InvalidScene("scene has no mobile body".to_string()));
        }
        let mut mobile = scene
            .body(MOBILE_BODY)
            .cloned()
            .ok_or_else(|| ScoringError::InvalidScene("missing mobile body".to_string()))?;

        if mode == RefineMode::Minimize {
            let placed = centroid(mobile.world_points());
            let target = centroid(self.matcher.targets().iter().copied());
            if let (Some(placed), Some(target)) = (placed, target) {
                mobile.pose.append_translation_mut(&nalgebra::Translation3::from(target - placed));
            }
        }

        self.matcher
            .rmsd(&mobile)
            .map(|rmsd| rmsd as f32)
            .ok_or_else(|| ScoringError::InvalidScene("probe and target counts differ".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kinematics::nest::NestBounds;
    use crate::core::kinematics::scene::RigidBody;
    use crate::core::models::index::TreeIndex;

    fn nest() -> Arc<RigidBodyNest> {
        Arc::new(
            RigidBodyNest::new(&NestBounds {
                translation_lower: [-4.0, -4.0, -4.0],
                translation_upper: [4.0, 4.0, 4.0],
                rotation_extent: 20.0,
                coarse_cells: [2, 2, 2, 1, 1, 1],
            })
            .unwrap(),
        )
    }

    fn probes() -> Vec<Point3<f64>> {
        vec![Point3::new(1.0, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)]
    }

    fn scene() -> RigidScene {
        RigidScene::new(RigidBody::new(Vec::new()), RigidBody::new(probes()))
    }

    #[test]
    fn director_moves_the_mobile_body() {
        let director = NestDirector::new(nest());
        let mut scene = scene();
        let index = BigIndex::new(7, TreeIndex::new(1, 0));
        director.set_scene(&index, 0, &mut scene).unwrap();
        let centre = centroid(scene.body(MOBILE_BODY).unwrap().world_points()).unwrap();
        assert!((centre - Point3::new(2.0, 2.0, 2.0)).norm() < 1e-9);
    }

    #[test]
    fn director_rejects_cells_outside_the_nest() {
        let director = NestDirector::new(nest());
        let index = BigIndex::new(8, TreeIndex::new(1, 0));
        let result = director.set_scene(&index, 0, &mut scene());
        assert!(matches!(result, Err(EngineError::Director { resl: 0, .. })));
    }

    #[test]
    fn slack_shrinks_with_resolution() {
        let matcher = Arc::new(ProbeMatch::new(probes()));
        let objectives = ProbeObjective::for_stages(matcher, &nest(), &probes(), 3);
        assert_eq!(objectives.len(), 3);
        assert!(objectives[0].slack() > objectives[1].slack());
        assert!(objectives[1].slack() > objectives[2].slack());
    }

    #[test]
    fn objective_scores_a_posed_scene() {
        let matcher = Arc::new(ProbeMatch::new(probes()));
        let exact = ProbeObjective::new(Arc::clone(&matcher), 0.0);
        assert_eq!(exact.score(&scene()).unwrap(), 0.0);

        let mut moved = scene();
        moved.set_pose(MOBILE_BODY, nalgebra::Isometry3::translation(0.0, 0.0, 3.0));
        assert!((exact.score(&moved).unwrap() - 3.0).abs() < 1e-6);
        let loose = ProbeObjective::new(matcher, 1.0);
        assert!((loose.score(&moved).unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn minimization_never_scores_worse() {
        let targets = vec![Point3::new(1.5, 0.5, 0.0), Point3::new(-0.5, 0.5, 0.0)];
        let refiner = ProbeRefiner::new(nest(), Arc::new(ProbeMatch::new(targets)), scene(), 0);
        let point = SearchPointWithRots {
            index: BigIndex::new(0, TreeIndex::new(1, 0)),
            score: 0.0,
            rotamers: Vec::new(),
        };
        let scored = refiner.refine(&point, RefineMode::Score).unwrap();
        let minimized = refiner.refine(&point, RefineMode::Minimize).unwrap();
        assert!(minimized <= scored);
        assert!(minimized.abs() < 1e-5);
    }

    #[test]
    fn refiner_rejects_a_scene_without_a_mobile_body() {
        let target_only = RigidScene::from_bodies(vec![RigidBody::new(Vec::new())]);
        let refiner = ProbeRefiner::new(nest(), Arc::new(ProbeMatch::new(probes())), target_only, 0);
        let point = SearchPointWithRots {
            index: BigIndex::new(0, TreeIndex::new(1, 0)),
            score: 0.0,
            rotamers: Vec::new(),
        };
        for mode in [RefineMode::Score, RefineMode::Minimize] {
            assert!(matches!(
                refiner.refine(&point, mode),
                Err(ScoringError::InvalidScene(_))
            ));
        }
    }
}
