use nalgebra::{Isometry3, Point3};
use std::sync::Arc;

/// A set of points moving together under one pose.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    pub pose: Isometry3<f64>,
    pub points: Vec<Point3<f64>>,
}

impl RigidBody {
    pub fn new(points: Vec<Point3<f64>>) -> Self {
        Self {
            pose: Isometry3::identity(),
            points,
        }
    }

    /// Points in the global frame.
    pub fn world_points(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.points.iter().map(move |p| self.pose * p)
    }
}

/// A scene of rigid bodies. Body 0 is the fixed target; the rest move.
///
/// Bodies are shared between clones until a body is moved or deep-copied,
/// so cloning a scene for every worker does not copy the target.
#[derive(Debug, Clone)]
pub struct RigidScene {
    bodies: Vec<Arc<RigidBody>>,
}

impl RigidScene {
    pub fn new(target: RigidBody, mobile: RigidBody) -> Self {
        Self::from_bodies(vec![target, mobile])
    }

    /// Scene of `bodies` in order; the first is the target.
    pub fn from_bodies(bodies: Vec<RigidBody>) -> Self {
        Self {
            bodies: bodies.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn n_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn body(&self, i: usize) -> Option<&RigidBody> {
        self.bodies.get(i).map(Arc::as_ref)
    }

    /// Moves body `i`; returns `false` when there is no such body.
    pub fn set_pose(&mut self, i: usize, pose: Isometry3<f64>) -> bool {
        match self.bodies.get_mut(i) {
            Some(body) => {
                Arc::make_mut(body).pose = pose;
                true
            }
            None => false,
        }
    }

    /// Clone whose bodies listed in `levels` no longer share storage with `self`.
    pub fn deep_copy_bodies(&self, levels: &[u64]) -> Self {
        let bodies = self
            .bodies
            .iter()
            .enumerate()
            .map(|(i, body)| {
                if levels.contains(&(i as u64)) {
                    Arc::new(RigidBody::clone(body))
                } else {
                    Arc::clone(body)
                }
            })
            .collect();
        Self { bodies }
    }

    /// Whether body `i` shares storage with the same body of `other`.
    pub fn shares_body(&self, other: &Self, i: usize) -> bool {
        match (self.bodies.get(i), other.bodies.get(i)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
