use super::scene::RigidBody;
use crate::core::utils::geometry::calculate_rmsd;
use nalgebra::Point3;

/// Scores how far a moving body's probe points are from their targets.
///
/// Probe `k` of the mobile body should land on target `k` of the fixed body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeMatch {
    targets: Vec<Point3<f64>>,
}

impl ProbeMatch {
    pub fn new(targets: Vec<Point3<f64>>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[Point3<f64>] {
        &self.targets
    }

    /// RMSD between the posed probes of `mobile` and the targets, or `None`
    /// when the point counts differ or are zero.
    pub fn rmsd(&self, mobile: &RigidBody) -> Option<f64> {
        let placed: Vec<Point3<f64>> = mobile.world_points().collect();
        calculate_rmsd(&placed, &self.targets)
    }

    /// Lower bound of the RMSD for any pose that moves no probe further than
    /// `radius` from where the current pose puts it. May be negative.
    pub fn bounded_rmsd(&self, mobile: &RigidBody, radius: f64) -> Option<f64> {
        self.rmsd(mobile).map(|r| r - radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Isometry3;

    fn probes() -> RigidBody {
        RigidBody::new(vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)])
    }

    #[test]
    fn perfect_pose_scores_zero() {
        let m = ProbeMatch::new(vec![Point3::new(2.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)]);
        let mut body = probes();
        body.pose = Isometry3::translation(2.0, 0.0, 0.0);
        assert!(m.rmsd(&body).unwrap().abs() < 1e-12);
    }

    #[test]
    fn offset_pose_scores_the_offset() {
        let m = ProbeMatch::new(vec![Point3::new(0.0, 3.0, 0.0), Point3::new(1.0, 3.0, 0.0)]);
        let body = probes();
        assert!((m.rmsd(&body).unwrap() - 3.0).abs() < 1e-12);
        assert!((m.bounded_rmsd(&body, 1.0).unwrap() - 2.0).abs() < 1e-12);
        assert!((m.bounded_rmsd(&body, 5.0).unwrap() + 2.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_counts_have_no_score() {
        let m = ProbeMatch::new(vec![Point3::origin()]);
        assert!(m.rmsd(&probes()).is_none());
    }
}
