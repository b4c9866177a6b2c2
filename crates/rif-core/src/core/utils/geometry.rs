use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Smallest absolute difference between two angles in degrees, accounting
/// for the 360° wraparound.
pub fn angular_difference(a: f32, b: f32) -> f32 {
    let diff = a - b;
    (diff + 360.0).abs().min((diff - 360.0).abs()).min(diff.abs())
}

/// Returns `true` when two angles (degrees) lie within `tolerance` of each other.
pub fn angle_is_close(a: f32, b: f32, tolerance: f32) -> bool {
    angular_difference(a, b) <= tolerance
}

/// Places an atom from internal coordinates (natural extension reference frame).
///
/// `bonded` is the atom the new atom is bonded to, `angle_ref` defines the bond
/// angle and `torsion_ref` the dihedral. Angles are in degrees.
pub fn place_atom(
    bonded: &Point3<f64>,
    angle_ref: &Point3<f64>,
    torsion_ref: &Point3<f64>,
    bond_length: f64,
    bond_angle: f64,
    dihedral: f64,
) -> Option<Point3<f64>> {
    let bc = bonded - angle_ref;
    if bc.norm_squared() < f64::EPSILON {
        return None;
    }
    let bc = bc.normalize();
    let normal = (angle_ref - torsion_ref).cross(&bc);
    if normal.norm_squared() < f64::EPSILON {
        return None;
    }
    let normal = normal.normalize();
    let frame = Matrix3::from_columns(&[bc, normal.cross(&bc), normal]);

    let theta = bond_angle.to_radians();
    let phi = dihedral.to_radians();
    let local = Vector3::new(
        -bond_length * theta.cos(),
        bond_length * theta.sin() * phi.cos(),
        bond_length * theta.sin() * phi.sin(),
    );
    Some(bonded + frame * local)
}

/// Builds a right-handed coordinate frame centred on `origin`.
///
/// The x axis points from `second` to `origin`, the z axis is normal to the
/// plane of the three points. Returns `None` for (near) collinear input.
pub fn make_stub(
    origin: &Point3<f64>,
    second: &Point3<f64>,
    third: &Point3<f64>,
) -> Option<Isometry3<f64>> {
    let e1 = origin - second;
    if e1.norm_squared() < 1e-12 {
        return None;
    }
    let e1 = e1.normalize();
    let e3 = e1.cross(&(third - second));
    if e3.norm_squared() < 1e-12 {
        return None;
    }
    let e3 = e3.normalize();
    let e2 = e3.cross(&e1);

    let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[e1, e2, e3]));
    Some(Isometry3::from_parts(
        Translation3::from(origin.coords),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}

/// Reflects a point through the xy plane; used to build mirror-image residues.
pub fn mirror_z(point: &Point3<f64>) -> Point3<f64> {
    Point3::new(point.x, point.y, -point.z)
}

pub fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
    if coords1.len() != coords2.len() || coords1.is_empty() {
        return None;
    }
    let n = coords1.len() as f64;
    let squared_dist_sum: f64 = coords1
        .iter()
        .zip(coords2.iter())
        .map(|(p1, p2)| (p1 - p2).norm_squared())
        .sum();
    Some((squared_dist_sum / n).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    #[test]
    fn angular_difference_wraps_around() {
        assert!((angular_difference(179.0, -179.0) - 2.0).abs() < 1e-4);
        assert!((angular_difference(-60.0, 300.0)).abs() < 1e-4);
        assert!((angular_difference(10.0, 40.0) - 30.0).abs() < 1e-4);
    }

    #[test]
    fn angle_is_close_is_inclusive() {
        assert!(angle_is_close(0.0, 5.0, 5.0));
        assert!(!angle_is_close(0.0, 5.1, 5.0));
        assert!(angle_is_close(359.9995, 0.0, 0.001));
    }

    #[test]
    fn place_atom_respects_internal_coordinates() {
        let a = Point3::new(0.0, 1.0, 0.0);
        let b = Point3::new(0.0, 0.0, 0.0);
        let c = Point3::new(1.5, 0.0, 0.0);
        let d = place_atom(&c, &b, &a, 1.2, 110.0, 60.0).unwrap();

        assert!(((d - c).norm() - 1.2).abs() < TOL);
        let angle = (b - c).angle(&(d - c)).to_degrees();
        assert!((angle - 110.0).abs() < 1e-6);
    }

    #[test]
    fn place_atom_rejects_degenerate_references() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(place_atom(&p, &p, &Point3::origin(), 1.0, 109.5, 0.0).is_none());
    }

    #[test]
    fn make_stub_maps_origin_and_axes() {
        let p0 = Point3::new(1.0, 2.0, 3.0);
        let p1 = Point3::new(0.0, 2.0, 3.0);
        let p2 = Point3::new(0.0, 3.0, 3.0);
        let stub = make_stub(&p0, &p1, &p2).unwrap();

        assert!((stub * Point3::origin() - p0).norm() < TOL);
        assert!((stub * Point3::new(1.0, 0.0, 0.0) - Point3::new(2.0, 2.0, 3.0)).norm() < TOL);
        assert!((stub * Point3::new(0.0, 0.0, 1.0) - Point3::new(1.0, 2.0, 4.0)).norm() < TOL);
    }

    #[test]
    fn make_stub_rejects_collinear_points() {
        let p0 = Point3::new(2.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::new(0.0, 0.0, 0.0);
        assert!(make_stub(&p0, &p1, &p2).is_none());
    }

    #[test]
    fn rmsd_of_identical_sets_is_zero() {
        let pts = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)];
        assert_eq!(calculate_rmsd(&pts, &pts), Some(0.0));
        assert_eq!(calculate_rmsd(&pts, &pts[..1]), None);
    }
}
