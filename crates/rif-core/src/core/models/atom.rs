use nalgebra::{Point3, Vector3};
use serde::Deserialize;

/// Classification of an atom within a residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomRole {
    /// Main-chain atom (N, CA, C, O and their hydrogens).
    Backbone,
    /// Side-chain atom, moved by chi rotations.
    #[default]
    Sidechain,
}

/// Position-independent description of an atom, shared by every rotamer of
/// the same residue type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomData {
    /// PDB-style atom name (e.g. "CB", "OG").
    pub name: String,
    /// Numeric atom type used by scoring tables.
    pub atom_type: i32,
    /// Backbone or side chain.
    pub role: AtomRole,
    /// Whether this is a non-hydrogen atom.
    pub heavy: bool,
}

/// A typed atom of a rotamer, positioned in the residue's local backbone frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RotamerAtom {
    pub data: AtomData,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
}

impl RotamerAtom {
    pub fn new(data: AtomData, position: Point3<f64>) -> Self {
        Self { data, position }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.data.name
    }

    #[inline]
    pub fn atom_type(&self) -> i32 {
        self.data.atom_type
    }

    #[inline]
    pub fn is_heavy(&self) -> bool {
        self.data.heavy
    }
}

/// A hydrogen-bonding direction: orbital (or hydrogen) centre plus a unit
/// direction pointing away from the polar atom's base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HBondRay {
    pub horb_cen: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl HBondRay {
    /// Builds a ray anchored at `polar` pointing away from `base`.
    ///
    /// Returns `None` when both atoms coincide.
    pub fn from_atoms(polar: &Point3<f64>, base: &Point3<f64>) -> Option<Self> {
        let v = polar - base;
        let norm = v.norm();
        if norm < 1e-9 {
            return None;
        }
        Some(Self {
            horb_cen: *polar,
            direction: v / norm,
        })
    }

    /// Point one unit along the ray, handy for visual dumps.
    pub fn tip(&self) -> Point3<f64> {
        self.horb_cen + self.direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hbond_ray_points_away_from_base() {
        let ray =
            HBondRay::from_atoms(&Point3::new(0.0, 0.0, 2.0), &Point3::new(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(ray.direction, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(ray.tip(), Point3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn hbond_ray_requires_distinct_atoms() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(HBondRay::from_atoms(&p, &p).is_none());
    }
}
