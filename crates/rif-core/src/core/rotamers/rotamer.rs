use crate::core::models::atom::{HBondRay, RotamerAtom};
use crate::core::utils::geometry::make_stub;
use nalgebra::Isometry3;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Atoms and polar rays of one side-chain conformation, as produced by a
/// [`RotamerGenerator`](super::generator::RotamerGenerator).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RotamerGeometry {
    /// Heavy atoms first, then hydrogens.
    pub atoms: Vec<RotamerAtom>,
    pub donors: Vec<HBondRay>,
    pub acceptors: Vec<HBondRay>,
}

/// One discrete side-chain conformation.
///
/// Immutable once added to a catalog; every query on the catalog reads
/// through this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Rotamer {
    pub resname: String,
    /// Chi angles in degrees. Proton chis, if any, come last.
    pub chi: Vec<f32>,
    pub n_proton_chi: usize,
    pub atoms: Vec<RotamerAtom>,
    pub donors: Vec<HBondRay>,
    pub acceptors: Vec<HBondRay>,
    pub n_heavy_atoms: usize,
}

impl Rotamer {
    pub fn new(resname: String, chi: Vec<f32>, n_proton_chi: usize, geometry: RotamerGeometry) -> Self {
        let n_heavy_atoms = geometry.atoms.iter().filter(|a| a.is_heavy()).count();
        Self {
            resname,
            chi,
            n_proton_chi,
            atoms: geometry.atoms,
            donors: geometry.donors,
            acceptors: geometry.acceptors,
            n_heavy_atoms,
        }
    }

    #[inline]
    pub fn n_chi(&self) -> usize {
        self.chi.len()
    }

    /// Number of chis that move heavy atoms.
    #[inline]
    pub fn n_chi_noproton(&self) -> usize {
        self.chi.len().saturating_sub(self.n_proton_chi)
    }

    /// Local frame built from the three most distal heavy atoms.
    pub fn sidechain_stub(&self) -> Option<Isometry3<f64>> {
        let n = self.n_heavy_atoms;
        if n < 3 {
            return None;
        }
        make_stub(
            &self.atoms[n - 1].position,
            &self.atoms[n - 2].position,
            &self.atoms[n - 3].position,
        )
    }

    /// Order-independent fingerprint of the rotamer's identity (name, proton
    /// chi count and chi values), combined by XOR at the catalog level.
    pub fn validation_hash(&self) -> u64 {
        let mut h = hash_one(&self.resname);
        h ^= hash_one(&self.n_proton_chi);
        for chi in &self.chi {
            h ^= hash_one(&chi.to_bits());
        }
        h
    }
}

fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
