//! Derived-index passes run by [`RotamerCatalogBuilder::build`](super::catalog::RotamerCatalogBuilder::build).
//!
//! Each pass reads the immutable rotamer list (and the output of earlier
//! passes) and returns one derived table.

use super::error::CatalogError;
use super::rotamer::Rotamer;
use crate::core::chemistry::naming;
use crate::core::models::atom::AtomData;
use crate::core::utils::geometry::angle_is_close;
use nalgebra::Isometry3;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Tolerance (degrees) for the exact grouping comparisons.
pub const GROUPING_TOLERANCE: f32 = 0.001;

/// Per-residue atom data, taken from the first rotamer of each residue.
pub type ChemIndex = HashMap<String, Vec<AtomData>>;

/// Contiguous primary range per residue name.
pub fn compute_bounds(
    rotamers: &[Rotamer],
    n_primary: usize,
) -> Result<BTreeMap<String, Range<usize>>, CatalogError> {
    let mut bounds: BTreeMap<String, Range<usize>> = BTreeMap::new();
    let mut start = 0;
    for i in 1..=n_primary {
        let block_ends = i == n_primary || rotamers[i].resname != rotamers[i - 1].resname;
        if !block_ends {
            continue;
        }
        let resname = &rotamers[i - 1].resname;
        if bounds.contains_key(resname) {
            return Err(CatalogError::NonContiguous {
                key: resname.clone(),
                index: start,
            });
        }
        bounds.insert(resname.clone(), start..i);
        start = i;
    }
    Ok(bounds)
}

/// Child range of every primary; `0..0` for primaries without children.
pub fn compute_child_ranges(
    parent_of: &[usize],
    n_primary: usize,
) -> Result<Vec<Range<usize>>, CatalogError> {
    let mut first = vec![usize::MAX; n_primary];
    let mut last = vec![0usize; n_primary];
    let mut count = vec![0usize; n_primary];

    for (i, &parent) in parent_of.iter().enumerate().skip(n_primary) {
        first[parent] = first[parent].min(i);
        last[parent] = last[parent].max(i);
        count[parent] += 1;
    }

    (0..n_primary)
        .map(|ipri| {
            if count[ipri] == 0 {
                return Ok(0..0);
            }
            if last[ipri] - first[ipri] + 1 != count[ipri] {
                return Err(CatalogError::NonContiguous {
                    key: format!("children of rotamer {}", ipri),
                    index: first[ipri],
                });
            }
            Ok(first[ipri]..last[ipri] + 1)
        })
        .collect()
}

pub fn build_chem_index(rotamers: &[Rotamer]) -> ChemIndex {
    let mut index = ChemIndex::new();
    for rotamer in rotamers {
        index
            .entry(rotamer.resname.clone())
            .or_insert_with(|| rotamer.atoms.iter().map(|a| a.data.clone()).collect());
    }
    index
}

fn chis_match(a: &Rotamer, b: &Rotamer, chis: Range<usize>, tolerance: f32) -> bool {
    chis.into_iter().all(|ichi| match (a.chi.get(ichi), b.chi.get(ichi)) {
        (Some(&x), Some(&y)) => angle_is_close(x, y, tolerance),
        _ => false,
    })
}

/// Earliest rotamer with the same grouping code whose chis in `chis_of(i)`
/// all match rotamer `i`; `i` itself when none does.
fn earliest_match<F>(rotamers: &[Rotamer], irot: usize, chis_of: F) -> usize
where
    F: Fn(&Rotamer) -> Range<usize>,
{
    let rot = &rotamers[irot];
    let code = naming::one_letter_code(&rot.resname);
    rotamers[..irot]
        .iter()
        .position(|other| {
            naming::one_letter_code(&other.resname) == code
                && chis_match(rot, other, chis_of(rot), GROUPING_TOLERANCE)
        })
        .unwrap_or(irot)
}

/// Groups rotamers that differ only in their proton chis.
pub fn compute_protonchi_parents(rotamers: &[Rotamer]) -> Vec<usize> {
    let parent_of = |irot: usize| {
        if rotamers[irot].n_proton_chi == 0 {
            irot
        } else {
            earliest_match(rotamers, irot, |r| 0..r.n_chi_noproton())
        }
    };

    #[cfg(feature = "parallel")]
    let parents = (0..rotamers.len()).into_par_iter().map(parent_of).collect();

    #[cfg(not(feature = "parallel"))]
    let parents = (0..rotamers.len()).map(parent_of).collect();

    parents
}

/// Groups rotamers whose side chains are identical up to a rigid motion,
/// returning the parent table and the list of self-parented rotamers.
pub fn compute_structural_parents(rotamers: &[Rotamer]) -> (Vec<usize>, Vec<usize>) {
    let parent_of = |irot: usize| {
        earliest_match(rotamers, irot, |r| {
            let start = naming::same_struct_start_chi(&r.resname);
            start..r.n_chi_noproton().max(start)
        })
    };

    #[cfg(feature = "parallel")]
    let parents: Vec<usize> = (0..rotamers.len()).into_par_iter().map(parent_of).collect();

    #[cfg(not(feature = "parallel"))]
    let parents: Vec<usize> = (0..rotamers.len()).map(parent_of).collect();

    let roots = parents
        .iter()
        .enumerate()
        .filter(|&(i, &p)| i == p)
        .map(|(i, _)| i)
        .collect();
    (parents, roots)
}

/// Transform taking each rotamer's side-chain stub onto its structural
/// parent's stub. Identity for structural primaries.
pub fn compute_structural_frames(
    rotamers: &[Rotamer],
    structural_parent_of: &[usize],
) -> Result<Vec<Isometry3<f64>>, CatalogError> {
    let stub = |irot: usize| {
        rotamers[irot]
            .sidechain_stub()
            .ok_or_else(|| CatalogError::DegenerateStub {
                index: irot,
                resname: rotamers[irot].resname.clone(),
            })
    };

    structural_parent_of
        .iter()
        .enumerate()
        .map(|(irot, &isp)| {
            if isp == irot {
                Ok(Isometry3::identity())
            } else {
                Ok(stub(isp)? * stub(irot)?.inverse())
            }
        })
        .collect()
}

pub fn compute_d_flags(rotamers: &[Rotamer]) -> Vec<bool> {
    rotamers
        .iter()
        .map(|r| naming::is_d_residue(&r.resname))
        .collect()
}

pub fn find_first(rotamers: &[Rotamer], resname: &str) -> Option<usize> {
    rotamers.iter().position(|r| r.resname == resname)
}
