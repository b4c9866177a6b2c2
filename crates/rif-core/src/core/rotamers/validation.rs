use super::catalog::RotamerCatalog;
use super::error::CatalogError;
use super::passes::GROUPING_TOLERANCE;
use crate::core::utils::geometry::{angle_is_close, angular_difference};
use itertools::Itertools;

/// Two rotamers of one residue closer than this in every chi are duplicates.
pub const DUPLICATE_TOLERANCE: f32 = 5.0;
/// Maximum drift of the last non-proton chi of a child from its primary.
pub const LAST_CHI_DRIFT: f32 = 30.0;
/// Maximum drift of every other non-proton chi of a child from its primary.
pub const INNER_CHI_DRIFT: f32 = 20.0;
/// Every chi of a child block must stay this close to its primary.
pub const CHILD_BLOCK_TOLERANCE: f32 = 30.0;

fn invalid(index: usize, message: impl Into<String>) -> CatalogError {
    CatalogError::Validation {
        index,
        message: message.into(),
    }
}

/// Checks every structural invariant of a freshly built catalog.
///
/// The pairwise duplicate scan is quadratic in the catalog size.
pub fn validate(cat: &RotamerCatalog) -> Result<(), CatalogError> {
    check_bounds(cat)?;
    check_duplicates(cat)?;
    check_parents(cat)?;
    check_child_blocks(cat)?;
    check_chem_index(cat)?;
    check_protonchi_parents(cat)?;
    check_structural_parents(cat)?;
    check_primary_prefix(cat)?;
    Ok(())
}

fn check_bounds(cat: &RotamerCatalog) -> Result<(), CatalogError> {
    for (resname, range) in &cat.bounds_map {
        if range.start > range.end || range.end > cat.n_primary {
            return Err(invalid(
                range.start,
                format!("malformed primary bounds {:?} for {}", range, resname),
            ));
        }
    }
    Ok(())
}

fn check_duplicates(cat: &RotamerCatalog) -> Result<(), CatalogError> {
    for (jrot, irot) in (0..cat.len()).tuple_combinations() {
        if cat.resname(irot) != cat.resname(jrot) {
            continue;
        }
        let (a, b) = (cat.chis(irot), cat.chis(jrot));
        let duplicate = a.iter().enumerate().all(|(ichi, &x)| {
            b.get(ichi)
                .is_some_and(|&y| angle_is_close(x, y, DUPLICATE_TOLERANCE))
        });
        if duplicate {
            return Err(CatalogError::DuplicateRotamer {
                resname: cat.resname(irot).to_string(),
                first: jrot,
                second: irot,
                first_chi: b.to_vec(),
                second_chi: a.to_vec(),
            });
        }
    }
    Ok(())
}

fn check_parents(cat: &RotamerCatalog) -> Result<(), CatalogError> {
    for irot in 0..cat.len() {
        let ipri = cat.parent(irot);
        if cat.resname(irot) != cat.resname(ipri) {
            return Err(invalid(
                irot,
                format!(
                    "residue {} differs from parent {} ({})",
                    cat.resname(irot),
                    ipri,
                    cat.resname(ipri)
                ),
            ));
        }
        if cat.n_chi(irot) != cat.n_chi(ipri) {
            return Err(invalid(
                irot,
                format!("chi count differs from parent {}", ipri),
            ));
        }
        if cat.n_proton_chi(ipri) > 1 {
            return Err(invalid(ipri, "primary rotamer has more than one proton chi"));
        }

        let nchi = cat.n_chi_noproton(ipri);
        for ichi in 0..nchi {
            let difference = angular_difference(cat.chi(irot, ichi), cat.chi(ipri, ichi));
            let limit = if ichi + 1 == nchi {
                LAST_CHI_DRIFT
            } else {
                INNER_CHI_DRIFT
            };
            if difference >= limit {
                return Err(CatalogError::ChiDrift {
                    resname: cat.resname(irot).to_string(),
                    index: irot,
                    parent: ipri,
                    chi: ichi,
                    difference,
                    limit,
                });
            }
        }
    }
    Ok(())
}

fn check_child_blocks(cat: &RotamerCatalog) -> Result<(), CatalogError> {
    for irot in cat.n_primary..cat.len() {
        let block = cat.child_bounds_of_primary(cat.parent(irot));
        if !block.contains(&irot) {
            return Err(invalid(
                irot,
                format!("outside the child block {:?} of its parent", block),
            ));
        }
    }

    for ipri in 0..cat.n_primary {
        for ichild in cat.child_bounds_of_primary(ipri) {
            let same_shape = cat.parent(ichild) == ipri
                && cat.resname(ichild) == cat.resname(ipri)
                && cat.n_chi(ichild) == cat.n_chi(ipri)
                && cat.n_proton_chi(ichild) == cat.n_proton_chi(ipri)
                && cat.n_atoms(ichild) == cat.n_atoms(ipri)
                && cat.n_heavy_atoms(ichild) == cat.n_heavy_atoms(ipri);
            if !same_shape {
                return Err(invalid(
                    ichild,
                    format!("child does not match the shape of primary {}", ipri),
                ));
            }
            let close = (0..cat.n_chi(ipri)).all(|ichi| {
                angle_is_close(cat.chi(ipri, ichi), cat.chi(ichild, ichi), CHILD_BLOCK_TOLERANCE)
            });
            if !close {
                return Err(invalid(
                    ichild,
                    format!("child chis more than 30° from primary {}", ipri),
                ));
            }
        }
    }
    Ok(())
}

fn check_chem_index(cat: &RotamerCatalog) -> Result<(), CatalogError> {
    for irot in 0..cat.len() {
        let expected = cat
            .chem_atom_data(cat.resname(irot))
            .ok_or_else(|| invalid(irot, "residue missing from the chemical index"))?;
        let atoms = cat.atoms(irot);
        let consistent = atoms.len() == expected.len()
            && atoms.iter().zip(expected).all(|(a, e)| &a.data == e);
        if !consistent {
            return Err(invalid(
                irot,
                format!("atoms disagree with the chemical index for {}", cat.resname(irot)),
            ));
        }
    }
    Ok(())
}

/// Shared shape check for the grouping parents.
fn same_shape(cat: &RotamerCatalog, a: usize, b: usize) -> bool {
    cat.n_chi(a) == cat.n_chi(b)
        && cat.n_proton_chi(a) == cat.n_proton_chi(b)
        && cat.n_atoms(a) == cat.n_atoms(b)
        && cat.n_heavy_atoms(a) == cat.n_heavy_atoms(b)
}

fn check_protonchi_parents(cat: &RotamerCatalog) -> Result<(), CatalogError> {
    for irot in 0..cat.len() {
        let ipcp = cat.protonchi_parent(irot);
        if ipcp > irot {
            return Err(invalid(irot, format!("proton-chi parent {} comes later", ipcp)));
        }
        let consistent = cat.resname(ipcp) == cat.resname(irot)
            && same_shape(cat, irot, ipcp)
            && (0..cat.n_chi_noproton(irot)).all(|ichi| {
                angle_is_close(cat.chi(irot, ichi), cat.chi(ipcp, ichi), GROUPING_TOLERANCE)
            });
        if !consistent {
            return Err(invalid(
                irot,
                format!("inconsistent proton-chi parent {}", ipcp),
            ));
        }
    }
    Ok(())
}

fn check_structural_parents(cat: &RotamerCatalog) -> Result<(), CatalogError> {
    for irot in 0..cat.len() {
        let isp = cat.structural_parent(irot);
        if isp > irot {
            return Err(invalid(irot, format!("structural parent {} comes later", isp)));
        }
        let start = cat.same_struct_start_chi(irot);
        let consistent = (cat.resname(isp) == cat.resname(irot) || cat.resname(irot) == "HIS_D")
            && same_shape(cat, irot, isp)
            && (start..cat.n_chi_noproton(irot)).all(|ichi| {
                angle_is_close(cat.chi(irot, ichi), cat.chi(isp, ichi), GROUPING_TOLERANCE)
            });
        if !consistent {
            return Err(invalid(
                irot,
                format!("inconsistent structural parent {}", isp),
            ));
        }
    }
    Ok(())
}

fn check_primary_prefix(cat: &RotamerCatalog) -> Result<(), CatalogError> {
    if let Some(ala) = cat.ala_rotamer() {
        if cat.resname(ala) != "ALA" {
            return Err(invalid(ala, "cached ALA index points at another residue"));
        }
    }
    for irot in 0..cat.len() {
        let self_parented = cat.parent(irot) == irot;
        if cat.is_primary(irot) != self_parented {
            return Err(invalid(
                irot,
                "primary rotamers must occupy exactly the leading block",
            ));
        }
    }
    Ok(())
}
