use super::error::CatalogError;
use super::generator::RotamerGenerator;
use super::passes::{self, ChemIndex};
use super::rotamer::Rotamer;
use super::validation;
use crate::core::chemistry::naming;
use crate::core::models::atom::{AtomData, HBondRay, RotamerAtom};
use nalgebra::Isometry3;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use tracing::{debug, info, instrument};

/// Incrementally collects rotamers before the derived index is built.
///
/// All primaries must be added before any child, and the primaries of one
/// residue (like the children of one primary) must be added contiguously.
pub struct RotamerCatalogBuilder<'g> {
    generator: &'g dyn RotamerGenerator,
    rotamers: Vec<Rotamer>,
    parent_of: Vec<usize>,
    n_primary: usize,
    seen_child: bool,
}

impl<'g> RotamerCatalogBuilder<'g> {
    pub fn new(generator: &'g dyn RotamerGenerator) -> Self {
        Self {
            generator,
            rotamers: Vec::new(),
            parent_of: Vec::new(),
            n_primary: 0,
            seen_child: false,
        }
    }

    /// Appends a rotamer and returns its index.
    ///
    /// `parent_key` is `None` for a primary rotamer, otherwise the index of
    /// the primary this rotamer refines.
    pub fn add_rotamer(
        &mut self,
        resname: &str,
        chi: &[f32],
        n_proton_chi: usize,
        parent_key: Option<usize>,
        is_d_variant: bool,
    ) -> Result<usize, CatalogError> {
        let index = self.rotamers.len();
        match parent_key {
            Some(_) if self.n_primary == 0 => {
                return Err(CatalogError::ConstructionOrder {
                    index,
                    message: "primary rotamers must be added before children".to_string(),
                });
            }
            None if self.seen_child => {
                return Err(CatalogError::ConstructionOrder {
                    index,
                    message: "cannot insert a primary rotamer after inserting a child".to_string(),
                });
            }
            Some(parent) if parent >= self.n_primary => {
                return Err(CatalogError::ParentOutOfRange {
                    index,
                    parent,
                    n_primary: self.n_primary,
                });
            }
            _ => {}
        }

        let geometry = self.generator.generate(resname, chi, is_d_variant)?;
        self.rotamers.push(Rotamer::new(
            resname.to_string(),
            chi.to_vec(),
            n_proton_chi,
            geometry,
        ));

        match parent_key {
            None => {
                self.n_primary = index + 1;
                self.parent_of.push(index);
            }
            Some(parent) => {
                self.seen_child = true;
                self.parent_of.push(parent);
            }
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.rotamers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotamers.is_empty()
    }

    pub fn n_primary_rotamers(&self) -> usize {
        self.n_primary
    }

    /// Computes every derived table, validates the result and freezes it.
    #[instrument(skip_all, name = "rotamer_catalog_build")]
    pub fn build(self) -> Result<RotamerCatalog, CatalogError> {
        if self.rotamers.is_empty() {
            return Err(CatalogError::Empty);
        }
        let rotamers = self.rotamers;
        let n_primary = self.n_primary;
        info!(
            n_rotamers = rotamers.len(),
            n_primary = n_primary,
            "Building rotamer catalog index."
        );

        let bounds_map = passes::compute_bounds(&rotamers, n_primary)?;
        let child_map = passes::compute_child_ranges(&self.parent_of, n_primary)?;
        let chem_index = passes::build_chem_index(&rotamers);

        let protonchi_parent_of = passes::compute_protonchi_parents(&rotamers);
        debug!(
            groups = protonchi_parent_of
                .iter()
                .enumerate()
                .filter(|&(i, &p)| i == p)
                .count(),
            "Proton-chi grouping complete."
        );

        let (structural_parent_of, structural_parents) =
            passes::compute_structural_parents(&rotamers);
        debug!(
            groups = structural_parents.len(),
            "Structural grouping complete."
        );

        let to_structural_parent_frame =
            passes::compute_structural_frames(&rotamers, &structural_parent_of)?;
        let is_d = passes::compute_d_flags(&rotamers);
        let ala_rot = passes::find_first(&rotamers, "ALA");

        let catalog = RotamerCatalog {
            rotamers,
            n_primary,
            parent_of: self.parent_of,
            bounds_map,
            child_map,
            chem_index,
            protonchi_parent_of,
            structural_parent_of,
            structural_parents,
            to_structural_parent_frame,
            is_d,
            ala_rot,
        };
        validation::validate(&catalog)?;

        info!(
            residues = catalog.bounds_map.len(),
            structural_parents = catalog.structural_parents.len(),
            "Rotamer catalog built and validated."
        );
        Ok(catalog)
    }
}

/// A validated, immutable rotamer database.
///
/// Primary rotamers occupy `[0, n_primary_rotamers())`; the children of each
/// primary follow as contiguous blocks. Every query takes `&self` and does
/// not allocate, so one catalog is shared by all search threads.
#[derive(Debug, Clone, PartialEq)]
pub struct RotamerCatalog {
    pub(super) rotamers: Vec<Rotamer>,
    pub(super) n_primary: usize,
    pub(super) parent_of: Vec<usize>,
    pub(super) bounds_map: BTreeMap<String, Range<usize>>,
    pub(super) child_map: Vec<Range<usize>>,
    pub(super) chem_index: ChemIndex,
    pub(super) protonchi_parent_of: Vec<usize>,
    pub(super) structural_parent_of: Vec<usize>,
    pub(super) structural_parents: Vec<usize>,
    pub(super) to_structural_parent_frame: Vec<Isometry3<f64>>,
    pub(super) is_d: Vec<bool>,
    pub(super) ala_rot: Option<usize>,
}

impl RotamerCatalog {
    pub fn builder(generator: &dyn RotamerGenerator) -> RotamerCatalogBuilder<'_> {
        RotamerCatalogBuilder::new(generator)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rotamers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rotamers.is_empty()
    }

    #[inline]
    pub fn n_primary_rotamers(&self) -> usize {
        self.n_primary
    }

    #[inline]
    pub fn rotamer(&self, irot: usize) -> &Rotamer {
        &self.rotamers[irot]
    }

    pub fn rotamers(&self) -> &[Rotamer] {
        &self.rotamers
    }

    #[inline]
    pub fn resname(&self, irot: usize) -> &str {
        &self.rotamers[irot].resname
    }

    /// Grouping code of the rotamer's residue (see [`naming::one_letter_code`]).
    #[inline]
    pub fn oneletter(&self, irot: usize) -> &str {
        naming::one_letter_code(&self.rotamers[irot].resname)
    }

    #[inline]
    pub fn chi(&self, irot: usize, ichi: usize) -> f32 {
        self.rotamers[irot].chi[ichi]
    }

    #[inline]
    pub fn chis(&self, irot: usize) -> &[f32] {
        &self.rotamers[irot].chi
    }

    #[inline]
    pub fn n_chi(&self, irot: usize) -> usize {
        self.rotamers[irot].n_chi()
    }

    #[inline]
    pub fn n_proton_chi(&self, irot: usize) -> usize {
        self.rotamers[irot].n_proton_chi
    }

    #[inline]
    pub fn n_chi_noproton(&self, irot: usize) -> usize {
        self.rotamers[irot].n_chi_noproton()
    }

    #[inline]
    pub fn atoms(&self, irot: usize) -> &[RotamerAtom] {
        &self.rotamers[irot].atoms
    }

    #[inline]
    pub fn atom(&self, irot: usize, iatom: usize) -> &RotamerAtom {
        &self.rotamers[irot].atoms[iatom]
    }

    #[inline]
    pub fn n_atoms(&self, irot: usize) -> usize {
        self.rotamers[irot].atoms.len()
    }

    #[inline]
    pub fn n_heavy_atoms(&self, irot: usize) -> usize {
        self.rotamers[irot].n_heavy_atoms
    }

    #[inline]
    pub fn donors(&self, irot: usize) -> &[HBondRay] {
        &self.rotamers[irot].donors
    }

    #[inline]
    pub fn acceptors(&self, irot: usize) -> &[HBondRay] {
        &self.rotamers[irot].acceptors
    }

    /// Primary rotamer range of a residue; empty when the residue is absent.
    ///
    /// Only meaningful for residues whose primaries were added as one block.
    pub fn index_bounds(&self, resname: &str) -> Range<usize> {
        self.bounds_map.get(resname).cloned().unwrap_or(0..0)
    }

    pub fn bounds_map(&self) -> &BTreeMap<String, Range<usize>> {
        &self.bounds_map
    }

    #[inline]
    pub fn child_bounds_of_primary(&self, ipri: usize) -> Range<usize> {
        self.child_map[ipri].clone()
    }

    pub fn child_map(&self) -> &[Range<usize>] {
        &self.child_map
    }

    #[inline]
    pub fn is_primary(&self, irot: usize) -> bool {
        irot < self.n_primary
    }

    /// Primary this rotamer refines; itself for primaries.
    #[inline]
    pub fn parent(&self, irot: usize) -> usize {
        self.parent_of[irot]
    }

    pub fn parent_map(&self) -> &[usize] {
        &self.parent_of
    }

    #[inline]
    pub fn protonchi_parent(&self, irot: usize) -> usize {
        self.protonchi_parent_of[irot]
    }

    #[inline]
    pub fn structural_parent(&self, irot: usize) -> usize {
        self.structural_parent_of[irot]
    }

    #[inline]
    pub fn is_structural_primary(&self, irot: usize) -> bool {
        self.structural_parent_of[irot] == irot
    }

    pub fn structural_parents(&self) -> &[usize] {
        &self.structural_parents
    }

    /// Transform mapping this rotamer's side-chain stub onto its structural
    /// parent's stub.
    #[inline]
    pub fn to_structural_parent_frame(&self, irot: usize) -> &Isometry3<f64> {
        &self.to_structural_parent_frame[irot]
    }

    #[inline]
    pub fn is_d(&self, irot: usize) -> bool {
        self.is_d[irot]
    }

    /// Index of the first ALA rotamer, if the catalog has one.
    pub fn ala_rotamer(&self) -> Option<usize> {
        self.ala_rot
    }

    pub fn same_struct_start_chi(&self, irot: usize) -> usize {
        naming::same_struct_start_chi(&self.rotamers[irot].resname)
    }

    pub fn make_sidechain_stub(&self, irot: usize) -> Option<Isometry3<f64>> {
        self.rotamers[irot].sidechain_stub()
    }

    /// Atom data shared by every rotamer of a residue.
    pub fn chem_atom_data(&self, resname: &str) -> Option<&[AtomData]> {
        self.chem_index.get(resname).map(Vec::as_slice)
    }

    /// XOR of the per-rotamer fingerprints; equal catalogs hash equally
    /// regardless of the order rotamers were added in.
    pub fn validation_hash(&self) -> u64 {
        self.rotamers
            .iter()
            .fold(0, |h, rot| h ^ rot.validation_hash())
    }
}

impl fmt::Display for RotamerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "RotamerCatalog: {} rotamers, {} primary",
            self.len(),
            self.n_primary
        )?;
        let mut blocks: Vec<_> = self.bounds_map.iter().collect();
        blocks.sort_by_key(|(_, range)| range.start);
        for (resname, range) in blocks {
            writeln!(
                f,
                "    {} {} {}-{} {} {}",
                resname,
                range.len(),
                range.start,
                range.end.saturating_sub(1),
                self.n_chi(range.start),
                self.n_proton_chi(range.start)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rotamers::generator::TemplateRotamerGenerator;
    use crate::core::utils::geometry::angular_difference;
    use nalgebra::Point3;

    fn generator() -> TemplateRotamerGenerator {
        TemplateRotamerGenerator::builtin().unwrap()
    }

    /// ALA, three LEU primaries with children on the first and last, one
    /// SER primary with a proton-chi child.
    fn sample_catalog(generator: &TemplateRotamerGenerator) -> RotamerCatalog {
        let mut b = RotamerCatalog::builder(generator);
        b.add_rotamer("ALA", &[], 0, None, false).unwrap();
        let leu0 = b.add_rotamer("LEU", &[-60.0, 180.0], 0, None, false).unwrap();
        b.add_rotamer("LEU", &[180.0, 60.0], 0, None, false).unwrap();
        let leu2 = b.add_rotamer("LEU", &[-60.0, 60.0], 0, None, false).unwrap();
        let ser = b.add_rotamer("SER", &[60.0, 0.0], 1, None, false).unwrap();
        b.add_rotamer("LEU", &[-70.0, 180.0], 0, Some(leu0), false).unwrap();
        b.add_rotamer("LEU", &[-50.0, 180.0], 0, Some(leu0), false).unwrap();
        b.add_rotamer("LEU", &[-60.0, 75.0], 0, Some(leu2), false).unwrap();
        b.add_rotamer("SER", &[60.0, 20.0], 1, Some(ser), false).unwrap();
        b.build().unwrap()
    }

    mod construction {
        use super::*;

        #[test]
        fn first_rotamer_must_be_primary() {
            let generator = generator();
            let mut b = RotamerCatalog::builder(&generator);
            let result = b.add_rotamer("ALA", &[], 0, Some(0), false);
            assert!(matches!(result, Err(CatalogError::ConstructionOrder { index: 0, .. })));
        }

        #[test]
        fn primary_after_child_is_rejected() {
            let generator = generator();
            let mut b = RotamerCatalog::builder(&generator);
            b.add_rotamer("VAL", &[60.0], 0, None, false).unwrap();
            b.add_rotamer("VAL", &[70.0], 0, Some(0), false).unwrap();
            let result = b.add_rotamer("VAL", &[180.0], 0, None, false);
            assert!(matches!(result, Err(CatalogError::ConstructionOrder { index: 2, .. })));
        }

        #[test]
        fn parent_must_reference_a_primary() {
            let generator = generator();
            let mut b = RotamerCatalog::builder(&generator);
            b.add_rotamer("VAL", &[60.0], 0, None, false).unwrap();
            let result = b.add_rotamer("VAL", &[70.0], 0, Some(1), false);
            assert!(matches!(
                result,
                Err(CatalogError::ParentOutOfRange { parent: 1, n_primary: 1, .. })
            ));
        }

        #[test]
        fn empty_catalog_cannot_be_built() {
            let generator = generator();
            assert!(matches!(
                RotamerCatalog::builder(&generator).build(),
                Err(CatalogError::Empty)
            ));
        }

        #[test]
        fn add_rotamer_returns_sequential_indices() {
            let generator = generator();
            let mut b = RotamerCatalog::builder(&generator);
            assert_eq!(b.add_rotamer("VAL", &[60.0], 0, None, false).unwrap(), 0);
            assert_eq!(b.add_rotamer("VAL", &[180.0], 0, None, false).unwrap(), 1);
            assert_eq!(b.n_primary_rotamers(), 2);
            assert_eq!(b.len(), 2);
        }
    }

    mod queries {
        use super::*;

        #[test]
        fn bounds_and_child_ranges_follow_insertion_order() {
            let generator = generator();
            let cat = sample_catalog(&generator);
            assert_eq!(cat.len(), 9);
            assert_eq!(cat.n_primary_rotamers(), 5);
            assert_eq!(cat.index_bounds("ALA"), 0..1);
            assert_eq!(cat.index_bounds("LEU"), 1..4);
            assert_eq!(cat.index_bounds("SER"), 4..5);
            assert_eq!(cat.index_bounds("TRP"), 0..0);
            assert_eq!(cat.child_bounds_of_primary(1), 5..7);
            assert_eq!(cat.child_bounds_of_primary(2), 0..0);
            assert_eq!(cat.child_bounds_of_primary(3), 7..8);
            assert_eq!(cat.child_bounds_of_primary(4), 8..9);
        }

        #[test]
        fn every_rotamer_shares_residue_and_chi_count_with_its_parent() {
            let generator = generator();
            let cat = sample_catalog(&generator);
            for i in 0..cat.len() {
                let p = cat.parent(i);
                assert_eq!(cat.resname(i), cat.resname(p));
                assert_eq!(cat.n_chi(i), cat.n_chi(p));
                assert_eq!(cat.is_primary(i), i == p);
            }
        }

        #[test]
        fn primaries_are_never_within_five_degrees() {
            let generator = generator();
            let cat = sample_catalog(&generator);
            for i in 0..cat.n_primary_rotamers() {
                for j in 0..i {
                    if cat.resname(i) != cat.resname(j) || cat.n_chi(i) == 0 {
                        continue;
                    }
                    let all_close = (0..cat.n_chi(i))
                        .all(|k| angular_difference(cat.chi(i, k), cat.chi(j, k)) < 5.0);
                    assert!(!all_close, "{} and {} are duplicates", i, j);
                }
            }
        }

        #[test]
        fn proton_chi_child_groups_with_its_primary() {
            let generator = generator();
            let cat = sample_catalog(&generator);
            assert_eq!(cat.protonchi_parent(8), 4);
            assert_eq!(cat.protonchi_parent(4), 4);
            assert_eq!(cat.protonchi_parent(5), 5);
        }

        #[test]
        fn structural_transform_maps_stub_atoms_onto_parent() {
            let generator = generator();
            let cat = sample_catalog(&generator);
            for irot in 0..cat.len() {
                let isp = cat.structural_parent(irot);
                assert!(isp <= irot);
                if cat.resname(irot) != "LEU" {
                    continue;
                }
                let x = cat.to_structural_parent_frame(irot);
                let n = cat.n_heavy_atoms(irot);
                for k in 1..=3 {
                    let moved: Point3<f64> = x * cat.atom(irot, n - k).position;
                    let target = cat.atom(isp, n - k).position;
                    assert!((moved - target).norm() < 1e-6, "rotamer {} atom {}", irot, n - k);
                }
            }
            assert!(cat.is_structural_primary(1));
            assert_eq!(cat.structural_parent(2), 1);
        }

        #[test]
        fn ala_d_flags_and_hash() {
            let generator = generator();
            let cat = sample_catalog(&generator);
            assert_eq!(cat.ala_rotamer(), Some(0));
            assert!((0..cat.len()).all(|i| !cat.is_d(i)));
            assert_eq!(cat.validation_hash(), sample_catalog(&generator).validation_hash());
            assert_eq!(cat.oneletter(1), "L");
            assert_eq!(cat.chem_atom_data("LEU").unwrap().len(), cat.n_atoms(1));
        }

        #[test]
        fn summary_lists_each_residue_block() {
            let generator = generator();
            let text = sample_catalog(&generator).to_string();
            assert!(text.starts_with("RotamerCatalog: 9 rotamers, 5 primary"));
            assert!(text.contains("    LEU 3 1-3 2 0"));
            assert!(text.contains("    SER 1 4-4 2 1"));
        }
    }

    mod validation_failures {
        use super::*;

        #[test]
        fn duplicate_rotamers_fail_the_build() {
            let generator = generator();
            let mut b = RotamerCatalog::builder(&generator);
            b.add_rotamer("VAL", &[60.0], 0, None, false).unwrap();
            b.add_rotamer("VAL", &[63.0], 0, None, false).unwrap();
            assert!(matches!(b.build(), Err(CatalogError::DuplicateRotamer { .. })));
        }

        #[test]
        fn child_far_from_parent_fails_the_build() {
            let generator = generator();
            let mut b = RotamerCatalog::builder(&generator);
            b.add_rotamer("VAL", &[60.0], 0, None, false).unwrap();
            b.add_rotamer("VAL", &[95.0], 0, Some(0), false).unwrap();
            assert!(matches!(b.build(), Err(CatalogError::ChiDrift { .. })));
        }

        #[test]
        fn child_of_wrong_residue_fails_the_build() {
            let generator = generator();
            let mut b = RotamerCatalog::builder(&generator);
            b.add_rotamer("VAL", &[60.0], 0, None, false).unwrap();
            b.add_rotamer("ILE", &[60.0, 180.0], 0, Some(0), false).unwrap();
            assert!(matches!(b.build(), Err(CatalogError::Validation { .. })));
        }

        #[test]
        fn non_contiguous_primaries_fail_the_build() {
            let generator = generator();
            let mut b = RotamerCatalog::builder(&generator);
            b.add_rotamer("VAL", &[60.0], 0, None, false).unwrap();
            b.add_rotamer("ALA", &[], 0, None, false).unwrap();
            b.add_rotamer("VAL", &[180.0], 0, None, false).unwrap();
            assert!(matches!(b.build(), Err(CatalogError::NonContiguous { .. })));
        }
    }

    #[test]
    fn d_residues_are_flagged() {
        let generator = generator();
        let mut b = RotamerCatalog::builder(&generator);
        b.add_rotamer("VAL", &[60.0], 0, None, false).unwrap();
        b.add_rotamer("DVA", &[-60.0], 0, None, true).unwrap();
        let cat = b.build().unwrap();
        assert!(!cat.is_d(0));
        assert!(cat.is_d(1));
        assert_eq!(cat.ala_rotamer(), None);
    }
}
