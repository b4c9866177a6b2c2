use super::error::CatalogError;
use super::rotamer::RotamerGeometry;
use crate::core::chemistry::naming;
use crate::core::chemistry::template::{
    AtomPlacement, PolarSite, ResidueTemplate, TemplateLoadError, TemplateRegistry,
};
use crate::core::models::atom::{HBondRay, RotamerAtom};
use crate::core::utils::geometry::{mirror_z, place_atom};
use nalgebra::Point3;

/// Produces atom coordinates for a residue at given chi angles.
///
/// The catalog calls this once per added rotamer; implementations must be
/// deterministic so that a reloaded catalog reproduces the same geometry.
pub trait RotamerGenerator: Send + Sync {
    fn generate(
        &self,
        resname: &str,
        chi: &[f32],
        is_d_variant: bool,
    ) -> Result<RotamerGeometry, CatalogError>;
}

/// Builds rotamers from internal-coordinate residue templates.
///
/// D residues are looked up through their L equivalent, built with negated
/// chis and reflected through the backbone plane.
#[derive(Debug, Clone)]
pub struct TemplateRotamerGenerator {
    templates: TemplateRegistry,
}

impl TemplateRotamerGenerator {
    pub fn new(templates: TemplateRegistry) -> Self {
        Self { templates }
    }

    pub fn builtin() -> Result<Self, TemplateLoadError> {
        Ok(Self::new(TemplateRegistry::builtin()?))
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }
}

impl RotamerGenerator for TemplateRotamerGenerator {
    fn generate(
        &self,
        resname: &str,
        chi: &[f32],
        is_d_variant: bool,
    ) -> Result<RotamerGeometry, CatalogError> {
        let fail = |message: String| CatalogError::Generation {
            resname: resname.to_string(),
            chi: chi.to_vec(),
            message,
        };

        let template_name = if is_d_variant {
            naming::l_equivalent(resname).unwrap_or(resname)
        } else {
            resname
        };
        let template = self
            .templates
            .get(template_name)
            .ok_or_else(|| fail(format!("no chemistry template named '{}'", template_name)))?;
        if template.n_chi != chi.len() {
            return Err(fail(format!(
                "template expects {} chi angles, got {}",
                template.n_chi,
                chi.len()
            )));
        }

        let chi_sign = if is_d_variant { -1.0 } else { 1.0 };
        let mut positions = place_template_atoms(template, chi, chi_sign).map_err(fail)?;
        if is_d_variant {
            positions.iter_mut().for_each(|p| *p = mirror_z(p));
        }

        let rays = |sites: &[PolarSite]| -> Result<Vec<HBondRay>, CatalogError> {
            sites
                .iter()
                .map(|site| {
                    HBondRay::from_atoms(&positions[site.atom], &positions[site.base]).ok_or_else(|| {
                        fail(format!(
                            "polar atom '{}' coincides with its base",
                            template.atoms[site.atom].data.name
                        ))
                    })
                })
                .collect()
        };
        let donors = rays(&template.donors)?;
        let acceptors = rays(&template.acceptors)?;

        let atoms = template
            .atoms
            .iter()
            .zip(positions.iter())
            .map(|(atom, position)| RotamerAtom::new(atom.data.clone(), *position))
            .collect();

        Ok(RotamerGeometry {
            atoms,
            donors,
            acceptors,
        })
    }
}

fn place_template_atoms(
    template: &ResidueTemplate,
    chi: &[f32],
    chi_sign: f64,
) -> Result<Vec<Point3<f64>>, String> {
    let mut positions: Vec<Point3<f64>> = Vec::with_capacity(template.atoms.len());
    for atom in &template.atoms {
        let position = match &atom.placement {
            AtomPlacement::Fixed(p) => *p,
            AtomPlacement::Internal {
                bonded,
                angle_ref,
                torsion_ref,
                bond_length,
                bond_angle,
                dihedral,
                chi: chi_index,
            } => {
                let offset = chi_index.map_or(0.0, |c| chi_sign * f64::from(chi[c]));
                place_atom(
                    &positions[*bonded],
                    &positions[*angle_ref],
                    &positions[*torsion_ref],
                    *bond_length,
                    *bond_angle,
                    dihedral + offset,
                )
                .ok_or_else(|| format!("degenerate reference atoms for '{}'", atom.data.name))?
            }
        };
        positions.push(position);
    }
    Ok(positions)
}
