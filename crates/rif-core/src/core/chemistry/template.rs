use crate::core::models::atom::{AtomData, AtomRole};
use nalgebra::Point3;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const BUILTIN_TEMPLATES: &str = include_str!("../../../data/residue_templates.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawTemplateAtom {
    name: String,
    atom_type: i32,
    #[serde(default)]
    role: AtomRole,
    #[serde(default = "default_heavy")]
    heavy: bool,
    position: Option<[f64; 3]>,
    bonded: Option<String>,
    angle_ref: Option<String>,
    torsion_ref: Option<String>,
    bond_length: Option<f64>,
    bond_angle: Option<f64>,
    dihedral: Option<f64>,
    chi: Option<usize>,
}

fn default_heavy() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPolarSite {
    atom: String,
    base: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResidueTemplate {
    atoms: Vec<RawTemplateAtom>,
    #[serde(default)]
    donors: Vec<RawPolarSite>,
    #[serde(default)]
    acceptors: Vec<RawPolarSite>,
}

/// How a template atom is positioned.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomPlacement {
    /// Fixed coordinates in the local backbone frame.
    Fixed(Point3<f64>),
    /// Internal coordinates relative to three earlier atoms. When `chi` is set
    /// the chi value is added to `dihedral`.
    Internal {
        bonded: usize,
        angle_ref: usize,
        torsion_ref: usize,
        bond_length: f64,
        bond_angle: f64,
        dihedral: f64,
        chi: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateAtom {
    pub data: AtomData,
    pub placement: AtomPlacement,
}

/// A hydrogen-bonding atom and the atom its ray points away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolarSite {
    pub atom: usize,
    pub base: usize,
}

/// Chemistry of one residue type: ordered atoms (heavy atoms first), chi
/// count and polar sites.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidueTemplate {
    pub name: String,
    pub atoms: Vec<TemplateAtom>,
    pub donors: Vec<PolarSite>,
    pub acceptors: Vec<PolarSite>,
    pub n_chi: usize,
    pub n_heavy_atoms: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    registry: HashMap<String, ResidueTemplate>,
}

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Duplicate atom '{atom}' in template '{residue}'")]
    DuplicateAtom { residue: String, atom: String },
    #[error("Atom '{atom}' in template '{residue}' references unknown or later atom '{reference}'")]
    UnknownReference {
        residue: String,
        atom: String,
        reference: String,
    },
    #[error("Atom '{atom}' in template '{residue}' needs either a position or a full set of internal coordinates")]
    IncompletePlacement { residue: String, atom: String },
    #[error("Heavy atom '{atom}' in template '{residue}' follows a hydrogen; heavy atoms must come first")]
    HeavyAtomAfterHydrogen { residue: String, atom: String },
    #[error("Chi index 0 on atom '{atom}' in template '{residue}'; chi indices start at 1")]
    InvalidChi { residue: String, atom: String },
}

impl TemplateRegistry {
    pub fn load(path: &Path) -> Result<Self, TemplateLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplateLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    /// Templates shipped with the library (a handful of common amino acids).
    pub fn builtin() -> Result<Self, TemplateLoadError> {
        Self::parse(BUILTIN_TEMPLATES, "<builtin>")
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TemplateLoadError> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self, TemplateLoadError> {
        let raw: HashMap<String, RawResidueTemplate> =
            toml::from_str(content).map_err(|e| TemplateLoadError::Toml {
                path: origin.to_string(),
                source: e,
            })?;
        let mut registry = HashMap::with_capacity(raw.len());
        for (name, raw_template) in raw {
            let template = resolve_template(&name, raw_template)?;
            registry.insert(name, template);
        }
        Ok(Self { registry })
    }

    pub fn get(&self, residue_name: &str) -> Option<&ResidueTemplate> {
        self.registry.get(residue_name)
    }

    pub fn insert(&mut self, template: ResidueTemplate) {
        self.registry.insert(template.name.clone(), template);
    }

    pub fn residue_names(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }
}

fn resolve_template(
    name: &str,
    raw: RawResidueTemplate,
) -> Result<ResidueTemplate, TemplateLoadError> {
    let mut index_of: HashMap<String, usize> = HashMap::with_capacity(raw.atoms.len());
    let mut atoms = Vec::with_capacity(raw.atoms.len());
    let mut seen_hydrogen = false;
    let mut n_chi = 0;

    for raw_atom in raw.atoms {
        if index_of.contains_key(&raw_atom.name) {
            return Err(TemplateLoadError::DuplicateAtom {
                residue: name.to_string(),
                atom: raw_atom.name,
            });
        }
        if raw_atom.heavy && seen_hydrogen {
            return Err(TemplateLoadError::HeavyAtomAfterHydrogen {
                residue: name.to_string(),
                atom: raw_atom.name,
            });
        }
        seen_hydrogen |= !raw_atom.heavy;

        let lookup = |reference: &Option<String>| -> Result<usize, TemplateLoadError> {
            let reference = reference.as_ref().ok_or_else(|| TemplateLoadError::IncompletePlacement {
                residue: name.to_string(),
                atom: raw_atom.name.clone(),
            })?;
            index_of
                .get(reference)
                .copied()
                .ok_or_else(|| TemplateLoadError::UnknownReference {
                    residue: name.to_string(),
                    atom: raw_atom.name.clone(),
                    reference: reference.clone(),
                })
        };

        let placement = match raw_atom.position {
            Some(p) => AtomPlacement::Fixed(Point3::from(p)),
            None => {
                let incomplete = || TemplateLoadError::IncompletePlacement {
                    residue: name.to_string(),
                    atom: raw_atom.name.clone(),
                };
                let chi = match raw_atom.chi {
                    Some(0) => {
                        return Err(TemplateLoadError::InvalidChi {
                            residue: name.to_string(),
                            atom: raw_atom.name.clone(),
                        });
                    }
                    Some(c) => {
                        n_chi = n_chi.max(c);
                        Some(c - 1)
                    }
                    None => None,
                };
                AtomPlacement::Internal {
                    bonded: lookup(&raw_atom.bonded)?,
                    angle_ref: lookup(&raw_atom.angle_ref)?,
                    torsion_ref: lookup(&raw_atom.torsion_ref)?,
                    bond_length: raw_atom.bond_length.ok_or_else(incomplete)?,
                    bond_angle: raw_atom.bond_angle.ok_or_else(incomplete)?,
                    dihedral: raw_atom.dihedral.ok_or_else(incomplete)?,
                    chi,
                }
            }
        };

        index_of.insert(raw_atom.name.clone(), atoms.len());
        atoms.push(TemplateAtom {
            data: AtomData {
                name: raw_atom.name,
                atom_type: raw_atom.atom_type,
                role: raw_atom.role,
                heavy: raw_atom.heavy,
            },
            placement,
        });
    }

    let resolve_sites = |sites: Vec<RawPolarSite>| -> Result<Vec<PolarSite>, TemplateLoadError> {
        sites
            .into_iter()
            .map(|site| -> Result<PolarSite, TemplateLoadError> {
                let find = |atom_name: &str| {
                    index_of
                        .get(atom_name)
                        .copied()
                        .ok_or_else(|| TemplateLoadError::UnknownReference {
                            residue: name.to_string(),
                            atom: site.atom.clone(),
                            reference: atom_name.to_string(),
                        })
                };
                Ok(PolarSite {
                    atom: find(&site.atom)?,
                    base: find(&site.base)?,
                })
            })
            .collect()
    };
    let donors = resolve_sites(raw.donors)?;
    let acceptors = resolve_sites(raw.acceptors)?;
    let n_heavy_atoms = atoms.iter().filter(|a| a.data.heavy).count();

    Ok(ResidueTemplate {
        name: name.to_string(),
        atoms,
        donors,
        acceptors,
        n_chi,
        n_heavy_atoms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINI: &str = r#"
[SER]
atoms = [
    { name = "N", atom-type = 18, role = "backbone", position = [-0.53, 1.36, 0.0] },
    { name = "CA", atom-type = 19, role = "backbone", position = [0.0, 0.0, 0.0] },
    { name = "C", atom-type = 20, role = "backbone", position = [1.52, 0.0, 0.0] },
    { name = "CB", atom-type = 4, bonded = "CA", angle-ref = "N", torsion-ref = "C", bond-length = 1.53, bond-angle = 110.5, dihedral = -122.5 },
    { name = "OG", atom-type = 13, bonded = "CB", angle-ref = "CA", torsion-ref = "N", bond-length = 1.42, bond-angle = 111.0, dihedral = 0.0, chi = 1 },
    { name = "HG", atom-type = 25, heavy = false, bonded = "OG", angle-ref = "CB", torsion-ref = "CA", bond-length = 0.96, bond-angle = 109.5, dihedral = 0.0, chi = 2 },
]
donors = [{ atom = "HG", base = "OG" }]
acceptors = [{ atom = "OG", base = "CB" }]
"#;

    #[test]
    fn parses_template_and_resolves_references() {
        let registry = TemplateRegistry::from_toml_str(MINI).unwrap();
        let ser = registry.get("SER").unwrap();
        assert_eq!(ser.atoms.len(), 6);
        assert_eq!(ser.n_chi, 2);
        assert_eq!(ser.n_heavy_atoms, 5);
        assert_eq!(ser.donors, vec![PolarSite { atom: 5, base: 4 }]);
        assert_eq!(ser.atoms[0].data.role, AtomRole::Backbone);
        assert_eq!(ser.atoms[3].data.role, AtomRole::Sidechain);
        match &ser.atoms[4].placement {
            AtomPlacement::Internal { bonded, chi, .. } => {
                assert_eq!(*bonded, 3);
                assert_eq!(*chi, Some(0));
            }
            other => panic!("unexpected placement {:?}", other),
        }
    }

    #[test]
    fn load_reads_templates_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", MINI).unwrap();

        let registry = TemplateRegistry::load(&path).unwrap();
        assert!(registry.get("SER").is_some());
        assert!(registry.get("ALA").is_none());
    }

    #[test]
    fn load_fails_for_missing_file() {
        let result = TemplateRegistry::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(TemplateLoadError::Io { .. })));
    }

    #[test]
    fn rejects_forward_references() {
        let content = r#"
[BAD]
atoms = [
    { name = "A", atom-type = 1, position = [0.0, 0.0, 0.0] },
    { name = "B", atom-type = 1, bonded = "C", angle-ref = "A", torsion-ref = "A", bond-length = 1.0, bond-angle = 109.5, dihedral = 0.0 },
    { name = "C", atom-type = 1, position = [1.0, 0.0, 0.0] },
]
"#;
        let result = TemplateRegistry::from_toml_str(content);
        assert!(
            matches!(result, Err(TemplateLoadError::UnknownReference { reference, .. }) if reference == "C")
        );
    }

    #[test]
    fn rejects_heavy_atom_after_hydrogen() {
        let content = r#"
[BAD]
atoms = [
    { name = "H", atom-type = 25, heavy = false, position = [0.0, 0.0, 0.0] },
    { name = "C", atom-type = 1, position = [1.0, 0.0, 0.0] },
]
"#;
        let result = TemplateRegistry::from_toml_str(content);
        assert!(matches!(
            result,
            Err(TemplateLoadError::HeavyAtomAfterHydrogen { .. })
        ));
    }

    #[test]
    fn rejects_incomplete_internal_coordinates() {
        let content = r#"
[BAD]
atoms = [
    { name = "A", atom-type = 1, position = [0.0, 0.0, 0.0] },
    { name = "B", atom-type = 1, bonded = "A", bond-length = 1.0 },
]
"#;
        let result = TemplateRegistry::from_toml_str(content);
        assert!(matches!(
            result,
            Err(TemplateLoadError::IncompletePlacement { .. })
        ));
    }

    #[test]
    fn builtin_templates_parse() {
        let registry = TemplateRegistry::builtin().unwrap();
        for name in ["ALA", "SER", "VAL", "LEU", "ILE", "LYS"] {
            let template = registry.get(name).unwrap();
            assert!(template.n_heavy_atoms >= 3, "{} has too few heavy atoms", name);
        }
        assert_eq!(registry.get("LEU").unwrap().n_chi, 2);
        assert_eq!(registry.get("LYS").unwrap().n_chi, 4);
    }
}
