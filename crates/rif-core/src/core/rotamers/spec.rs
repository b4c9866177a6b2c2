use super::catalog::RotamerCatalog;
use super::error::CatalogError;
use super::generator::RotamerGenerator;
use crate::core::chemistry::naming;
use crate::core::utils::geometry::angle_is_close;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Default chi tolerance (degrees) when matching a conformation to a spec.
pub const DEFAULT_MATCH_TOLERANCE: f32 = 5.0;

/// Construction inputs of one rotamer.
#[derive(Debug, Clone, PartialEq)]
pub struct RotamerSpec {
    pub resname: String,
    pub chi: Vec<f32>,
    pub n_proton_chi: usize,
    pub parent_key: Option<usize>,
}

/// An ordered list of rotamer specs that can be saved as text, edited and
/// replayed into a [`RotamerCatalog`].
///
/// Text format: one rotamer per line, tab separated: residue name, the chi
/// angles, the proton chi count and the parent key (`-1` for primaries).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotamerSpecList {
    specs: Vec<RotamerSpec>,
}

impl RotamerSpecList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn clear(&mut self) {
        self.specs.clear();
    }

    pub fn get(&self, i: usize) -> Option<&RotamerSpec> {
        self.specs.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RotamerSpec> {
        self.specs.iter()
    }

    pub fn add_rotamer(
        &mut self,
        resname: &str,
        chi: &[f32],
        n_proton_chi: usize,
        parent_key: Option<usize>,
    ) -> usize {
        self.specs.push(RotamerSpec {
            resname: resname.to_string(),
            chi: chi.to_vec(),
            n_proton_chi,
            parent_key,
        });
        self.specs.len() - 1
    }

    /// First spec of `resname` whose chis all lie within `tolerance` of `chis`.
    pub fn matching_rotamer(&self, resname: &str, chis: &[f32], tolerance: f32) -> Option<usize> {
        self.specs.iter().position(|spec| {
            spec.resname == resname
                && spec.chi.iter().enumerate().all(|(ichi, &c)| {
                    chis.get(ichi)
                        .is_some_and(|&x| angle_is_close(c, x, tolerance))
                })
        })
    }

    /// Spec parameters for a residue observed at `chis`: one proton chi for
    /// hydroxyl and thiol residues, no parent.
    pub fn rotspec_params(resname: &str, chis: &[f32]) -> RotamerSpec {
        RotamerSpec {
            resname: resname.to_string(),
            chi: chis.to_vec(),
            n_proton_chi: naming::default_proton_chi_count(resname),
            parent_key: None,
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for spec in &self.specs {
            out.push_str(&spec.resname);
            out.push('\t');
            for chi in &spec.chi {
                let _ = write!(out, "{}\t", chi);
            }
            let parent = spec.parent_key.map_or(-1, |p| p as i64);
            let _ = writeln!(out, "{}\t{}\t", spec.n_proton_chi, parent);
        }
        out
    }

    pub fn from_text(text: &str) -> Result<Self, CatalogError> {
        let mut list = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let bad = |what: &str| CatalogError::Format(format!("line {}: {}", lineno + 1, what));
            if fields.len() < 3 {
                return Err(bad("expected residue name, chis, proton chi count and parent key"));
            }
            let parent: i64 = fields[fields.len() - 1]
                .parse()
                .map_err(|_| bad("invalid parent key"))?;
            let n_proton_chi: usize = fields[fields.len() - 2]
                .parse()
                .map_err(|_| bad("invalid proton chi count"))?;
            let chi = fields[1..fields.len() - 2]
                .iter()
                .map(|f| f.parse::<f32>().map_err(|_| bad("invalid chi angle")))
                .collect::<Result<Vec<_>, _>>()?;
            let parent_key = match parent {
                -1 => None,
                p => Some(usize::try_from(p).map_err(|_| bad("invalid parent key"))?),
            };
            list.add_rotamer(fields[0], &chi, n_proton_chi, parent_key);
        }
        Ok(list)
    }

    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        std::fs::write(path, self.to_text()).map_err(|e| CatalogError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_text(&text)
    }

    /// Replays every spec into a new catalog, marking D residues, and builds it.
    pub fn fill_catalog(&self, generator: &dyn RotamerGenerator) -> Result<RotamerCatalog, CatalogError> {
        let mut builder = RotamerCatalog::builder(generator);
        for spec in &self.specs {
            let is_d = naming::is_d_residue(&spec.resname);
            builder.add_rotamer(&spec.resname, &spec.chi, spec.n_proton_chi, spec.parent_key, is_d)?;
        }
        info!(rotamers = self.specs.len(), "Building rotamer catalog from spec list.");
        builder.build()
    }
}
