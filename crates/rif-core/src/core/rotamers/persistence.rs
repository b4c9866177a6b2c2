//! Binary catalog format.
//!
//! Little endian: a `u64` rotamer count, then per rotamer a `u8` name length
//! and the name bytes, a `u8` chi count and that many `f32` chis, an `i32`
//! proton chi count and an `i32` parent index (`-1` for primaries). The
//! stream ends with the ASCII marker `rot_index_end`. Only the construction
//! inputs are stored; loading replays them through the builder.

use super::catalog::RotamerCatalog;
use super::error::CatalogError;
use super::generator::RotamerGenerator;
use crate::core::chemistry::naming;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;
use tracing::info;

pub const END_SENTINEL: &[u8] = b"rot_index_end";

fn io_error(path: &str) -> impl FnOnce(std::io::Error) -> CatalogError + '_ {
    move |source| CatalogError::Io {
        path: path.to_string(),
        source,
    }
}

fn read_bytes<const N: usize, R: Read>(reader: &mut R, what: &str) -> Result<[u8; N], CatalogError> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => CatalogError::Format(format!("truncated while reading {}", what)),
        _ => CatalogError::Io {
            path: "<stream>".to_string(),
            source: e,
        },
    })?;
    Ok(buf)
}

impl RotamerCatalog {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CatalogError> {
        let io = io_error("<stream>");
        let mut out = Vec::new();
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for irot in 0..self.len() {
            let name = self.resname(irot).as_bytes();
            let name_len = u8::try_from(name.len())
                .map_err(|_| CatalogError::Format(format!("residue name of rotamer {} is too long", irot)))?;
            out.push(name_len);
            out.extend_from_slice(name);

            let chis = self.chis(irot);
            let n_chi = u8::try_from(chis.len())
                .map_err(|_| CatalogError::Format(format!("rotamer {} has too many chis", irot)))?;
            out.push(n_chi);
            for chi in chis {
                out.extend_from_slice(&chi.to_le_bytes());
            }

            out.extend_from_slice(&(self.n_proton_chi(irot) as i32).to_le_bytes());
            let parent = self.parent(irot);
            let parent = if parent == irot { -1 } else { parent as i32 };
            out.extend_from_slice(&parent.to_le_bytes());
        }
        out.extend_from_slice(END_SENTINEL);
        writer.write_all(&out).map_err(io)
    }

    /// Replays a saved catalog through the builder and rebuilds every
    /// derived table.
    pub fn read_from<R: Read>(
        reader: &mut R,
        generator: &dyn RotamerGenerator,
    ) -> Result<Self, CatalogError> {
        let count = u64::from_le_bytes(read_bytes::<8, _>(reader, "rotamer count")?);
        let mut builder = RotamerCatalog::builder(generator);

        for irot in 0..count {
            let [name_len] = read_bytes::<1, _>(reader, "residue name length")?;
            let mut name = vec![0u8; usize::from(name_len)];
            reader.read_exact(&mut name).map_err(|_| {
                CatalogError::Format(format!("truncated residue name of rotamer {}", irot))
            })?;
            let resname = String::from_utf8(name)
                .map_err(|_| CatalogError::Format(format!("residue name of rotamer {} is not UTF-8", irot)))?;

            let [n_chi] = read_bytes::<1, _>(reader, "chi count")?;
            let chis = (0..n_chi)
                .map(|_| read_bytes::<4, _>(reader, "chi angle").map(f32::from_le_bytes))
                .collect::<Result<Vec<_>, _>>()?;

            let n_proton_chi = i32::from_le_bytes(read_bytes::<4, _>(reader, "proton chi count")?);
            let n_proton_chi = usize::try_from(n_proton_chi).map_err(|_| {
                CatalogError::Format(format!("negative proton chi count for rotamer {}", irot))
            })?;

            let parent = i32::from_le_bytes(read_bytes::<4, _>(reader, "parent index")?);
            let parent_key = match parent {
                -1 => None,
                p => Some(usize::try_from(p).map_err(|_| {
                    CatalogError::Format(format!("invalid parent {} for rotamer {}", p, irot))
                })?),
            };

            let is_d = naming::is_d_residue(&resname);
            builder.add_rotamer(&resname, &chis, n_proton_chi, parent_key, is_d)?;
        }

        let mut sentinel = [0u8; END_SENTINEL.len()];
        match reader.read_exact(&mut sentinel) {
            Ok(()) if sentinel == END_SENTINEL => {}
            _ => return Err(CatalogError::MissingSentinel),
        }

        builder.build()
    }

    pub fn save(&self, path: &Path) -> Result<(), CatalogError> {
        let shown = path.to_string_lossy();
        let file = File::create(path).map_err(io_error(&shown))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush().map_err(io_error(&shown))?;
        info!(path = %shown, rotamers = self.len(), "Saved rotamer catalog.");
        Ok(())
    }

    pub fn load(path: &Path, generator: &dyn RotamerGenerator) -> Result<Self, CatalogError> {
        let shown = path.to_string_lossy();
        let file = File::open(path).map_err(io_error(&shown))?;
        let catalog = Self::read_from(&mut BufReader::new(file), generator)?;
        info!(path = %shown, rotamers = catalog.len(), "Loaded rotamer catalog.");
        Ok(catalog)
    }
}
