//! # Rotamers Module
//!
//! The rotamer catalog: a flattened, validated database of discrete
//! side-chain conformations consulted by scoring objectives.
//!
//! Primary (coarse) rotamers occupy a contiguous prefix, followed by one
//! contiguous block of finer child rotamers per primary. Derived groupings
//! (residue bounds, child ranges, proton-chi and structural parents, frame
//! transforms) are computed once by [`catalog::RotamerCatalogBuilder::build`]
//! and are read-only afterwards.
//!
//! ```ignore
//! use rifdock::core::rotamers::{catalog::RotamerCatalog, generator::TemplateRotamerGenerator};
//!
//! let generator = TemplateRotamerGenerator::builtin()?;
//! let mut builder = RotamerCatalog::builder(&generator);
//! let leu = builder.add_rotamer("LEU", &[-60.0, 180.0], 0, None, false)?;
//! builder.add_rotamer("LEU", &[-70.0, 180.0], 0, Some(leu), false)?;
//! let catalog = builder.build()?;
//! assert_eq!(catalog.child_bounds_of_primary(leu), 1..2);
//! ```

pub mod catalog;
pub mod error;
pub mod generator;
pub mod passes;
pub mod persistence;
pub mod rotamer;
pub mod spec;
pub mod validation;
