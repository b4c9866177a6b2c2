//! Residue chemistry: naming tables and the internal-coordinate templates
//! used to build rotamer coordinates.

pub mod naming;
pub mod template;
