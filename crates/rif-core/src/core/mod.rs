//! # Core Module
//!
//! The stateless foundation of rifdock: index and atom models, residue
//! chemistry, the rotamer catalog, rigid-body kinematics and shared math.
//!
//! ## Architecture
//!
//! - **Models** ([`models`]) - Search indices, scored points and typed atoms
//! - **Chemistry** ([`chemistry`]) - Residue naming tables and residue templates
//! - **Rotamers** ([`rotamers`]) - Rotamer construction and the validated rotamer catalog
//! - **Kinematics** ([`kinematics`]) - The rigid-body pose grid, scenes and probe scoring
//! - **Utilities** ([`utils`]) - Angle and frame geometry, count formatting

pub mod chemistry;
pub mod kinematics;
pub mod models;
pub mod rotamers;
pub mod utils;
