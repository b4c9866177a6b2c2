//! # Workflows Module
//!
//! End-to-end procedures built from the engine and the core models.
//!
//! - **Docking Workflow** ([`dock`]) - Hierarchical search of a rigid-body nest
//!   for poses that bring probe points onto their targets, followed by optional
//!   filtering and refinement passes.
//! - **Reference Collaborators** ([`reference`]) - The director, objective and
//!   refiner the docking workflow plugs into the engine.

pub mod dock;
pub mod reference;
