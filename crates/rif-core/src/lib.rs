//! # rifdock Core Library
//!
//! Hierarchical rigid-body docking search over a validated rotamer catalog.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers throughout:
//!
//! - **[`core`]: The Foundation.** Stateless data: search indices, residue
//!   chemistry templates, the `RotamerCatalog` with its derived groupings,
//!   rigid-body kinematics and geometry helpers.
//!
//! - **[`engine`]: The Logic Core.** The multi-resolution beam search. It
//!   scores samples in parallel through caller-supplied `Director` and
//!   `Objective` collaborators, keeps a beam of the best, expands the
//!   survivors and sorts the final stage. Post-search filter and refinement
//!   tasks live here too.
//!
//! - **[`workflows`]: The Public API.** Ready-made runs that wire the engine
//!   to concrete collaborators, such as probe-based docking.

pub mod core;
pub mod engine;
pub mod workflows;
