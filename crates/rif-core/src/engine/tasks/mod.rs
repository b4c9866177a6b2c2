//! Post-search tasks over result lists.
//!
//! Filters trim a sorted result list ahead of an expensive pass; refinement
//! hands each point to an external [`refine::Refiner`] and re-sorts.

pub mod filter;
pub mod refine;
