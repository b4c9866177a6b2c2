//! Rigid-body poses for docking: the hierarchical pose grid searched by the
//! engine, a scene of rigid bodies to place, and a probe-matching score.

pub mod nest;
pub mod probe;
pub mod scene;
