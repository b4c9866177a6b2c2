//! # Core Models Module
//!
//! Plain data shared by the catalog and the search engine.
//!
//! - [`index`] - Scaffold tree positions, hierarchical sample indices and scored points
//! - [`atom`] - Typed rotamer atoms and hydrogen-bond rays
//!
//! ```ignore
//! use rifdock::core::models::index::{BigIndex, TreeIndex};
//!
//! let coarse = BigIndex::new(3, TreeIndex::new(1, 0));
//! let child = coarse.child(64, 5);
//! assert_eq!(child.parent(64), coarse);
//! ```

pub mod atom;
pub mod index;
