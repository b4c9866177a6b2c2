use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Construction order violated at rotamer {index}: {message}")]
    ConstructionOrder { index: usize, message: String },

    #[error("Parent key {parent} of rotamer {index} does not reference a primary rotamer (only {n_primary} exist)")]
    ParentOutOfRange {
        index: usize,
        parent: usize,
        n_primary: usize,
    },

    #[error("Duplicate rotamers {first} and {second} for {resname}: chi {first_chi:?} vs {second_chi:?}")]
    DuplicateRotamer {
        resname: String,
        first: usize,
        second: usize,
        first_chi: Vec<f32>,
        second_chi: Vec<f32>,
    },

    #[error("Chi {chi} of rotamer {index} ({resname}) is {difference:.2}° from its parent {parent} (limit {limit}°)")]
    ChiDrift {
        resname: String,
        index: usize,
        parent: usize,
        chi: usize,
        difference: f32,
        limit: f32,
    },

    #[error("Catalog validation failed at rotamer {index}: {message}")]
    Validation { index: usize, message: String },

    #[error("Rotamers of '{key}' are not contiguous: index {index} reopens a closed block")]
    NonContiguous { key: String, index: usize },

    #[error("Failed to generate coordinates for {resname} {chi:?}: {message}")]
    Generation {
        resname: String,
        chi: Vec<f32>,
        message: String,
    },

    #[error("Rotamer {index} ({resname}) has no usable side-chain stub from its last three heavy atoms")]
    DegenerateStub { index: usize, resname: String },

    #[error("Catalog I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed catalog data: {0}")]
    Format(String),

    #[error("Catalog data is missing the end-of-index sentinel")]
    MissingSentinel,

    #[error("Cannot build an empty rotamer catalog")]
    Empty,
}
