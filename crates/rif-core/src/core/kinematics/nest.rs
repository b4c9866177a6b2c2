use nalgebra::{Isometry3, Vector3};
use serde::Deserialize;

/// Degrees of freedom of a rigid body: three translations and the three
/// components of a rotation vector.
pub const NEST_DIMS: usize = 6;

/// Children of one nest cell: one bisection per degree of freedom.
pub const NEST_DIMPOW2: u64 = 1 << NEST_DIMS;

/// Bounds and coarse grid of a [`RigidBodyNest`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NestBounds {
    /// Lower corner of the translation box, in Angstroms.
    pub translation_lower: [f64; 3],
    pub translation_upper: [f64; 3],
    /// Half-width of the rotation-vector box, in degrees.
    pub rotation_extent: f64,
    /// Cells per degree of freedom at the coarsest resolution.
    pub coarse_cells: [u64; NEST_DIMS],
}

/// A recursively bisected grid over rigid-body poses.
///
/// A cell index at resolution `r` holds the coarse cell in its high bits and
/// one group of [`NEST_DIMS`] bits per finer level below it, so the children
/// of cell `i` are `i * 64 + j` for `j` in `0..64`, bit `d` of `j` choosing
/// the upper half along dimension `d`.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBodyNest {
    lower: [f64; NEST_DIMS],
    upper: [f64; NEST_DIMS],
    coarse_cells: [u64; NEST_DIMS],
}

impl RigidBodyNest {
    pub fn new(bounds: &NestBounds) -> Option<Self> {
        let rot = bounds.rotation_extent.to_radians();
        let t0 = bounds.translation_lower;
        let t1 = bounds.translation_upper;
        let lower = [t0[0], t0[1], t0[2], -rot, -rot, -rot];
        let upper = [t1[0], t1[1], t1[2], rot, rot, rot];
        let valid = lower
            .iter()
            .zip(&upper)
            .all(|(lo, hi)| lo.is_finite() && hi.is_finite() && lo < hi)
            && bounds.coarse_cells.iter().all(|&n| n > 0);
        valid.then_some(Self {
            lower,
            upper,
            coarse_cells: bounds.coarse_cells,
        })
    }

    pub fn coarse_size(&self) -> u64 {
        self.coarse_cells.iter().product()
    }

    /// Number of cells at resolution `resl`.
    pub fn size(&self, resl: usize) -> u64 {
        self.coarse_size()
            .saturating_mul(NEST_DIMPOW2.saturating_pow(resl as u32))
    }

    /// Cells along each degree of freedom at resolution `resl`.
    pub fn cells_per_dim(&self, resl: usize) -> [u64; NEST_DIMS] {
        self.coarse_cells.map(|n| n << resl)
    }

    /// Integer cell coordinates of `index` at resolution `resl`.
    pub fn cell_coords(&self, index: u64, resl: usize) -> Option<[u64; NEST_DIMS]> {
        if NEST_DIMS * resl >= u64::BITS as usize || index >= self.size(resl) {
            return None;
        }
        let mut coarse = index >> (NEST_DIMS * resl);
        let mut coords = [0u64; NEST_DIMS];
        for (coord, &n) in coords.iter_mut().zip(&self.coarse_cells) {
            *coord = coarse % n;
            coarse /= n;
        }
        for level in 0..resl {
            let shift = NEST_DIMS * (resl - 1 - level);
            let group = (index >> shift) & (NEST_DIMPOW2 - 1);
            for (d, coord) in coords.iter_mut().enumerate() {
                *coord = (*coord << 1) | ((group >> d) & 1);
            }
        }
        Some(coords)
    }

    /// Centre of cell `index` at resolution `resl`, per degree of freedom.
    pub fn cell_center(&self, index: u64, resl: usize) -> Option<[f64; NEST_DIMS]> {
        let coords = self.cell_coords(index, resl)?;
        let cells = self.cells_per_dim(resl);
        let mut center = [0.0; NEST_DIMS];
        for d in 0..NEST_DIMS {
            let width = (self.upper[d] - self.lower[d]) / cells[d] as f64;
            center[d] = self.lower[d] + (coords[d] as f64 + 0.5) * width;
        }
        Some(center)
    }

    /// Rigid-body pose at the centre of cell `index`.
    pub fn pose(&self, index: u64, resl: usize) -> Option<Isometry3<f64>> {
        let c = self.cell_center(index, resl)?;
        Some(Isometry3::new(
            Vector3::new(c[0], c[1], c[2]),
            Vector3::new(c[3], c[4], c[5]),
        ))
    }

    fn half_diagonal(&self, resl: usize, dims: std::ops::Range<usize>) -> f64 {
        let cells = self.cells_per_dim(resl);
        dims.map(|d| {
            let w = (self.upper[d] - self.lower[d]) / cells[d] as f64;
            w * w
        })
        .sum::<f64>()
        .sqrt()
            / 2.0
    }

    /// Half the diagonal of a translation cell at resolution `resl`; no point
    /// of a cell is further than this from its centre along translation.
    pub fn translation_radius(&self, resl: usize) -> f64 {
        self.half_diagonal(resl, 0..3)
    }

    /// Half the diagonal of a rotation-vector cell at resolution `resl`, in
    /// radians.
    pub fn rotation_radius(&self, resl: usize) -> f64 {
        self.half_diagonal(resl, 3..NEST_DIMS)
    }
}
