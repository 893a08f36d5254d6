//! Slot-indexed linear factors.
//!
//! These are the exchange types between the nonlinear layer and the
//! elimination/marginalization subsystem: a Jacobian-form factor
//! `|A x - b|²` under a noise model, and an information-form (Hessian)
//! factor `0.5 (f - 2 xᵀg + xᵀG x)`. Variables are addressed by the
//! contiguous integer slots of an ordering, not by graph keys.

use crate::block::{SymmetricBlockMatrix, VerticalBlockMatrix};
use crate::noise_model::{NoiseModelError, SharedNoiseModel};
use fusion_core::{DMat, DMatView, DVec, Real};
use thiserror::Error;

/// Errors from linear-factor construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinearFactorError {
    /// A Jacobian block's row count disagrees with the residual length.
    #[error("jacobian block for slot {slot} has {rows} rows, residual has {expected}")]
    RowMismatch {
        slot: usize,
        rows: usize,
        expected: usize,
    },
    /// The noise model dimension disagrees with the residual length.
    #[error("noise model dimension {model} does not match residual length {expected}")]
    NoiseDimMismatch { model: usize, expected: usize },
    /// The information blocks do not form a consistent upper triangle.
    #[error("expected {expected} upper-triangular blocks for {n} variables, got {got}")]
    BadTriangle { n: usize, expected: usize, got: usize },
    /// A curvature/linear block has the wrong shape for its slot pair.
    #[error("information block ({i},{j}) has shape {rows}x{cols}, expected {er}x{ec}")]
    BadBlockShape {
        i: usize,
        j: usize,
        rows: usize,
        cols: usize,
        er: usize,
        ec: usize,
    },
}

/// Jacobian-form linear factor: per-slot blocks `A_k`, residual `b`, and
/// the noise model still to be applied.
#[derive(Debug, Clone)]
pub struct JacobianFactor {
    slots: Vec<usize>,
    ab: VerticalBlockMatrix,
    noise: SharedNoiseModel,
}

impl JacobianFactor {
    /// Builds a factor from `(slot, A_k)` terms, the residual `b`, and a
    /// noise model of matching dimension.
    pub fn new(
        terms: Vec<(usize, DMat)>,
        b: &DVec,
        noise: SharedNoiseModel,
    ) -> Result<Self, LinearFactorError> {
        let rows = b.len();
        if noise.dim() != rows {
            return Err(LinearFactorError::NoiseDimMismatch {
                model: noise.dim(),
                expected: rows,
            });
        }
        let mut slots = Vec::with_capacity(terms.len());
        let mut dims = Vec::with_capacity(terms.len());
        for (slot, a) in &terms {
            if a.nrows() != rows {
                return Err(LinearFactorError::RowMismatch {
                    slot: *slot,
                    rows: a.nrows(),
                    expected: rows,
                });
            }
            slots.push(*slot);
            dims.push(a.ncols());
        }

        let mut ab = VerticalBlockMatrix::from_dims(&dims, rows);
        for (i, (_, a)) in terms.iter().enumerate() {
            ab.block_mut(i).copy_from(a);
        }
        let rhs = ab.n_blocks() - 1;
        ab.block_mut(rhs).copy_from(b);

        Ok(Self { slots, ab, noise })
    }

    /// Variable slots, in block order.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Residual dimension (rows of every block).
    pub fn rows(&self) -> usize {
        self.ab.rows()
    }

    /// Jacobian block for the `i`-th variable.
    pub fn a(&self, i: usize) -> DMatView<'_> {
        assert!(i < self.slots.len(), "variable index {i} out of range");
        self.ab.block(i)
    }

    /// Residual column.
    pub fn b(&self) -> DVec {
        let col = self.ab.block(self.slots.len());
        DVec::from_iterator(col.nrows(), col.iter().copied())
    }

    /// Column widths of the variable blocks.
    pub fn dims(&self) -> Vec<usize> {
        (0..self.slots.len()).map(|i| self.ab.dim_of(i)).collect()
    }

    /// The factor's noise model.
    pub fn noise(&self) -> &SharedNoiseModel {
        &self.noise
    }

    /// The augmented matrix `[A | b]` with the noise model baked in.
    ///
    /// Fails for constrained noise models, whose Jacobian whitening is
    /// undefined.
    pub fn whitened_augmented(&self) -> Result<DMat, NoiseModelError> {
        // b is whitened by the same linear transform as the columns of A,
        // so the whole augmented matrix goes through Whiten at once.
        self.noise.whiten_matrix(self.ab.full())
    }
}

/// Information-form (Hessian) linear factor storing the upper-triangular
/// blocks of `[G g; gᵀ f]`.
#[derive(Debug, Clone)]
pub struct HessianFactor {
    slots: Vec<usize>,
    info: SymmetricBlockMatrix,
}

impl HessianFactor {
    /// Builds a factor from upper-triangular curvature blocks `G_ij`
    /// (row-major over `i <= j`), linear terms `g_k`, and constant `f`.
    pub fn new(
        slots: Vec<usize>,
        dims: &[usize],
        gs: &[DMat],
        g: &[DVec],
        f: Real,
    ) -> Result<Self, LinearFactorError> {
        let n = dims.len();
        assert_eq!(slots.len(), n, "one dimension per slot required");
        let expected = n * (n + 1) / 2;
        if gs.len() != expected || g.len() != n {
            return Err(LinearFactorError::BadTriangle {
                n,
                expected,
                got: gs.len(),
            });
        }

        let mut info = SymmetricBlockMatrix::from_dims(dims);
        let mut idx = 0;
        for i in 0..n {
            for j in i..n {
                let block = &gs[idx];
                idx += 1;
                if block.nrows() != dims[i] || block.ncols() != dims[j] {
                    return Err(LinearFactorError::BadBlockShape {
                        i,
                        j,
                        rows: block.nrows(),
                        cols: block.ncols(),
                        er: dims[i],
                        ec: dims[j],
                    });
                }
                info.block_mut(i, j).copy_from(block);
            }
            if g[i].len() != dims[i] {
                return Err(LinearFactorError::BadBlockShape {
                    i,
                    j: n,
                    rows: g[i].len(),
                    cols: 1,
                    er: dims[i],
                    ec: 1,
                });
            }
            info.block_mut(i, n).copy_from(&g[i]);
        }
        info.block_mut(n, n)[(0, 0)] = f;

        Ok(Self { slots, info })
    }

    /// Variable slots, in block order.
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Per-variable dimensions.
    pub fn dims(&self) -> Vec<usize> {
        (0..self.slots.len()).map(|i| self.info.dim_of(i)).collect()
    }

    /// The underlying augmented block layout.
    pub fn info(&self) -> &SymmetricBlockMatrix {
        &self.info
    }

    /// Constant term `f`.
    pub fn constant_term(&self) -> Real {
        let n = self.slots.len();
        self.info.block(n, n)[(0, 0)]
    }

    /// Stacked linear term `g`.
    pub fn linear_term(&self) -> DVec {
        let n = self.slots.len();
        let col = self.info.range(0, n, n, n + 1);
        DVec::from_iterator(col.nrows(), col.iter().copied())
    }

    /// Curvature `G` as a dense symmetric matrix.
    pub fn squared_term_full(&self) -> DMat {
        let n = self.slots.len();
        let upper = self.info.range(0, n, 0, n).upper_triangle();
        &upper + upper.transpose() - DMat::from_diagonal(&upper.diagonal())
    }
}

/// Polymorphic output of `NonlinearFactor::linearize`.
#[derive(Debug, Clone)]
pub enum LinearFactor {
    Jacobian(JacobianFactor),
    Hessian(HessianFactor),
}

impl LinearFactor {
    /// Variable slots of either representation.
    pub fn slots(&self) -> &[usize] {
        match self {
            LinearFactor::Jacobian(f) => f.slots(),
            LinearFactor::Hessian(f) => f.slots(),
        }
    }
}
