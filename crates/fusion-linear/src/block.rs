//! Block layouts over a single owned backing matrix.
//!
//! A linear factor over several variables stores one contiguous matrix and
//! partitions it into per-variable blocks plus a trailing residual/constant
//! block. The layouts here hand out `nalgebra` views into that buffer, so
//! block access never copies and the buffer never reallocates after
//! construction. Rebinding to a new backing matrix is an explicit exchange.
//!
//! Block boundaries are fixed at construction; out-of-range indices and
//! inconsistent boundaries are programmer errors and panic.

use fusion_core::{DMat, DMatView, DMatViewMut};

/// Turns a list of block widths (plus the trailing unit-width block) into
/// cumulative offsets spanning `total`.
fn offsets_from_dims(dims: &[usize], total: usize) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(dims.len() + 1);
    let mut acc = 0;
    offsets.push(0);
    for &d in dims {
        assert!(d > 0, "block width must be positive");
        acc += d;
        offsets.push(acc);
    }
    assert_eq!(
        acc, total,
        "block widths sum to {acc} but the backing matrix spans {total}"
    );
    offsets
}

/// Column-partitioned layout `[A_0 | A_1 | ... | b]` over one owned matrix.
///
/// Every block spans all rows; block `n_blocks() - 1` is the trailing
/// residual column.
#[derive(Debug, Clone, PartialEq)]
pub struct VerticalBlockMatrix {
    matrix: DMat,
    offsets: Vec<usize>,
}

impl VerticalBlockMatrix {
    /// Zero-filled layout with the given per-variable widths, a trailing
    /// width-1 residual block, and `rows` rows.
    pub fn from_dims(dims: &[usize], rows: usize) -> Self {
        let total: usize = dims.iter().sum::<usize>() + 1;
        let mut with_rhs = dims.to_vec();
        with_rhs.push(1);
        Self {
            offsets: offsets_from_dims(&with_rhs, total),
            matrix: DMat::zeros(rows, total),
        }
    }

    /// Binds an existing dense matrix without copying. `dims` are the
    /// per-variable widths; the final column is the residual block.
    pub fn bind(matrix: DMat, dims: &[usize]) -> Self {
        let mut with_rhs = dims.to_vec();
        with_rhs.push(1);
        Self {
            offsets: offsets_from_dims(&with_rhs, matrix.ncols()),
            matrix,
        }
    }

    /// Atomically exchanges the backing matrix and boundary list.
    pub fn rebind(&mut self, matrix: DMat, dims: &[usize]) {
        *self = Self::bind(matrix, dims);
    }

    /// Number of blocks, counting the trailing residual block.
    pub fn n_blocks(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.matrix.nrows()
    }

    /// Column width of block `i`.
    pub fn dim_of(&self, i: usize) -> usize {
        assert!(i < self.n_blocks(), "block index {i} out of range");
        self.offsets[i + 1] - self.offsets[i]
    }

    /// View of block `i`.
    pub fn block(&self, i: usize) -> DMatView<'_> {
        assert!(i < self.n_blocks(), "block index {i} out of range");
        let (lo, hi) = (self.offsets[i], self.offsets[i + 1]);
        self.matrix.view((0, lo), (self.matrix.nrows(), hi - lo))
    }

    /// Mutable view of block `i`.
    pub fn block_mut(&mut self, i: usize) -> DMatViewMut<'_> {
        assert!(i < self.n_blocks(), "block index {i} out of range");
        let (lo, hi) = (self.offsets[i], self.offsets[i + 1]);
        let rows = self.matrix.nrows();
        self.matrix.view_mut((0, lo), (rows, hi - lo))
    }

    /// Contiguous view covering blocks `i..j`.
    pub fn range(&self, i: usize, j: usize) -> DMatView<'_> {
        assert!(
            i <= j && j <= self.n_blocks(),
            "block range {i}..{j} out of range"
        );
        let (lo, hi) = (self.offsets[i], self.offsets[j]);
        self.matrix.view((0, lo), (self.matrix.nrows(), hi - lo))
    }

    /// The whole backing matrix.
    pub fn full(&self) -> &DMat {
        &self.matrix
    }
}

/// Symmetric layout over a square matrix with identical row and column
/// partitions: curvature blocks `G_ij`, a trailing linear/constant block.
///
/// Only the upper triangle (`i <= j`) is authoritative; callers that need
/// the full matrix use [`SymmetricBlockMatrix::symmetric_full`].
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetricBlockMatrix {
    matrix: DMat,
    offsets: Vec<usize>,
}

impl SymmetricBlockMatrix {
    /// Zero-filled layout with the given per-variable dims plus a trailing
    /// width-1 constant block.
    pub fn from_dims(dims: &[usize]) -> Self {
        let total: usize = dims.iter().sum::<usize>() + 1;
        let mut with_rhs = dims.to_vec();
        with_rhs.push(1);
        Self {
            offsets: offsets_from_dims(&with_rhs, total),
            matrix: DMat::zeros(total, total),
        }
    }

    /// Binds an existing square matrix without copying.
    pub fn bind(matrix: DMat, dims: &[usize]) -> Self {
        assert_eq!(
            matrix.nrows(),
            matrix.ncols(),
            "symmetric block layout needs a square matrix"
        );
        let mut with_rhs = dims.to_vec();
        with_rhs.push(1);
        Self {
            offsets: offsets_from_dims(&with_rhs, matrix.ncols()),
            matrix,
        }
    }

    /// Number of blocks along each axis, counting the trailing block.
    pub fn n_blocks(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Scalar offset of block row/column `i`.
    pub fn offset(&self, i: usize) -> usize {
        assert!(i < self.offsets.len(), "block index {i} out of range");
        self.offsets[i]
    }

    /// Dimension of block row/column `i`.
    pub fn dim_of(&self, i: usize) -> usize {
        assert!(i < self.n_blocks(), "block index {i} out of range");
        self.offsets[i + 1] - self.offsets[i]
    }

    /// View of block `(i, j)`; callers keep to the upper triangle.
    pub fn block(&self, i: usize, j: usize) -> DMatView<'_> {
        let n = self.n_blocks();
        assert!(i < n && j < n, "block index ({i},{j}) out of range");
        self.matrix.view(
            (self.offsets[i], self.offsets[j]),
            (self.dim_of(i), self.dim_of(j)),
        )
    }

    /// Mutable view of block `(i, j)`.
    pub fn block_mut(&mut self, i: usize, j: usize) -> DMatViewMut<'_> {
        let n = self.n_blocks();
        assert!(i < n && j < n, "block index ({i},{j}) out of range");
        let start = (self.offsets[i], self.offsets[j]);
        let shape = (self.dim_of(i), self.dim_of(j));
        self.matrix.view_mut(start, shape)
    }

    /// Contiguous view covering block rows `i0..i1` and columns `j0..j1`.
    pub fn range(&self, i0: usize, i1: usize, j0: usize, j1: usize) -> DMatView<'_> {
        let n = self.n_blocks();
        assert!(
            i0 <= i1 && i1 <= n && j0 <= j1 && j1 <= n,
            "block range ({i0}..{i1}, {j0}..{j1}) out of range"
        );
        self.matrix.view(
            (self.offsets[i0], self.offsets[j0]),
            (
                self.offsets[i1] - self.offsets[i0],
                self.offsets[j1] - self.offsets[j0],
            ),
        )
    }

    /// The raw upper-triangular backing matrix.
    pub fn full(&self) -> &DMat {
        &self.matrix
    }

    /// Materializes the symmetric matrix from its upper-triangular storage.
    pub fn symmetric_full(&self) -> DMat {
        let upper = self.matrix.upper_triangle();
        &upper + upper.transpose() - DMat::from_diagonal(&upper.diagonal())
    }
}
