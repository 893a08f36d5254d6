//! Mathematical type definitions shared across the workspace.

use nalgebra::{DMatrix, DMatrixView, DMatrixViewMut, DVector, DVectorView};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// Dynamically sized column vector with [`Real`] components.
pub type DVec = DVector<Real>;
/// Dynamically sized matrix with [`Real`] entries.
pub type DMat = DMatrix<Real>;
/// Borrowed view over a [`DVec`].
pub type DVecView<'a> = DVectorView<'a, Real>;
/// Borrowed view over a [`DMat`].
pub type DMatView<'a> = DMatrixView<'a, Real>;
/// Mutable borrowed view over a [`DMat`].
pub type DMatViewMut<'a> = DMatrixViewMut<'a, Real>;

/// Largest absolute entrywise difference between two matrices.
///
/// Returns `Real::INFINITY` when the shapes disagree, so a shape mismatch
/// never compares as equal under any tolerance.
pub fn max_abs_diff(a: &DMat, b: &DMat) -> Real {
    if a.shape() != b.shape() {
        return Real::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, Real::max)
}

/// Largest absolute entrywise difference between two vectors.
pub fn max_abs_diff_vec(a: &DVec, b: &DVec) -> Real {
    if a.len() != b.len() {
        return Real::INFINITY;
    }
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, Real::max)
}
