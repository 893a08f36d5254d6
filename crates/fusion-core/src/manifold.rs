//! The manifold seam between variable value types and factors.

use crate::math::{max_abs_diff_vec, DVec, Real};
use std::fmt;

/// Capability every variable value type must provide to the factor layer.
///
/// `local_coordinates` and `retract` are exact inverses of each other on a
/// common chart:
/// `a.retract(&a.local_coordinates(&b)) == b` and
/// `a.local_coordinates(&a.retract(&d)) == d`.
pub trait Manifold: Clone + fmt::Debug {
    /// Tangent-space dimension of the value.
    fn dim(&self) -> usize;

    /// Finite tangent-space displacement from `self` to `other`.
    ///
    /// Both values must lie in the same connected chart; in particular the
    /// dimensions must agree.
    fn local_coordinates(&self, other: &Self) -> DVec;

    /// Moves `self` along the tangent vector `delta`.
    fn retract(&self, delta: &DVec) -> Self;

    /// Approximate equality within an absolute tolerance.
    fn approx_eq(&self, other: &Self, tol: Real) -> bool;
}

/// A plain Euclidean variable: local coordinates are vector subtraction.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorValue(pub DVec);

impl VectorValue {
    /// Builds a value from raw components.
    pub fn from_slice(v: &[Real]) -> Self {
        Self(DVec::from_row_slice(v))
    }
}

impl From<DVec> for VectorValue {
    fn from(v: DVec) -> Self {
        Self(v)
    }
}

impl Manifold for VectorValue {
    fn dim(&self) -> usize {
        self.0.len()
    }

    fn local_coordinates(&self, other: &Self) -> DVec {
        assert_eq!(
            self.0.len(),
            other.0.len(),
            "local_coordinates between vectors of different dimension"
        );
        &other.0 - &self.0
    }

    fn retract(&self, delta: &DVec) -> Self {
        assert_eq!(
            self.0.len(),
            delta.len(),
            "retract delta of different dimension"
        );
        Self(&self.0 + delta)
    }

    fn approx_eq(&self, other: &Self, tol: Real) -> bool {
        max_abs_diff_vec(&self.0, &other.0) <= tol
    }
}
