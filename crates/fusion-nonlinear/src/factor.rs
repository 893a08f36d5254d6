//! The graph-facing factor trait.

use fusion_core::{Key, Manifold, Ordering, Real, Values};
use fusion_linear::{LinearFactor, LinearFactorError, NoiseModelError};
use thiserror::Error;

/// Errors from factor evaluation and linearization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactorError {
    /// A required key is missing from the values map or the ordering.
    #[error("no entry for key {0}")]
    KeyNotFound(Key),
    /// A linear factor references a slot the ordering does not cover.
    #[error("linear factor references slot {0} outside the ordering")]
    UnknownSlot(usize),
    #[error(transparent)]
    Noise(#[from] NoiseModelError),
    #[error(transparent)]
    Linear(#[from] LinearFactorError),
}

/// Capability every factor exposes to the graph container, so linearized
/// factors mix freely with ordinary nonlinear factors.
pub trait NonlinearFactor<V: Manifold> {
    /// Keys of the variables this factor touches, in block order.
    fn keys(&self) -> &[Key];

    /// Dimension of the factor (residual rows for Jacobian-form factors,
    /// total tangent dimension for information-form factors).
    fn dim(&self) -> usize;

    /// Cost contribution `0.5 * |whitened error|²` at the assignment.
    fn error(&self, values: &Values<V>) -> Result<Real, FactorError>;

    /// Gaussian approximation of the factor around `values`, with variables
    /// reindexed through `ordering`.
    fn linearize(
        &self,
        values: &Values<V>,
        ordering: &Ordering,
    ) -> Result<LinearFactor, FactorError>;
}
