//! Factors that wrap a previously computed Gaussian factor.
//!
//! Variable elimination and marginalization produce linear factors indexed
//! by ordering slots. Capturing such a factor together with the variable
//! values it was linearized around turns it back into a first-class
//! nonlinear factor: it can report its cost at a new assignment and be
//! re-linearized there, with the displacement from the capture point
//! supplied by each variable's manifold chart.

mod hessian;
mod jacobian;

pub use hessian::LinearizedHessianFactor;
pub use jacobian::LinearizedJacobianFactor;

use crate::factor::FactorError;
use fusion_core::{Key, Manifold, Ordering, Values};

/// Resolves a linear factor's slots to graph keys and captures the
/// linearization value for each one.
///
/// A slot the ordering does not cover is a fatal construction error
/// ([`FactorError::UnknownSlot`]), as is a key with no recorded value
/// ([`FactorError::KeyNotFound`]).
fn capture_lin_points<V: Manifold>(
    slots: &[usize],
    ordering: &Ordering,
    values: &Values<V>,
) -> Result<(Vec<Key>, Values<V>), FactorError> {
    let mut keys = Vec::with_capacity(slots.len());
    let mut lin_points = Values::new();
    for &slot in slots {
        let key = ordering.key(slot).ok_or(FactorError::UnknownSlot(slot))?;
        let value = values
            .get(key)
            .cloned()
            .ok_or(FactorError::KeyNotFound(key))?;
        keys.push(key);
        lin_points.insert(key, value);
    }
    Ok((keys, lin_points))
}
