//! Jacobian-form linearized factor.

use super::capture_lin_points;
use crate::factor::{FactorError, NonlinearFactor};
use fusion_core::{max_abs_diff, DMatView, DVec, Key, Manifold, Ordering, Real, Values};
use fusion_linear::{
    JacobianFactor, LinearFactor, NoiseModel, VerticalBlockMatrix,
};
use std::fmt;

/// A factor capturing a whitened Jacobian-form linear factor `[A | b]` and
/// the variable values it was linearized around.
///
/// The stored blocks already have the source factor's noise model baked in,
/// so re-linearization tags its output with the identity ([`NoiseModel::unit`])
/// model and applies no further whitening.
#[derive(Debug, Clone)]
pub struct LinearizedJacobianFactor<V: Manifold> {
    keys: Vec<Key>,
    /// Whitened `[A_0 | ... | b]`, one block per key plus the residual.
    ab: VerticalBlockMatrix,
    lin_points: Values<V>,
}

impl<V: Manifold> LinearizedJacobianFactor<V> {
    /// Captures `jacobian` (resolving its slots through `ordering`) together
    /// with the linearization values of exactly the resolved keys.
    pub fn from_jacobian(
        jacobian: &JacobianFactor,
        ordering: &Ordering,
        values: &Values<V>,
    ) -> Result<Self, FactorError> {
        let (keys, lin_points) = capture_lin_points(jacobian.slots(), ordering, values)?;
        let whitened = jacobian.whitened_augmented()?;
        let ab = VerticalBlockMatrix::bind(whitened, &jacobian.dims());
        log::debug!(
            "captured jacobian factor: {} keys, {} residual rows",
            keys.len(),
            ab.rows()
        );
        Ok(Self {
            keys,
            ab,
            lin_points,
        })
    }

    /// Keys in block order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Residual dimension.
    pub fn rows(&self) -> usize {
        self.ab.rows()
    }

    /// Captured linearization point.
    pub fn lin_points(&self) -> &Values<V> {
        &self.lin_points
    }

    /// Whitened Jacobian block for `key`, if the factor touches it.
    pub fn a(&self, key: Key) -> Option<DMatView<'_>> {
        self.keys
            .iter()
            .position(|&k| k == key)
            .map(|i| self.ab.block(i))
    }

    /// Whitened residual column `b`.
    pub fn b(&self) -> DVec {
        let col = self.ab.block(self.keys.len());
        DVec::from_iterator(col.nrows(), col.iter().copied())
    }

    /// The linear error `-b + Σ_k A_k · localCoordinates(lin_k, values_k)`.
    pub fn error_vector(&self, values: &Values<V>) -> Result<DVec, FactorError> {
        let mut e = -self.b();
        for (i, &key) in self.keys.iter().enumerate() {
            let new_pt = values.get(key).ok_or(FactorError::KeyNotFound(key))?;
            let lin_pt = self
                .lin_points
                .get(key)
                .ok_or(FactorError::KeyNotFound(key))?;
            let d = lin_pt.local_coordinates(new_pt);
            e += self.ab.block(i) * &d;
        }
        Ok(e)
    }

    /// `0.5 · |error_vector|²`. At the linearization point the displacement
    /// vanishes and the cost is `0.5 |b|²`, the residual recorded at capture.
    pub fn error(&self, values: &Values<V>) -> Result<Real, FactorError> {
        Ok(0.5 * self.error_vector(values)?.norm_squared())
    }

    /// Repackages the stored blocks around `values` as a fresh linear
    /// factor under `ordering`, tagged with the identity noise model.
    pub fn linearize(
        &self,
        values: &Values<V>,
        ordering: &Ordering,
    ) -> Result<JacobianFactor, FactorError> {
        let mut terms = Vec::with_capacity(self.keys.len());
        for (i, &key) in self.keys.iter().enumerate() {
            let slot = ordering.slot(key).ok_or(FactorError::KeyNotFound(key))?;
            terms.push((slot, self.ab.block(i).clone_owned()));
        }
        let b = -self.error_vector(values)?;
        Ok(JacobianFactor::new(terms, &b, NoiseModel::unit(self.rows()))?)
    }

    /// Approximate equality: same keys, linearization points within `tol`,
    /// stored blocks within `tol`.
    pub fn approx_equals(&self, other: &Self, tol: Real) -> bool {
        self.keys == other.keys
            && self.lin_points.approx_eq(&other.lin_points, tol)
            && max_abs_diff(self.ab.full(), other.ab.full()) <= tol
    }

    /// Prints the factor with a caller-supplied label. Diagnostics only.
    pub fn print(&self, label: &str) {
        println!("{label}{self}");
    }
}

impl<V: Manifold> NonlinearFactor<V> for LinearizedJacobianFactor<V> {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn dim(&self) -> usize {
        self.rows()
    }

    fn error(&self, values: &Values<V>) -> Result<Real, FactorError> {
        LinearizedJacobianFactor::error(self, values)
    }

    fn linearize(
        &self,
        values: &Values<V>,
        ordering: &Ordering,
    ) -> Result<LinearFactor, FactorError> {
        LinearizedJacobianFactor::linearize(self, values, ordering).map(LinearFactor::Jacobian)
    }
}

impl<V: Manifold> fmt::Display for LinearizedJacobianFactor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinearizedJacobianFactor keys:")?;
        for key in &self.keys {
            write!(f, " {key}")?;
        }
        for (i, key) in self.keys.iter().enumerate() {
            write!(f, "\nA[{key}]:{}", self.ab.block(i))?;
        }
        write!(f, "\nb:{}", self.b())?;
        write!(f, "\nlinearization point:\n{}", self.lin_points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusion_core::{DMat, VectorValue};

    fn scenario() -> (JacobianFactor, Ordering, Values<VectorValue>) {
        let a0 = DMat::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let a1 = DMat::from_row_slice(2, 1, &[1.0, -1.0]);
        let b = DVec::from_row_slice(&[2.0, 4.0]);
        let jacobian =
            JacobianFactor::new(vec![(0, a0), (1, a1)], &b, NoiseModel::unit(2)).unwrap();
        let ordering = Ordering::from_keys([Key(1), Key(2)]);
        let mut values = Values::new();
        values.insert(Key(1), VectorValue::from_slice(&[0.5, -0.5]));
        values.insert(Key(2), VectorValue::from_slice(&[1.0]));
        (jacobian, ordering, values)
    }

    #[test]
    fn error_at_the_linearization_point_is_the_captured_residual() {
        let (jacobian, ordering, values) = scenario();
        let factor = LinearizedJacobianFactor::from_jacobian(&jacobian, &ordering, &values).unwrap();
        // zero displacement leaves e = -b, so the cost is 0.5 |b|^2
        assert_eq!(factor.error(&values).unwrap(), 0.5 * 20.0);
    }

    #[test]
    fn zero_residual_capture_has_exactly_zero_error() {
        let a0 = DMat::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let b = DVec::zeros(2);
        let jacobian = JacobianFactor::new(vec![(0, a0)], &b, NoiseModel::unit(2)).unwrap();
        let ordering = Ordering::from_keys([Key(1)]);
        let mut values = Values::new();
        values.insert(Key(1), VectorValue::from_slice(&[0.5, -0.5]));
        let factor = LinearizedJacobianFactor::from_jacobian(&jacobian, &ordering, &values).unwrap();
        assert_eq!(factor.error(&values).unwrap(), 0.0);
    }

    #[test]
    fn error_matches_manual_computation() {
        let (jacobian, ordering, values) = scenario();
        let factor = LinearizedJacobianFactor::from_jacobian(&jacobian, &ordering, &values).unwrap();

        let mut moved = values.clone();
        moved.insert(Key(1), VectorValue::from_slice(&[1.5, -0.5])); // d0 = [1, 0]
        moved.insert(Key(2), VectorValue::from_slice(&[3.0])); // d1 = [2]

        // e = -b + A0 d0 + A1 d1 = [-2, -4] + [2, 0] + [2, -2] = [2, -6]
        let e = factor.error_vector(&moved).unwrap();
        assert_eq!(e, DVec::from_row_slice(&[2.0, -6.0]));
        assert_eq!(factor.error(&moved).unwrap(), 0.5 * 40.0);
    }

    #[test]
    fn construction_whitens_with_the_source_noise_model() {
        let a0 = DMat::from_row_slice(2, 1, &[2.0, 8.0]);
        let b = DVec::from_row_slice(&[2.0, 4.0]);
        let noise = NoiseModel::sigmas(DVec::from_row_slice(&[2.0, 4.0])).unwrap();
        let jacobian = JacobianFactor::new(vec![(0, a0)], &b, noise).unwrap();
        let ordering = Ordering::from_keys([Key(7)]);
        let mut values = Values::new();
        values.insert(Key(7), VectorValue::from_slice(&[0.0]));

        let factor = LinearizedJacobianFactor::from_jacobian(&jacobian, &ordering, &values).unwrap();
        let a = factor.a(Key(7)).unwrap().clone_owned();
        assert_eq!(a, DMat::from_row_slice(2, 1, &[1.0, 2.0]));
        assert_eq!(factor.b(), DVec::from_row_slice(&[1.0, 1.0]));
        assert!(factor.a(Key(8)).is_none());
    }

    #[test]
    fn linearize_repackages_with_unit_noise() {
        let (jacobian, ordering, values) = scenario();
        let factor = LinearizedJacobianFactor::from_jacobian(&jacobian, &ordering, &values).unwrap();

        let mut moved = values.clone();
        moved.insert(Key(2), VectorValue::from_slice(&[2.0])); // d1 = [1]

        // relinearize under a permuted ordering
        let new_ordering = Ordering::from_keys([Key(2), Key(1)]);
        let relinearized = factor.linearize(&moved, &new_ordering).unwrap();
        assert!(relinearized.noise().is_unit());
        assert_eq!(relinearized.slots(), &[1, 0]);

        // b' = -e = b - A1 d1
        let e = factor.error_vector(&moved).unwrap();
        assert_eq!(relinearized.b(), -e);
    }

    #[test]
    fn missing_values_are_reported() {
        let (jacobian, ordering, values) = scenario();
        let factor = LinearizedJacobianFactor::from_jacobian(&jacobian, &ordering, &values).unwrap();
        let mut partial = Values::new();
        partial.insert(Key(1), VectorValue::from_slice(&[0.5, -0.5]));
        assert_eq!(
            factor.error(&partial).unwrap_err(),
            FactorError::KeyNotFound(Key(2))
        );
        let empty_ordering = Ordering::default();
        assert_eq!(
            factor.linearize(&values, &empty_ordering).unwrap_err(),
            FactorError::KeyNotFound(Key(1))
        );
    }

    #[test]
    fn approx_equals_compares_blocks_and_points() {
        let (jacobian, ordering, values) = scenario();
        let a = LinearizedJacobianFactor::from_jacobian(&jacobian, &ordering, &values).unwrap();
        let b = LinearizedJacobianFactor::from_jacobian(&jacobian, &ordering, &values).unwrap();
        assert!(a.approx_equals(&b, 1e-12));

        let mut other_values = values.clone();
        other_values.insert(Key(2), VectorValue::from_slice(&[1.5]));
        let c =
            LinearizedJacobianFactor::from_jacobian(&jacobian, &ordering, &other_values).unwrap();
        assert!(!a.approx_equals(&c, 1e-12));
    }
}
