//! Information-form linearized factor.

use super::capture_lin_points;
use crate::factor::{FactorError, NonlinearFactor};
use fusion_core::{max_abs_diff, DMat, DVec, Key, Manifold, Ordering, Real, Values};
use fusion_linear::{HessianFactor, LinearFactor, SymmetricBlockMatrix};
use std::fmt;

/// A factor capturing an information-form quadratic
/// `0.5 (f - 2 xᵀg + xᵀG x)` and the variable values it was linearized
/// around, where `x` is the stacked displacement from those values.
///
/// With `G = AᵀA`, `g = Aᵀb`, `f = bᵀb` this is algebraically identical to
/// the Jacobian form `0.5 |A x - b|²`, and the two representations report
/// the same error for the same underlying linear system.
#[derive(Debug, Clone)]
pub struct LinearizedHessianFactor<V: Manifold> {
    keys: Vec<Key>,
    /// Upper-triangular augmented `[G g; gᵀ f]`, one block row per key plus
    /// the trailing linear/constant block.
    info: SymmetricBlockMatrix,
    lin_points: Values<V>,
}

impl<V: Manifold> LinearizedHessianFactor<V> {
    /// Captures `hessian` (resolving its slots through `ordering`) together
    /// with the linearization values of exactly the resolved keys.
    pub fn from_hessian(
        hessian: &HessianFactor,
        ordering: &Ordering,
        values: &Values<V>,
    ) -> Result<Self, FactorError> {
        let (keys, lin_points) = capture_lin_points(hessian.slots(), ordering, values)?;
        Ok(Self {
            keys,
            info: hessian.info().clone(),
            lin_points,
        })
    }

    /// Keys in block order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Total tangent dimension over all variables.
    pub fn tangent_dim(&self) -> usize {
        self.lin_points.total_dim()
    }

    /// Captured linearization point.
    pub fn lin_points(&self) -> &Values<V> {
        &self.lin_points
    }

    /// Constant term `f`.
    pub fn constant_term(&self) -> Real {
        let n = self.keys.len();
        self.info.block(n, n)[(0, 0)]
    }

    /// Stacked linear term `g`.
    pub fn linear_term(&self) -> DVec {
        let n = self.keys.len();
        let col = self.info.range(0, n, n, n + 1);
        DVec::from_iterator(col.nrows(), col.iter().copied())
    }

    /// Curvature `G` as a dense symmetric matrix.
    pub fn squared_term_full(&self) -> DMat {
        let n = self.keys.len();
        let upper = self.info.range(0, n, 0, n).upper_triangle();
        &upper + upper.transpose() - DMat::from_diagonal(&upper.diagonal())
    }

    /// Stacked displacement from the linearization point to `values`, in
    /// block order.
    pub fn delta(&self, values: &Values<V>) -> Result<DVec, FactorError> {
        let mut dx = DVec::zeros(self.tangent_dim());
        let mut index = 0;
        for &key in &self.keys {
            let new_pt = values.get(key).ok_or(FactorError::KeyNotFound(key))?;
            let lin_pt = self
                .lin_points
                .get(key)
                .ok_or(FactorError::KeyNotFound(key))?;
            let d = lin_pt.local_coordinates(new_pt);
            dx.rows_mut(index, d.len()).copy_from(&d);
            index += d.len();
        }
        Ok(dx)
    }

    /// `0.5 (f - 2 dxᵀg + dxᵀG dx)`. At the linearization point this reduces
    /// to `0.5 f`, the captured residual norm, matching the Jacobian form.
    pub fn error(&self, values: &Values<V>) -> Result<Real, FactorError> {
        let dx = self.delta(values)?;
        let g = self.linear_term();
        let big_g = self.squared_term_full();
        let xtg = dx.dot(&g);
        let xgx = dx.dot(&(&big_g * &dx));
        Ok(0.5 * (self.constant_term() - 2.0 * xtg + xgx))
    }

    /// Re-centers the quadratic at `values`: curvature is unchanged,
    /// `g' = g - G·dx`, `f' = f - 2 dxᵀg + dxᵀG dx`. The result is a fresh
    /// information-form factor over `ordering`'s slots.
    pub fn linearize(
        &self,
        values: &Values<V>,
        ordering: &Ordering,
    ) -> Result<HessianFactor, FactorError> {
        let n = self.keys.len();
        let mut slots = Vec::with_capacity(n);
        for &key in &self.keys {
            slots.push(ordering.slot(key).ok_or(FactorError::KeyNotFound(key))?);
        }

        let dx = self.delta(values)?;
        let g = self.linear_term();
        let big_g = self.squared_term_full();

        let f2 = self.constant_term() - 2.0 * dx.dot(&g) + dx.dot(&(&big_g * &dx));
        let g2 = g - &big_g * &dx;

        let dims: Vec<usize> = (0..n).map(|i| self.info.dim_of(i)).collect();
        let mut gs = Vec::with_capacity(n * (n + 1) / 2);
        for i in 0..n {
            for j in i..n {
                gs.push(self.info.block(i, j).clone_owned());
            }
        }
        let mut g_blocks = Vec::with_capacity(n);
        for i in 0..n {
            let offset = self.info.offset(i);
            g_blocks.push(DVec::from_iterator(
                dims[i],
                g2.rows(offset, dims[i]).iter().copied(),
            ));
        }

        Ok(HessianFactor::new(slots, &dims, &gs, &g_blocks, f2)?)
    }

    /// Approximate equality: same keys, linearization points within `tol`,
    /// information blocks within `tol`.
    pub fn approx_equals(&self, other: &Self, tol: Real) -> bool {
        self.keys == other.keys
            && self.lin_points.approx_eq(&other.lin_points, tol)
            && max_abs_diff(&self.info.symmetric_full(), &other.info.symmetric_full()) <= tol
    }

    /// Prints the factor with a caller-supplied label. Diagnostics only.
    pub fn print(&self, label: &str) {
        println!("{label}{self}");
    }
}

impl<V: Manifold> NonlinearFactor<V> for LinearizedHessianFactor<V> {
    fn keys(&self) -> &[Key] {
        &self.keys
    }

    fn dim(&self) -> usize {
        self.tangent_dim()
    }

    fn error(&self, values: &Values<V>) -> Result<Real, FactorError> {
        LinearizedHessianFactor::error(self, values)
    }

    fn linearize(
        &self,
        values: &Values<V>,
        ordering: &Ordering,
    ) -> Result<LinearFactor, FactorError> {
        LinearizedHessianFactor::linearize(self, values, ordering).map(LinearFactor::Hessian)
    }
}

impl<V: Manifold> fmt::Display for LinearizedHessianFactor<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinearizedHessianFactor keys:")?;
        for key in &self.keys {
            write!(f, " {key}")?;
        }
        write!(f, "\nG:{}", self.squared_term_full())?;
        write!(f, "\ng:{}", self.linear_term())?;
        write!(f, "\nf: {}", self.constant_term())?;
        write!(f, "\nlinearization point:\n{}", self.lin_points)
    }
}
