//! Gaussian noise models: whitening transforms and Mahalanobis costs.
//!
//! A noise model converts a raw measurement residual with covariance `Σ`
//! into a whitened residual whose Euclidean norm is the statistically
//! correct cost: `|whiten(v)|² == vᵀ Σ⁻¹ v`. The hierarchy refines from a
//! full square-root-information matrix down to the identity:
//! Gaussian → Diagonal → {Constrained, Isotropic} → Unit.
//!
//! Models are immutable value objects shared read-only by many factors via
//! [`SharedNoiseModel`]. The set of kinds is closed, so the hierarchy is a
//! tagged enum dispatched per call rather than an open class tree.

use fusion_core::{max_abs_diff, max_abs_diff_vec, DMat, DVec, Real};
use nalgebra::Cholesky;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Reference-counted, immutable handle to a noise model.
pub type SharedNoiseModel = Arc<NoiseModel>;

/// Errors produced by noise-model construction and Jacobian whitening.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoiseModelError {
    /// Covariance/information matrix is not symmetric positive-definite.
    #[error("matrix is not symmetric positive-definite")]
    Decomposition,
    /// A square-root information matrix passed in directly is singular.
    #[error("square-root information matrix is singular")]
    SingularSqrtInformation,
    /// A non-constrained model was given a sigma that is not finite and
    /// strictly positive.
    #[error("sigma must be finite and strictly positive")]
    InvalidSigma,
    /// A constrained model was given a negative sigma.
    #[error("constrained sigma must be non-negative")]
    NegativeSigma,
    /// Jacobian whitening is undefined under a singular information matrix.
    #[error("cannot whiten a Jacobian under a constrained noise model")]
    UnsupportedOperation,
    /// A covariance/information matrix was not square.
    #[error("expected a square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
}

/// A Gaussian noise model, in one of five refinements.
///
/// Every variant implements the same operation set; the refinements exist
/// so the common cases (diagonal, scalar, identity) cost O(d) or O(1)
/// instead of a dense matrix product.
#[derive(Debug, Clone)]
pub enum NoiseModel {
    /// Full model `|R v|²` with `RᵀR = Σ⁻¹`; `R` upper-triangular and
    /// non-singular (`r_inv` is fixed at construction so `unwhiten` never
    /// fails).
    Gaussian { r: DMat, r_inv: DMat },
    /// Diagonal covariance, stored as standard deviations and their
    /// reciprocals. All sigmas are finite and strictly positive.
    Diagonal { sigmas: DVec, invsigmas: DVec },
    /// Diagonal model allowing `σᵢ = 0`: an exact constraint on component
    /// `i`. `invsigmas` holds `0` at constrained entries; the constraint
    /// logic lives in [`NoiseModel::whiten`].
    Constrained { sigmas: DVec, invsigmas: DVec },
    /// All sigmas equal; whitening is a scalar multiply.
    Isotropic {
        dim: usize,
        sigma: Real,
        invsigma: Real,
    },
    /// Identity transform: the "already whitened" sentinel.
    Unit { dim: usize },
}

/// Upper-triangular `R` with `RᵀR = M`, for symmetric positive-definite `M`.
fn upper_triangular_sqrt(m: &DMat) -> Result<DMat, NoiseModelError> {
    ensure_square(m)?;
    if max_abs_diff(m, &m.transpose()) > 1e-9 {
        return Err(NoiseModelError::Decomposition);
    }
    match Cholesky::new(m.clone()) {
        Some(chol) => Ok(chol.l().transpose()),
        None => Err(NoiseModelError::Decomposition),
    }
}

fn ensure_square(m: &DMat) -> Result<(), NoiseModelError> {
    if m.nrows() != m.ncols() {
        return Err(NoiseModelError::NotSquare {
            rows: m.nrows(),
            cols: m.ncols(),
        });
    }
    Ok(())
}

fn ensure_positive_sigmas(sigmas: &DVec) -> Result<(), NoiseModelError> {
    if sigmas.iter().all(|&s| s.is_finite() && s > 0.0) {
        Ok(())
    } else {
        Err(NoiseModelError::InvalidSigma)
    }
}

impl NoiseModel {
    // ---- factories -------------------------------------------------------

    /// Full Gaussian model from an upper-triangular square-root-information
    /// matrix `R` (stored as given). Fails if `R` is singular.
    pub fn sqrt_information(r: DMat) -> Result<SharedNoiseModel, NoiseModelError> {
        ensure_square(&r)?;
        let r_inv = r
            .clone()
            .try_inverse()
            .ok_or(NoiseModelError::SingularSqrtInformation)?;
        Ok(Arc::new(NoiseModel::Gaussian { r, r_inv }))
    }

    /// Full Gaussian model from a covariance matrix: `R = chol(Σ⁻¹)ᵀ`.
    ///
    /// Fails unless `Σ` is symmetric positive-definite; there is no
    /// fallback to an approximate model.
    pub fn covariance(sigma: &DMat) -> Result<SharedNoiseModel, NoiseModelError> {
        ensure_square(sigma)?;
        if max_abs_diff(sigma, &sigma.transpose()) > 1e-9 {
            return Err(NoiseModelError::Decomposition);
        }
        let chol = match Cholesky::new(sigma.clone()) {
            Some(chol) => chol,
            None => {
                log::debug!(
                    "covariance factorization failed for a {}x{} matrix",
                    sigma.nrows(),
                    sigma.ncols()
                );
                return Err(NoiseModelError::Decomposition);
            }
        };
        // The computed inverse can pick up a tiny asymmetry; resymmetrize
        // before the second factorization.
        let info = chol.inverse();
        let info = (&info + info.transpose()) * 0.5;
        let r = upper_triangular_sqrt(&info)?;
        Self::sqrt_information(r)
    }

    /// Full Gaussian model from an information matrix: `R = chol(Q)ᵀ`.
    pub fn information(q: &DMat) -> Result<SharedNoiseModel, NoiseModelError> {
        let r = upper_triangular_sqrt(q)?;
        Self::sqrt_information(r)
    }

    /// Diagonal model from standard deviations; every sigma must be finite
    /// and strictly positive.
    pub fn sigmas(sigmas: DVec) -> Result<SharedNoiseModel, NoiseModelError> {
        ensure_positive_sigmas(&sigmas)?;
        let invsigmas = sigmas.map(|s| 1.0 / s);
        Ok(Arc::new(NoiseModel::Diagonal { sigmas, invsigmas }))
    }

    /// Diagonal model from variances (`σ = sqrt(v)`).
    pub fn variances(variances: &DVec) -> Result<SharedNoiseModel, NoiseModelError> {
        Self::sigmas(variances.map(Real::sqrt))
    }

    /// Diagonal model from precisions (`σ = sqrt(1/p)`).
    pub fn precisions(precisions: &DVec) -> Result<SharedNoiseModel, NoiseModelError> {
        Self::variances(&precisions.map(|p| 1.0 / p))
    }

    /// Constrained model: sigmas may be zero, denoting exact constraints on
    /// those residual components.
    pub fn constrained(sigmas: DVec) -> Result<SharedNoiseModel, NoiseModelError> {
        if sigmas.iter().any(|&s| !s.is_finite() || s < 0.0) {
            return Err(NoiseModelError::NegativeSigma);
        }
        let invsigmas = sigmas.map(|s| if s > 0.0 { 1.0 / s } else { 0.0 });
        Ok(Arc::new(NoiseModel::Constrained { sigmas, invsigmas }))
    }

    /// Fully constrained model of the given dimension (all sigmas zero).
    pub fn all_constrained(dim: usize) -> SharedNoiseModel {
        Arc::new(NoiseModel::Constrained {
            sigmas: DVec::zeros(dim),
            invsigmas: DVec::zeros(dim),
        })
    }

    /// Isotropic model with a single standard deviation.
    pub fn isotropic(dim: usize, sigma: Real) -> Result<SharedNoiseModel, NoiseModelError> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(NoiseModelError::InvalidSigma);
        }
        Ok(Arc::new(NoiseModel::Isotropic {
            dim,
            sigma,
            invsigma: 1.0 / sigma,
        }))
    }

    /// Isotropic model from a variance (`σ = sqrt(v)`).
    pub fn isotropic_variance(dim: usize, variance: Real) -> Result<SharedNoiseModel, NoiseModelError> {
        Self::isotropic(dim, variance.sqrt())
    }

    /// Isotropic model from a precision (`σ = sqrt(1/p)`).
    pub fn isotropic_precision(dim: usize, precision: Real) -> Result<SharedNoiseModel, NoiseModelError> {
        Self::isotropic_variance(dim, 1.0 / precision)
    }

    /// Unit model: identity whitening on `dim` components.
    pub fn unit(dim: usize) -> SharedNoiseModel {
        Arc::new(NoiseModel::Unit { dim })
    }

    // ---- operations ------------------------------------------------------

    /// Residual dimension of the model.
    pub fn dim(&self) -> usize {
        match self {
            NoiseModel::Gaussian { r, .. } => r.nrows(),
            NoiseModel::Diagonal { sigmas, .. } => sigmas.len(),
            NoiseModel::Constrained { sigmas, .. } => sigmas.len(),
            NoiseModel::Isotropic { dim, .. } => *dim,
            NoiseModel::Unit { dim } => *dim,
        }
    }

    /// Whitens a raw residual so that `|whiten(v)|² == mahalanobis(v)`.
    ///
    /// For a constrained model, a component with `σᵢ = 0` whitens to `0`
    /// when the residual component is exactly zero and to `+∞` otherwise
    /// ("constraint violated").
    pub fn whiten(&self, v: &DVec) -> DVec {
        debug_assert_eq!(v.len(), self.dim(), "residual dimension mismatch");
        match self {
            NoiseModel::Gaussian { r, .. } => r * v,
            NoiseModel::Diagonal { invsigmas, .. } => v.component_mul(invsigmas),
            NoiseModel::Constrained { sigmas, .. } => {
                DVec::from_fn(v.len(), |i, _| {
                    if sigmas[i] > 0.0 {
                        v[i] / sigmas[i]
                    } else if v[i] == 0.0 {
                        0.0
                    } else {
                        Real::INFINITY
                    }
                })
            }
            NoiseModel::Isotropic { invsigma, .. } => v * *invsigma,
            NoiseModel::Unit { .. } => v.clone(),
        }
    }

    /// Inverse of [`NoiseModel::whiten`].
    ///
    /// For a constrained model, constrained components unwhiten to zero.
    pub fn unwhiten(&self, v: &DVec) -> DVec {
        debug_assert_eq!(v.len(), self.dim(), "residual dimension mismatch");
        match self {
            NoiseModel::Gaussian { r_inv, .. } => r_inv * v,
            NoiseModel::Diagonal { sigmas, .. } => v.component_mul(sigmas),
            NoiseModel::Constrained { sigmas, .. } => v.component_mul(sigmas),
            NoiseModel::Isotropic { sigma, .. } => v * *sigma,
            NoiseModel::Unit { .. } => v.clone(),
        }
    }

    /// Squared Mahalanobis distance `vᵀ RᵀR v`, the factor's cost
    /// contribution. May be `+∞` for a constrained model with a violated
    /// constraint.
    pub fn mahalanobis(&self, v: &DVec) -> Real {
        match self {
            NoiseModel::Isotropic { invsigma, .. } => v.norm_squared() * invsigma * invsigma,
            NoiseModel::Unit { .. } => v.norm_squared(),
            _ => self.whiten(v).norm_squared(),
        }
    }

    /// Whitens every column of a Jacobian block, so whitened residual and
    /// whitened Jacobian stay consistent in the normal equations.
    ///
    /// Fails with [`NoiseModelError::UnsupportedOperation`] for constrained
    /// models: whitening under a singular information matrix is undefined
    /// and is never approximated.
    pub fn whiten_matrix(&self, h: &DMat) -> Result<DMat, NoiseModelError> {
        let mut out = h.clone();
        self.whiten_matrix_in_place(&mut out)?;
        Ok(out)
    }

    /// In-place variant of [`NoiseModel::whiten_matrix`].
    pub fn whiten_matrix_in_place(&self, h: &mut DMat) -> Result<(), NoiseModelError> {
        debug_assert_eq!(h.nrows(), self.dim(), "Jacobian row dimension mismatch");
        match self {
            NoiseModel::Gaussian { r, .. } => {
                *h = r * &*h;
                Ok(())
            }
            NoiseModel::Diagonal { invsigmas, .. } => {
                for (mut row, &w) in h.row_iter_mut().zip(invsigmas.iter()) {
                    row *= w;
                }
                Ok(())
            }
            NoiseModel::Constrained { .. } => Err(NoiseModelError::UnsupportedOperation),
            NoiseModel::Isotropic { invsigma, .. } => {
                *h *= *invsigma;
                Ok(())
            }
            NoiseModel::Unit { .. } => Ok(()),
        }
    }

    /// Whitens a full linear system `(A, b)` in place.
    pub fn whiten_system(&self, a: &mut DMat, b: &mut DVec) -> Result<(), NoiseModelError> {
        self.whiten_matrix_in_place(a)?;
        *b = self.whiten(b);
        Ok(())
    }

    /// Standard deviations, for the diagonal family of models.
    pub fn sigma_values(&self) -> Option<DVec> {
        match self {
            NoiseModel::Gaussian { .. } => None,
            NoiseModel::Diagonal { sigmas, .. } => Some(sigmas.clone()),
            NoiseModel::Constrained { sigmas, .. } => Some(sigmas.clone()),
            NoiseModel::Isotropic { dim, sigma, .. } => Some(DVec::from_element(*dim, *sigma)),
            NoiseModel::Unit { dim } => Some(DVec::from_element(*dim, 1.0)),
        }
    }

    /// The stored square-root information as a dense matrix, when the model
    /// is non-singular.
    pub fn sqrt_information_matrix(&self) -> Option<DMat> {
        match self {
            NoiseModel::Gaussian { r, .. } => Some(r.clone()),
            NoiseModel::Diagonal { invsigmas, .. } => Some(DMat::from_diagonal(invsigmas)),
            NoiseModel::Constrained { .. } => None,
            NoiseModel::Isotropic { dim, invsigma, .. } => {
                Some(DMat::identity(*dim, *dim) * *invsigma)
            }
            NoiseModel::Unit { dim } => Some(DMat::identity(*dim, *dim)),
        }
    }

    /// Returns `true` for the identity (already whitened) model.
    pub fn is_unit(&self) -> bool {
        matches!(self, NoiseModel::Unit { .. })
    }

    /// Returns `true` for a model that may carry exact constraints.
    pub fn is_constrained(&self) -> bool {
        matches!(self, NoiseModel::Constrained { .. })
    }

    /// Approximate equality of the underlying models.
    ///
    /// The stored quantity is a square root of the precision, so it is
    /// compared at `tol.sqrt()`: agreement there corresponds to covariance
    /// agreement at `tol`. Constrained models only compare equal to other
    /// constrained models (their information matrix is singular and has no
    /// finite square root to compare). Never fails.
    pub fn equals(&self, other: &NoiseModel, tol: Real) -> bool {
        if self.dim() != other.dim() {
            return false;
        }
        let t = tol.sqrt();
        match (self, other) {
            (
                NoiseModel::Constrained { sigmas: a, .. },
                NoiseModel::Constrained { sigmas: b, .. },
            ) => max_abs_diff_vec(a, b) <= t,
            (NoiseModel::Constrained { .. }, _) | (_, NoiseModel::Constrained { .. }) => false,
            _ => match (self.sqrt_information_matrix(), other.sqrt_information_matrix()) {
                (Some(a), Some(b)) => max_abs_diff(&a, &b) <= t,
                _ => false,
            },
        }
    }

    /// Prints the model with a caller-supplied label. Diagnostics only.
    pub fn print(&self, label: &str) {
        println!("{label}{self}");
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseModel::Gaussian { r, .. } => write!(f, "Gaussian R:{r}"),
            NoiseModel::Diagonal { sigmas, .. } => write!(f, "Diagonal sigmas:{sigmas}"),
            NoiseModel::Constrained { sigmas, .. } => write!(f, "Constrained sigmas:{sigmas}"),
            NoiseModel::Isotropic { dim, sigma, .. } => {
                write!(f, "Isotropic dim {dim} sigma {sigma}")
            }
            NoiseModel::Unit { dim } => write!(f, "Unit dim {dim}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn approx_eq(a: Real, b: Real, tol: Real) {
        assert!(
            (a - b).abs() <= tol,
            "values differ: {} vs {} (tol={})",
            a,
            b,
            tol
        );
    }

    fn vec3(x: Real, y: Real, z: Real) -> DVec {
        DVec::from_row_slice(&[x, y, z])
    }

    #[test]
    fn diagonal_whiten_matches_spec_example() {
        let model = NoiseModel::sigmas(vec3(2.0, 4.0, 5.0)).unwrap();
        let w = model.whiten(&vec3(2.0, 4.0, 5.0));
        assert_eq!(w, vec3(1.0, 1.0, 1.0));
        approx_eq(model.mahalanobis(&vec3(2.0, 4.0, 5.0)), 3.0, 1e-12);
    }

    #[test]
    fn diagonal_round_trip() {
        let model = NoiseModel::sigmas(vec3(0.5, 2.0, 7.0)).unwrap();
        let v = vec3(1.2, -3.4, 0.01);
        let back = model.unwhiten(&model.whiten(&v));
        assert!(max_abs_diff_vec(&back, &v) < 1e-12);
    }

    #[test]
    fn gaussian_round_trip() {
        let r = DMat::from_row_slice(3, 3, &[2.0, 1.0, 0.5, 0.0, 3.0, -1.0, 0.0, 0.0, 1.5]);
        let model = NoiseModel::sqrt_information(r).unwrap();
        let v = vec3(-0.7, 2.2, 5.0);
        let back = model.unwhiten(&model.whiten(&v));
        assert!(max_abs_diff_vec(&back, &v) < 1e-10);
    }

    #[test]
    fn covariance_mahalanobis_cross_check() {
        let mut rng = StdRng::seed_from_u64(42);
        let a = DMat::from_fn(4, 4, |_, _| rng.random_range(-1.0..1.0));
        let sigma = &a * a.transpose() + DMat::identity(4, 4) * 0.5;
        let model = NoiseModel::covariance(&sigma).unwrap();

        for _ in 0..5 {
            let v = DVec::from_fn(4, |_, _| rng.random_range(-2.0..2.0));
            let direct = v.dot(&(sigma.clone().try_inverse().unwrap() * &v));
            let got = model.mahalanobis(&v);
            assert!(
                (got - direct).abs() <= 1e-8 * direct.abs().max(1.0),
                "mahalanobis mismatch: {got} vs {direct}"
            );
        }
    }

    #[test]
    fn covariance_requires_positive_definite() {
        let not_pd = DMat::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
        assert_eq!(
            NoiseModel::covariance(&not_pd).unwrap_err(),
            NoiseModelError::Decomposition
        );
        let not_sym = DMat::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 1.0]);
        assert_eq!(
            NoiseModel::covariance(&not_sym).unwrap_err(),
            NoiseModelError::Decomposition
        );
    }

    #[test]
    fn information_agrees_with_covariance() {
        let sigma = DMat::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 2.0]);
        let info = sigma.clone().try_inverse().unwrap();
        let info = (&info + info.transpose()) * 0.5;
        let from_cov = NoiseModel::covariance(&sigma).unwrap();
        let from_info = NoiseModel::information(&info).unwrap();
        assert!(from_cov.equals(&from_info, 1e-12));
    }

    #[test]
    fn unit_is_identity() {
        let model = NoiseModel::unit(3);
        let v = vec3(1.0, -2.0, 3.0);
        assert_eq!(model.whiten(&v), v);
        assert_eq!(model.unwhiten(&v), v);
        approx_eq(model.mahalanobis(&v), v.norm_squared(), 1e-15);
        let h = DMat::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(model.whiten_matrix(&h).unwrap(), h);
    }

    #[test]
    fn isotropic_variants_agree() {
        let a = NoiseModel::isotropic(2, 3.0).unwrap();
        let b = NoiseModel::isotropic_variance(2, 9.0).unwrap();
        let c = NoiseModel::isotropic_precision(2, 1.0 / 9.0).unwrap();
        assert!(a.equals(&b, 1e-12));
        assert!(a.equals(&c, 1e-12));
        let v = DVec::from_row_slice(&[3.0, -6.0]);
        assert_eq!(a.whiten(&v), DVec::from_row_slice(&[1.0, -2.0]));
        approx_eq(a.mahalanobis(&v), 5.0, 1e-12);
    }

    #[test]
    fn sigma_factories_agree() {
        let a = NoiseModel::sigmas(vec3(2.0, 4.0, 5.0)).unwrap();
        let b = NoiseModel::variances(&vec3(4.0, 16.0, 25.0)).unwrap();
        let c = NoiseModel::precisions(&vec3(0.25, 1.0 / 16.0, 0.04)).unwrap();
        assert!(a.equals(&b, 1e-12));
        assert!(a.equals(&c, 1e-12));
    }

    #[test]
    fn rejects_non_positive_sigmas() {
        assert_eq!(
            NoiseModel::sigmas(vec3(1.0, 0.0, 2.0)).unwrap_err(),
            NoiseModelError::InvalidSigma
        );
        assert_eq!(
            NoiseModel::isotropic(3, -1.0).unwrap_err(),
            NoiseModelError::InvalidSigma
        );
        // zero precision would mean an infinite sigma
        assert_eq!(
            NoiseModel::precisions(&vec3(1.0, 0.0, 1.0)).unwrap_err(),
            NoiseModelError::InvalidSigma
        );
    }

    #[test]
    fn constrained_whiten_edge_cases() {
        let model = NoiseModel::constrained(vec3(2.0, 0.0, 3.0)).unwrap();

        // zero-sigma component with zero residual whitens to zero
        let w = model.whiten(&vec3(4.0, 0.0, 9.0));
        assert_eq!(w, vec3(2.0, 0.0, 3.0));
        approx_eq(model.mahalanobis(&vec3(4.0, 0.0, 9.0)), 13.0, 1e-12);

        // violated constraint whitens to +infinity
        let w = model.whiten(&vec3(4.0, 5.0, 9.0));
        assert_eq!(w[0], 2.0);
        assert!(w[1].is_infinite() && w[1] > 0.0);
        assert!(model.mahalanobis(&vec3(4.0, 5.0, 9.0)).is_infinite());
    }

    #[test]
    fn constrained_cannot_whiten_jacobians() {
        let model = NoiseModel::constrained(vec3(2.0, 0.0, 3.0)).unwrap();
        let h = DMat::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(
            model.whiten_matrix(&h).unwrap_err(),
            NoiseModelError::UnsupportedOperation
        );
        let mut h2 = h.clone();
        assert_eq!(
            model.whiten_matrix_in_place(&mut h2).unwrap_err(),
            NoiseModelError::UnsupportedOperation
        );
        // the failed in-place call must not have touched the matrix
        assert_eq!(h2, h);
    }

    #[test]
    fn all_constrained_cost_is_infinite() {
        // An all-constrained model with any nonzero residual reports
        // literal +infinity, unclamped; the caller detects infeasibility.
        let model = NoiseModel::all_constrained(3);
        assert_eq!(model.mahalanobis(&vec3(0.0, 0.0, 0.0)), 0.0);
        let cost = model.mahalanobis(&vec3(0.0, 1e-300, 0.0));
        assert!(cost.is_infinite() && cost > 0.0);
    }

    #[test]
    fn diagonal_whitens_jacobian_rows() {
        let model = NoiseModel::sigmas(vec3(2.0, 4.0, 5.0)).unwrap();
        let h = DMat::from_row_slice(3, 2, &[2.0, 4.0, 8.0, 12.0, 10.0, 20.0]);
        let wh = model.whiten_matrix(&h).unwrap();
        let expected = DMat::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 3.0, 2.0, 4.0]);
        assert!(max_abs_diff(&wh, &expected) < 1e-12);
    }

    #[test]
    fn whiten_system_whitens_both_sides() {
        let model = NoiseModel::isotropic(2, 2.0).unwrap();
        let mut a = DMat::from_row_slice(2, 2, &[2.0, 4.0, 6.0, 8.0]);
        let mut b = DVec::from_row_slice(&[2.0, -4.0]);
        model.whiten_system(&mut a, &mut b).unwrap();
        assert_eq!(a, DMat::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(b, DVec::from_row_slice(&[1.0, -2.0]));
    }

    #[test]
    fn equality_uses_square_root_tolerance() {
        let a = NoiseModel::sigmas(DVec::from_row_slice(&[1.0])).unwrap();
        let b = NoiseModel::sigmas(DVec::from_row_slice(&[1.009])).unwrap();
        // stored quantities differ by ~0.009 in 1/sigma terms
        assert!(a.equals(&b, 1e-3)); // sqrt(1e-3) ~ 0.0316
        assert!(!a.equals(&b, 1e-6)); // sqrt(1e-6) = 0.001
    }

    #[test]
    fn equality_across_variants_and_dims() {
        let diag = NoiseModel::sigmas(vec3(2.0, 2.0, 2.0)).unwrap();
        let iso = NoiseModel::isotropic(3, 2.0).unwrap();
        assert!(diag.equals(&iso, 1e-12));
        assert!(!diag.equals(&NoiseModel::unit(3), 1e-12));
        assert!(!diag.equals(&NoiseModel::isotropic(2, 2.0).unwrap(), 1e-12));
        // constrained never equals a non-constrained model
        let constrained = NoiseModel::constrained(vec3(2.0, 2.0, 2.0)).unwrap();
        assert!(!constrained.equals(&diag, 1e-12));
        let unit = NoiseModel::unit(2);
        let iso1 = NoiseModel::isotropic(2, 1.0).unwrap();
        assert!(unit.equals(&iso1, 1e-12));
    }

    #[test]
    fn singular_sqrt_information_is_rejected() {
        let r = DMat::from_row_slice(2, 2, &[1.0, 2.0, 0.0, 0.0]);
        assert_eq!(
            NoiseModel::sqrt_information(r).unwrap_err(),
            NoiseModelError::SingularSqrtInformation
        );
    }
}
