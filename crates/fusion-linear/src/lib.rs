//! Gaussian (linear) layer of `fusion-rs`.
//!
//! This crate contains:
//! - the noise-model hierarchy ([`NoiseModel`]): whitening transforms and
//!   Mahalanobis costs, including singular hard-constraint models,
//! - block matrix layouts ([`VerticalBlockMatrix`], [`SymmetricBlockMatrix`])
//!   that partition one owned buffer into per-variable blocks,
//! - slot-indexed linear factors ([`JacobianFactor`], [`HessianFactor`]) as
//!   produced by linearization and elimination.

/// Block matrix layouts over a single owned buffer.
pub mod block;
/// Jacobian-form and information-form linear factors.
pub mod factor;
/// Noise models: whitening, Mahalanobis distance, factories.
pub mod noise_model;

pub use block::{SymmetricBlockMatrix, VerticalBlockMatrix};
pub use factor::{HessianFactor, JacobianFactor, LinearFactor, LinearFactorError};
pub use noise_model::{NoiseModel, NoiseModelError, SharedNoiseModel};
