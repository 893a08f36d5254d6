//! Nonlinear factor surface of `fusion-rs`.
//!
//! A nonlinear factor reports its cost at a variable assignment and can be
//! linearized into a Gaussian factor around that assignment. This crate
//! defines the graph-facing trait ([`NonlinearFactor`]) and the linearized
//! factor family: factors that wrap a *previously computed* linear factor
//! together with its linearization point, and re-expose it as an ordinary
//! re-evaluable, re-linearizable factor.

/// The nonlinear factor trait and its error type.
pub mod factor;
/// Factors wrapping previously linearized Gaussian factors.
pub mod linearized;

pub use factor::{FactorError, NonlinearFactor};
pub use linearized::{LinearizedHessianFactor, LinearizedJacobianFactor};
