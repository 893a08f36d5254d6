//! Core primitives for `fusion-rs`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `DVec`, `DMat`, ...),
//! - variable keys and key-to-slot orderings ([`Key`], [`Ordering`]),
//! - the manifold seam consumed by factors ([`Manifold`], [`VectorValue`]),
//! - the [`Values`] variable assignment container.
//!
//! The geometry value types themselves (rotations, poses) live outside this
//! workspace and plug in through the [`Manifold`] trait.

/// Linear algebra type aliases and helpers.
pub mod math;
/// Variable keys and orderings.
pub mod key;
/// Manifold trait and the Euclidean chart.
pub mod manifold;
/// Variable assignment container.
pub mod values;

pub use key::{Key, Ordering};
pub use manifold::{Manifold, VectorValue};
pub use math::{max_abs_diff, max_abs_diff_vec, DMat, DMatView, DMatViewMut, DVec, DVecView, Real};
pub use values::Values;
