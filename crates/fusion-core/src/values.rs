//! Variable assignment container.

use crate::key::Key;
use crate::manifold::Manifold;
use crate::math::Real;
use std::collections::BTreeMap;
use std::fmt;

/// An assignment of values to variable keys.
///
/// Iteration order is key order, which keeps printing and tangent-vector
/// stacking deterministic.
#[derive(Debug, Clone, Default)]
pub struct Values<V> {
    map: BTreeMap<Key, V>,
}

impl<V: Manifold> Values<V> {
    /// Creates an empty assignment.
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Inserts or replaces the value for `key`; returns the previous value.
    pub fn insert(&mut self, key: Key, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    /// Value stored for `key`, if present.
    pub fn get(&self, key: Key) -> Option<&V> {
        self.map.get(&key)
    }

    /// Returns `true` if `key` has a value.
    pub fn contains(&self, key: Key) -> bool {
        self.map.contains_key(&key)
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no variables are stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.map.keys().copied()
    }

    /// Key-value pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, &V)> {
        self.map.iter().map(|(k, v)| (*k, v))
    }

    /// Sum of tangent dimensions over all stored values.
    pub fn total_dim(&self) -> usize {
        self.map.values().map(Manifold::dim).sum()
    }

    /// Approximate equality: same key set, every value within `tol`.
    pub fn approx_eq(&self, other: &Self, tol: Real) -> bool {
        self.len() == other.len()
            && self.iter().all(|(key, value)| {
                other
                    .get(key)
                    .is_some_and(|rhs| value.approx_eq(rhs, tol))
            })
    }
}

impl<V: fmt::Debug> fmt::Display for Values<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.map {
            writeln!(f, "  {key}: {value:?}")?;
        }
        Ok(())
    }
}
