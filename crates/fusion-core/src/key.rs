//! Variable identifiers and key-to-slot orderings.

use std::collections::HashMap;
use std::fmt;

/// Identifier for a variable in the factor graph.
///
/// Keys are opaque to this layer; the application decides how to pack
/// symbols into the underlying integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(pub u64);

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Bijection between variable keys and the contiguous integer slots used by
/// the linear-algebra layer.
///
/// Slot `i` holds the `i`-th key passed to [`Ordering::from_keys`].
#[derive(Debug, Clone, Default)]
pub struct Ordering {
    keys: Vec<Key>,
    slots: HashMap<Key, usize>,
}

impl Ordering {
    /// Builds an ordering from keys in slot order.
    ///
    /// Panics if the same key appears twice.
    pub fn from_keys<I: IntoIterator<Item = Key>>(keys: I) -> Self {
        let keys: Vec<Key> = keys.into_iter().collect();
        let mut slots = HashMap::with_capacity(keys.len());
        for (slot, &key) in keys.iter().enumerate() {
            let prev = slots.insert(key, slot);
            assert!(prev.is_none(), "duplicate key {key} in ordering");
        }
        Self { keys, slots }
    }

    /// Slot assigned to `key`, if the key is part of the ordering.
    pub fn slot(&self, key: Key) -> Option<usize> {
        self.slots.get(&key).copied()
    }

    /// Key stored at `slot`, if the slot is in range.
    pub fn key(&self, slot: usize) -> Option<Key> {
        self.keys.get(slot).copied()
    }

    /// Returns `true` if `key` has a slot.
    pub fn contains(&self, key: Key) -> bool {
        self.slots.contains_key(&key)
    }

    /// Number of variables in the ordering.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the ordering is empty.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in slot order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }
}
