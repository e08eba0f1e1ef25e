//! Fixed-capacity open-addressing map from `u64` keys to `Copy` values.
//!
//! Slots are searched linearly from `key % capacity`. Key `0` marks an empty
//! slot and can never be stored. The table never grows: size it above the
//! largest number of distinct keys it will hold over its lifetime.
//!
//! Removal clears the slot back to empty without leaving a tombstone, so a
//! key that was displaced past the removed one can become unreachable:
//!
//! ```
//! use corkboard::{Allocator, U64Map};
//!
//! let mut map = U64Map::new(Allocator::heap(), 8);
//! map.set(3, 30u32);
//! map.set(11, 110); // collides with 3, lands in slot 4
//! map.remove(3);
//! assert_eq!(map.get(11), None);
//! ```

use crate::allocator::Allocator;
use crate::array::Array;

/// Key value reserved for empty slots.
pub const EMPTY_KEY: u64 = 0;

/// Result of probing for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapFind {
    /// First empty slot on the search sequence, where the key would be
    /// inserted. `None` if the key is present or the table is full.
    pub vacant: Option<usize>,
    /// Slot holding the key, if present.
    pub entry: Option<usize>,
}

/// A fixed-capacity open-addressing hash map keyed by non-zero `u64`.
#[derive(Debug)]
pub struct U64Map<V: Copy> {
    keys: Array<u64>,
    values: Array<V>,
    len: usize,
}

impl<V: Copy + Default> U64Map<V> {
    /// A map with exactly `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(allocator: Allocator, capacity: usize) -> Self {
        assert!(capacity > 0, "U64Map capacity must be greater than zero");
        Self {
            keys: Array::filled(allocator.clone(), capacity, EMPTY_KEY),
            values: Array::filled(allocator, capacity, V::default()),
            len: 0,
        }
    }
}

impl<V: Copy> U64Map<V> {
    /// Number of stored keys.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no keys are stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn home_slot(&self, key: u64) -> usize {
        // The remainder is below `capacity`, which is a `usize`.
        (key % self.capacity() as u64) as usize
    }

    /// Walk the search sequence of `key`.
    ///
    /// Stops at the slot holding `key` or at the first empty slot, whichever
    /// comes first. Visits every slot at most once.
    #[must_use]
    pub fn find(&self, key: u64) -> MapFind {
        let mut found = MapFind {
            vacant: None,
            entry: None,
        };
        if key == EMPTY_KEY {
            return found;
        }

        let capacity = self.capacity();
        let mut index = self.home_slot(key);
        for _ in 0..capacity {
            let k = self.keys[index];
            if k == key {
                found.entry = Some(index);
                return found;
            }
            if k == EMPTY_KEY {
                found.vacant = Some(index);
                return found;
            }
            index = (index + 1) % capacity;
        }
        found
    }

    /// The value stored under `key`.
    #[must_use]
    pub fn get(&self, key: u64) -> Option<&V> {
        self.find(key).entry.map(|slot| &self.values[slot])
    }

    /// Mutable access to the value stored under `key`.
    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        self.find(key).entry.map(|slot| &mut self.values[slot])
    }

    /// Whether `key` is stored.
    #[must_use]
    pub fn contains_key(&self, key: u64) -> bool {
        self.find(key).entry.is_some()
    }

    /// Insert `value` under `key`, overwriting any previous value.
    ///
    /// # Panics
    ///
    /// Panics if `key` is `0`, or if `key` is new and every slot on its
    /// search sequence is taken (the table is full).
    pub fn set(&mut self, key: u64, value: V) {
        assert_ne!(key, EMPTY_KEY, "key 0 is reserved for empty slots");
        let found = self.find(key);
        let slot = match (found.entry, found.vacant) {
            (Some(slot), _) => slot,
            (None, Some(slot)) => {
                self.keys[slot] = key;
                self.len += 1;
                slot
            }
            (None, None) => panic!(
                "U64Map is full: {} slots, cannot insert key {key}",
                self.capacity()
            ),
        };
        self.values[slot] = value;
    }

    /// Remove `key`, returning its value.
    ///
    /// The slot goes back to empty; no tombstone is left behind.
    pub fn remove(&mut self, key: u64) -> Option<V> {
        let slot = self.find(key).entry?;
        self.keys[slot] = EMPTY_KEY;
        self.len -= 1;
        Some(self.values[slot])
    }

    /// Iterate over stored `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> + '_ {
        self.keys
            .iter()
            .zip(self.values.iter())
            .filter(|(&k, _)| k != EMPTY_KEY)
            .map(|(&k, v)| (k, v))
    }
}
