//! Set-associative tag storage.
//!
//! A [`TagArray`] maps a key (line number, page number, branch address) to a set
//! by its low bits and keeps up to `ways` keys per set, each with a payload.
//! Recency is tracked by an [`LruPolicy`]; lookups that hit refresh it and
//! inserts evict the least recently used way.

use super::policies::{LruPolicy, ReplacementPolicy};

#[derive(Clone, Debug)]
struct Way<V> {
    key: u64,
    value: V,
}

/// A set-associative array of keyed payloads.
#[derive(Clone, Debug)]
pub struct TagArray<V> {
    ways: Vec<Option<Way<V>>>,
    num_sets: usize,
    associativity: usize,
    policy: LruPolicy,
}

impl<V> TagArray<V> {
    /// Creates an empty array.
    ///
    /// # Arguments
    ///
    /// * `num_sets` - Number of sets; must be a power of two.
    /// * `associativity` - Ways per set.
    pub fn new(num_sets: usize, associativity: usize) -> Self {
        let num_sets = num_sets.max(1);
        let associativity = associativity.max(1);
        Self {
            ways: std::iter::repeat_with(|| None)
                .take(num_sets * associativity)
                .collect(),
            num_sets,
            associativity,
            policy: LruPolicy::new(num_sets, associativity),
        }
    }

    /// Number of sets.
    pub const fn num_sets(&self) -> usize {
        self.num_sets
    }

    /// Ways per set.
    pub const fn associativity(&self) -> usize {
        self.associativity
    }

    const fn set_of(&self, key: u64) -> usize {
        (key as usize) & (self.num_sets - 1)
    }

    fn find(&self, key: u64) -> Option<(usize, usize)> {
        let set = self.set_of(key);
        let base = set * self.associativity;
        (0..self.associativity)
            .find(|&way| self.ways[base + way].as_ref().is_some_and(|w| w.key == key))
            .map(|way| (set, way))
    }

    /// Returns true if `key` is present, without touching recency.
    pub fn contains(&self, key: u64) -> bool {
        self.find(key).is_some()
    }

    /// Looks up `key`, marking it most recently used on a hit.
    pub fn lookup(&mut self, key: u64) -> Option<&mut V> {
        let (set, way) = self.find(key)?;
        self.policy.touch(set, way);
        self.ways[set * self.associativity + way]
            .as_mut()
            .map(|w| &mut w.value)
    }

    /// Inserts or replaces `key`, evicting the LRU way of its set if needed.
    pub fn insert(&mut self, key: u64, value: V) {
        let set = self.set_of(key);
        let base = set * self.associativity;
        let way = self
            .find(key)
            .map(|(_, way)| way)
            .or_else(|| (0..self.associativity).find(|&way| self.ways[base + way].is_none()))
            .unwrap_or_else(|| self.policy.victim(set));
        self.ways[base + way] = Some(Way { key, value });
        self.policy.touch(set, way);
    }
}
