//! Least Recently Used (LRU) Replacement Policy.
//!
//! Each set keeps a recency stack of way indices. Index 0 is the most recently
//! used way and the last index is the victim.
//!
//! # Performance
//!
//! - **Time Complexity:** `touch()` is O(W), `victim()` is O(1)
//! - **Space Complexity:** O(S × W) where S is the number of sets

use super::ReplacementPolicy;

/// LRU policy state.
#[derive(Clone, Debug)]
pub struct LruPolicy {
    /// One recency stack per set, most recent first.
    stacks: Vec<Vec<usize>>,
}

impl LruPolicy {
    /// Creates a policy for `sets` sets of `ways` ways each.
    ///
    /// Initially way 0 is the most recent, so the last way is evicted first.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            stacks: vec![(0..ways).collect(); sets],
        }
    }
}

impl ReplacementPolicy for LruPolicy {
    /// Moves `way` to the top of its set's recency stack.
    fn touch(&mut self, set: usize, way: usize) {
        let stack = &mut self.stacks[set];
        if let Some(pos) = stack.iter().position(|&w| w == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }

    /// Returns the bottom of the recency stack.
    fn victim(&self, set: usize) -> usize {
        self.stacks[set].last().copied().unwrap_or(0)
    }
}
