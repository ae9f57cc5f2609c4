//! Branch Target Buffer (BTB).
//!
//! A set-associative cache of branch targets indexed by instruction address.
//! Only taken outcomes install targets, so a hit means the branch was last seen
//! leaving its fall-through path.

use crate::common::constants::INSTRUCTION_SIZE;
use crate::core::units::cache::tag_array::TagArray;

/// Branch Target Buffer structure.
#[derive(Clone, Debug)]
pub struct Btb {
    targets: TagArray<u64>,
}

impl Btb {
    /// Creates an empty BTB.
    ///
    /// # Arguments
    ///
    /// * `num_sets` - Number of sets. Must be a power of 2.
    /// * `associativity` - Ways per set.
    pub fn new(num_sets: usize, associativity: usize) -> Self {
        Self {
            targets: TagArray::new(num_sets, associativity),
        }
    }

    const fn key(pc: u64) -> u64 {
        pc / INSTRUCTION_SIZE
    }

    /// Looks up the predicted target of the branch at `pc`.
    pub fn lookup(&mut self, pc: u64) -> Option<u64> {
        self.targets.lookup(Self::key(pc)).map(|target| *target)
    }

    /// Records a resolved target; not-taken outcomes leave the BTB unchanged.
    pub fn update(&mut self, pc: u64, target: u64, taken: bool) {
        if !taken {
            return;
        }
        match self.targets.lookup(Self::key(pc)) {
            Some(slot) => *slot = target,
            None => self.targets.insert(Self::key(pc), target),
        }
    }
}
