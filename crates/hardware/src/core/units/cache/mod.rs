//! First-level cache controllers.
//!
//! The core talks to its instruction and data caches only through the
//! [`CacheController`] admission protocol:
//! 1. **Admission:** `can_access` decides whether a new access may start.
//! 2. **Aliasing:** `find_access` reports an in-flight access to the same line,
//!    which a new access folds into instead of starting its own transaction.
//! 3. **Transaction:** `begin_access` registers the access under its tag and
//!    `receive` returns the cycles until the line is serviced.
//! 4. **Completion:** `end_access` retires the tag and hands back every access
//!    that was waiting on it.
//!
//! [`BasicCacheController`] implements the protocol on top of a set-associative
//! LRU tag array with a bounded in-flight table (MSHR-style).

/// Replacement policies.
pub mod policies;

/// Set-associative tag storage.
pub mod tag_array;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use self::tag_array::TagArray;
use crate::common::constants::align_down;
use crate::common::ids::AccessId;
use crate::config::CacheConfig;

/// Kind of memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AccessKind {
    /// Instruction fetch.
    Ifetch,
    /// Data read.
    Load,
    /// Data write.
    Store,
}

/// One access presented to the memory hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryAccess {
    /// Coordinator-assigned id.
    pub id: AccessId,
    /// Kind of access.
    pub kind: AccessKind,
    /// Global id of the requesting thread.
    pub thread: usize,
    /// Program counter of the requesting instruction.
    pub pc: u64,
    /// Virtual address accessed.
    pub virtual_address: u64,
    /// Translated address.
    pub physical_address: u64,
    /// Cache tag of the physical address.
    pub tag: u64,
}

/// Hit and miss counters of a cache or translation buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups that found their line.
    pub hits: u64,
    /// Lookups that had to fill.
    pub misses: u64,
}

impl CacheStats {
    /// Total lookups.
    pub const fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups that hit, or 0 with no lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Admission protocol of a first-level cache.
pub trait CacheController: Send + Sync + fmt::Debug {
    /// Name used in logs and statistics.
    fn name(&self) -> &str;

    /// Line size in bytes.
    fn line_size(&self) -> u64;

    /// Tag of the line holding `physical_address`.
    fn tag(&self, physical_address: u64) -> u64;

    /// Returns true if an access of `kind` to `tag` may start now.
    fn can_access(&self, kind: AccessKind, tag: u64) -> bool;

    /// An in-flight access to `tag`, if any.
    fn find_access(&self, tag: u64) -> Option<AccessId>;

    /// Registers `access` as waiting on its tag.
    fn begin_access(&mut self, access: &MemoryAccess);

    /// Starts the line transaction for `access`.
    ///
    /// # Returns
    ///
    /// Cycles until the line is serviced.
    fn receive(&mut self, access: &MemoryAccess) -> u64;

    /// Retires the transaction for `tag`.
    ///
    /// # Returns
    ///
    /// Every access registered on the tag, in registration order.
    fn end_access(&mut self, tag: u64) -> Vec<AccessId>;

    /// Hit and miss counters.
    fn stats(&self) -> CacheStats;
}

/// A set-associative LRU cache with a bounded in-flight table.
pub struct BasicCacheController {
    name: String,
    config: CacheConfig,
    lines: TagArray<()>,
    in_flight: HashMap<u64, Vec<AccessId>>,
    stats: CacheStats,
}

impl BasicCacheController {
    /// Creates a cold cache.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in logs (`"l1i"`, `"l1d"`).
    /// * `config` - Geometry and latencies; assumed validated.
    pub fn new(name: impl Into<String>, config: &CacheConfig) -> Self {
        Self {
            name: name.into(),
            lines: TagArray::new(config.num_sets(), config.associativity),
            config: config.clone(),
            in_flight: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Number of tags currently in flight.
    pub fn num_in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl fmt::Debug for BasicCacheController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCacheController")
            .field("name", &self.name)
            .field("sets", &self.lines.num_sets())
            .field("ways", &self.lines.associativity())
            .field("in_flight", &self.in_flight.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl CacheController for BasicCacheController {
    fn name(&self) -> &str {
        &self.name
    }

    fn line_size(&self) -> u64 {
        self.config.line_size
    }

    fn tag(&self, physical_address: u64) -> u64 {
        align_down(physical_address, self.config.line_size)
    }

    /// Admits accesses to a tag already in flight, or to a new tag while an
    /// in-flight slot is free.
    fn can_access(&self, _kind: AccessKind, tag: u64) -> bool {
        self.in_flight.contains_key(&tag) || self.in_flight.len() < self.config.mshrs
    }

    fn find_access(&self, tag: u64) -> Option<AccessId> {
        self.in_flight.get(&tag).and_then(|ids| ids.first().copied())
    }

    fn begin_access(&mut self, access: &MemoryAccess) {
        self.in_flight.entry(access.tag).or_default().push(access.id);
    }

    fn receive(&mut self, access: &MemoryAccess) -> u64 {
        let line = access.tag / self.config.line_size;
        if self.lines.lookup(line).is_some() {
            self.stats.hits += 1;
            self.config.hit_latency
        } else {
            self.stats.misses += 1;
            self.lines.insert(line, ());
            self.config.hit_latency + self.config.miss_latency
        }
    }

    fn end_access(&mut self, tag: u64) -> Vec<AccessId> {
        self.in_flight.remove(&tag).unwrap_or_default()
    }

    fn stats(&self) -> CacheStats {
        self.stats
    }
}
