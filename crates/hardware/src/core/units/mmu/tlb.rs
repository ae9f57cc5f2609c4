//! Translation Lookaside Buffer (TLB).
//!
//! A set-associative array of page numbers. An access whose page is present
//! costs the hit latency; otherwise the page is installed (evicting the LRU way)
//! and the access costs the miss latency.

use std::fmt;

use crate::config::TlbConfig;
use crate::core::units::cache::tag_array::TagArray;
use crate::core::units::cache::{CacheStats, MemoryAccess};

/// Latency model of a translation buffer.
pub trait TranslationBuffer: Send + Sync + fmt::Debug {
    /// Looks up the page of `access`.
    ///
    /// # Returns
    ///
    /// Cycles until the translation is available.
    fn access(&mut self, access: &MemoryAccess) -> u64;

    /// Hit and miss counters.
    fn stats(&self) -> CacheStats;
}

/// Translation Lookaside Buffer structure.
pub struct Tlb {
    name: &'static str,
    pages: TagArray<()>,
    page_size: u64,
    hit_latency: u64,
    miss_latency: u64,
    stats: CacheStats,
}

impl Tlb {
    /// Creates an empty TLB.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in logs.
    /// * `config` - Geometry and latencies; assumed validated.
    pub fn new(name: &'static str, config: &TlbConfig) -> Self {
        let associativity = config.associativity.max(1);
        Self {
            name,
            pages: TagArray::new(config.num_entries / associativity, associativity),
            page_size: config.page_size,
            hit_latency: config.hit_latency,
            miss_latency: config.miss_latency,
            stats: CacheStats::default(),
        }
    }
}

impl fmt::Debug for Tlb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tlb")
            .field("name", &self.name)
            .field("sets", &self.pages.num_sets())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl TranslationBuffer for Tlb {
    fn access(&mut self, access: &MemoryAccess) -> u64 {
        let page = access.physical_address / self.page_size;
        if self.pages.lookup(page).is_some() {
            self.stats.hits += 1;
            self.hit_latency
        } else {
            self.stats.misses += 1;
            self.pages.insert(page, ());
            self.miss_latency
        }
    }

    fn stats(&self) -> CacheStats {
        self.stats
    }
}
