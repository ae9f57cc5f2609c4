//! Replacement policies for set-associative tag arrays.
//!
//! The caches, translation buffers and branch target buffer all keep their tags
//! in set-associative arrays. Victim selection is delegated to a policy object
//! so the arrays stay agnostic of how recency is tracked.

/// Least Recently Used replacement policy.
pub mod lru;

pub use lru::LruPolicy;

/// Trait for replacement policies.
///
/// Defines the interface for recording use of a way and selecting victims.
pub trait ReplacementPolicy: Send + Sync {
    /// Records an access to `way` of `set`.
    fn touch(&mut self, set: usize, way: usize);

    /// Selects the way of `set` to evict.
    fn victim(&self, set: usize) -> usize;
}
