//! Execution units and memory-side collaborators.
//!
//! This module contains the resources a core's pipeline arbitrates for: the
//! functional unit pool, the per-thread branch predictors and translation
//! buffers, and the first-level cache controllers.

/// Branch prediction: predictors, BTB and return address stack.
pub mod bru;

/// First-level cache controllers and replacement policies.
pub mod cache;

/// Functional unit pool and operation latencies.
pub mod fu;

/// Translation lookaside buffers.
pub mod mmu;
