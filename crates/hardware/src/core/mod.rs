//! Core processor implementation.
//!
//! This module contains the out-of-order core: the composed `Core` and its
//! hardware threads, the pipeline structures and stages they run, and the
//! execution units and memory-side collaborators they arbitrate for.

/// Core and thread state, per-cycle execution and memory access coordination.
pub mod cpu;

/// Pipeline structures and stages (registers, entries, queues, schedulers).
pub mod pipeline;

/// Execution units (functional units, branch predictors, caches, TLBs).
pub mod units;

pub use self::cpu::Core;
