//! Out-of-order SMT core simulator library.
//!
//! This crate implements a cycle-accurate model of a multicore, multithreaded,
//! out-of-order superscalar processor with the following:
//! 1. **Core:** Register renaming, ROB and LSQ, issue/wakeup/writeback/commit,
//!    speculative execution with squash recovery.
//! 2. **Units:** Functional unit pool, branch predictors, L1 cache controllers
//!    and TLBs, joined by a memory access coordinator.
//! 3. **ISA:** The decoded-instruction surface and the `Context` collaborator,
//!    with a trace-replaying implementation.
//! 4. **Simulation:** Event queue, fast-forward, warmup and measurement phases.
//! 5. **Statistics:** Per-thread and per-core counters with a text report.

/// Common types and constants (ids, errors, architectural register counts).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Out-of-order core (threads, pipeline, execution units).
pub mod core;
/// Instruction surface and contexts (mnemonics, instructions, traces).
pub mod isa;
/// Event queue and simulation driver.
pub mod sim;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// One out-of-order core with its hardware threads.
pub use crate::core::Core;
/// Fatal simulation error and its result alias.
pub use crate::common::error::{SimError, SimResult};
/// Top-level driver; construct with `Simulation::new`.
pub use crate::sim::Simulation;
/// Counters snapshot returned by a run.
pub use crate::stats::SimStats;
