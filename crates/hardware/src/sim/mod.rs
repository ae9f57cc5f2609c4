//! Simulation driver and deferred events.
//!
//! Provides the event queue that carries asynchronous completions between
//! cycles and the `Simulation` that clocks every core through the fast-forward,
//! warmup and measurement phases.

/// Event queue and per-cycle context.
pub mod event;

/// Multicore simulation driver.
pub mod simulator;

pub use self::simulator::{Simulation, SimulationMode};
