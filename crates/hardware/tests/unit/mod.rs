//! # Unit Components
//!
//! This module serves as the central hub for the simulator's unit tests. It
//! organizes them the way the crate is organized: configuration, the core and
//! its pipeline, the simulation driver and statistics.

/// Configuration parsing, defaults and validation.
pub mod config;



/// Statistics aggregation and report rendering.
pub mod stats;
