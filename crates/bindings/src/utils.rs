//! Utility functions exposed to Python.
//!
//! Provides version and logging helpers for the `oosim` module.

use pyo3::prelude::*;
use tracing_subscriber::EnvFilter;

/// Returns the simulator version string (e.g., for scripting or diagnostics).
///
/// # Returns
///
/// The crate version, such as `"0.4.0"`.
#[pyfunction]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Installs a `tracing` subscriber printing to stderr.
///
/// # Arguments
///
/// * `filter` - An `EnvFilter` directive such as `"oosim_core=debug"`; falls
///   back to `RUST_LOG`, then to `warn`.
///
/// # Returns
///
/// `False` if a subscriber was already installed.
#[pyfunction]
#[pyo3(signature = (filter=None))]
pub fn init_logging(filter: Option<String>) -> bool {
    let filter = filter.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        EnvFilter::new,
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
