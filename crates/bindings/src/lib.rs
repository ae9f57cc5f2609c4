//! Python bindings for the out-of-order core simulator.
//!
//! This crate exposes the simulator to Python via PyO3. It provides:
//! 1. **Simulation:** `PySimulator` for building a run from a config dict and
//!    instruction traces, stepping it and running it to completion.
//! 2. **Statistics:** Counters returned as plain dicts, plus the text report.
//! 3. **Utilities:** Version string and tracing setup.

use pyo3::prelude::*;

/// Python dict to Rust `Config` and trace conversion.
pub mod conversion;
/// Simulation binding (`PySimulator`).
pub mod simulator;
/// Statistics export helpers.
pub mod stats;
/// Utility functions (version, logging).
pub mod utils;

/// Registers all simulator classes and functions onto the given Python module.
///
/// # Arguments
///
/// * `m` - The Python module to register types and functions on.
///
/// # Returns
///
/// `Ok(())` on success, or a `PyErr` if registration fails.
pub fn register_simulator_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<simulator::PySimulator>()?;
    m.add_function(wrap_pyfunction!(utils::version, m)?)?;
    m.add_function(wrap_pyfunction!(utils::init_logging, m)?)?;
    Ok(())
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    register_simulator_module(m)
}
