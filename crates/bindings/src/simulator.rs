//! Simulation Python binding.
//!
//! Exposes the simulator to Python: build from a config dict and one trace per
//! hardware thread, step or run to completion, and read statistics back.

use oosim_core::isa::Context;
use oosim_core::{Config, Simulation};
use pyo3::prelude::*;

use crate::conversion::{py_dict_to_config, py_list_to_trace, sim_error_to_py};
use crate::stats::stats_to_dict;

/// Cycles between checks for a pending `KeyboardInterrupt`.
const SIGNAL_CHECK_INTERVAL: u64 = 1 << 16;

/// Python-exposed simulation: wraps `Simulation` for stepping and running from Python.
#[pyclass]
#[derive(Debug)]
pub struct PySimulator {
    /// The wrapped simulation.
    pub inner: Simulation,
}

#[pymethods]
impl PySimulator {
    /// Creates a simulation.
    ///
    /// # Arguments
    ///
    /// * `py` - Python interpreter token.
    /// * `config` - Config dict, or `None` for the defaults.
    /// * `traces` - One list of trace item dicts per hardware thread, bound in
    ///   global thread order.
    ///
    /// # Errors
    ///
    /// Returns a `ValueError` for a malformed config or trace and a
    /// `RuntimeError` if the simulation cannot be built.
    #[new]
    #[pyo3(signature = (config, traces))]
    fn new(py: Python<'_>, config: Option<&Bound<'_, PyAny>>, traces: Vec<Bound<'_, PyAny>>) -> PyResult<Self> {
        let config = match config {
            Some(dict) if !dict.is_none() => py_dict_to_config(py, dict)?,
            _ => Config::default(),
        };
        let contexts = traces
            .iter()
            .enumerate()
            .map(|(index, items)| py_list_to_trace(py, items, index).map(|t| Box::new(t) as Box<dyn Context>))
            .collect::<PyResult<Vec<_>>>()?;
        let inner = Simulation::new(&config, contexts).map_err(sim_error_to_py)?;
        Ok(Self { inner })
    }

    /// Advances the simulation by `n` cycles, stopping early once it is done.
    ///
    /// # Errors
    ///
    /// Returns a `RuntimeError` if the run aborts, or the pending exception if
    /// Python was interrupted.
    #[pyo3(signature = (n=1))]
    fn step(&mut self, py: Python<'_>, n: u64) -> PyResult<()> {
        for i in 0..n {
            if self.inner.is_done() {
                break;
            }
            self.inner.step().map_err(sim_error_to_py)?;
            if i % SIGNAL_CHECK_INTERVAL == SIGNAL_CHECK_INTERVAL - 1 {
                py.check_signals()?;
            }
        }
        Ok(())
    }

    /// Runs until every trace retires or the configured cycle limit is hit.
    ///
    /// # Returns
    ///
    /// The final statistics as a dict.
    ///
    /// # Errors
    ///
    /// Returns a `RuntimeError` if the run aborts.
    fn run(&mut self, py: Python<'_>) -> PyResult<PyObject> {
        let inner = &mut self.inner;
        let stats = py.allow_threads(|| inner.run()).map_err(sim_error_to_py)?;
        stats_to_dict(py, &stats)
    }

    /// Current cycle.
    #[getter]
    fn cycle(&self) -> u64 {
        self.inner.cycle()
    }

    /// Returns true once every trace has retired.
    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    /// Current statistics as a dict.
    fn stats(&self, py: Python<'_>) -> PyResult<PyObject> {
        stats_to_dict(py, &self.inner.stats())
    }

    /// Prints the text report. Options: "summary", "threads",
    /// "functional_units", "memory". Pass nothing for the full report.
    #[pyo3(signature = (sections=None))]
    fn print_stats(&self, sections: Option<Vec<String>>) {
        self.inner.stats().print_sections(&sections.unwrap_or_default());
    }
}
