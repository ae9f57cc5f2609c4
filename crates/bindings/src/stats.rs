//! Statistics export.
//!
//! `SimStats` is serialized through JSON into a plain Python dict, with derived
//! values (IPC, committed total) added on top, so scripts can store or compare
//! runs without a dedicated wrapper class.

use oosim_core::SimStats;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Converts a statistics snapshot to a Python dict.
///
/// # Arguments
///
/// * `py` - Python interpreter handle.
/// * `stats` - The snapshot to export.
///
/// # Returns
///
/// A dict with `cycles`, `measurement_cycles`, `threads`, `cores`,
/// `committed_instructions` and `ipc`.
pub fn stats_to_dict(py: Python<'_>, stats: &SimStats) -> PyResult<PyObject> {
    let json = serde_json::to_string(stats).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let value = py.import("json")?.getattr("loads")?.call1((json,))?;
    let dict = value.downcast::<PyDict>()?;
    dict.set_item("committed_instructions", stats.committed_instructions())?;
    dict.set_item("ipc", stats.ipc())?;
    Ok(value.unbind())
}
