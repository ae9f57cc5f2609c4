//! Python to Rust conversion.
//!
//! Python dicts and lists are serialized to JSON and deserialized into the core
//! types, so Python callers and JSON config files share one schema.

use std::sync::Arc;

use oosim_core::SimError;
use oosim_core::common::constants::INSTRUCTION_SIZE;
use oosim_core::config::Config;
use oosim_core::isa::{Mnemonic, RegisterDependency, StaticInstruction, TraceContext, TraceRecord};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use serde::Deserialize;

/// Spacing between the address spaces of different traces.
const ADDRESS_SPACE_STRIDE: u64 = 1 << 40;

fn to_json(py: Python<'_>, obj: &Bound<'_, PyAny>) -> PyResult<String> {
    py.import("json")?.getattr("dumps")?.call1((obj,))?.extract()
}

/// Maps a fatal simulator error onto `RuntimeError`.
pub fn sim_error_to_py(error: SimError) -> PyErr {
    PyRuntimeError::new_err(error.to_string())
}

/// Converts a Python dict to a validated simulator `Config`.
///
/// # Arguments
///
/// * `py` - Python interpreter handle.
/// * `dict` - A dict mirroring the JSON config schema (`processor`, `l1d`, ...).
///
/// # Returns
///
/// The deserialized `Config`, or a `ValueError` if the dict is invalid.
pub fn py_dict_to_config(py: Python<'_>, dict: &Bound<'_, PyAny>) -> PyResult<Config> {
    let json = to_json(py, dict)?;
    Config::from_json(&json).map_err(|e| PyValueError::new_err(format!("Invalid config: {e}")))
}

/// One trace item as written from Python.
#[derive(Debug, Deserialize)]
struct TraceItem {
    pc: u64,
    mnemonic: Mnemonic,
    #[serde(default)]
    inputs: Vec<String>,
    #[serde(default)]
    outputs: Vec<String>,
    #[serde(default)]
    effective_address: Option<u64>,
    #[serde(default)]
    next_pc: Option<u64>,
}

fn parse_registers(names: &[String]) -> Result<Vec<RegisterDependency>, String> {
    names.iter().map(|name| name.parse()).collect()
}

impl TraceItem {
    fn into_record(self) -> Result<TraceRecord, String> {
        let instruction = StaticInstruction::new(
            self.mnemonic,
            parse_registers(&self.inputs)?,
            parse_registers(&self.outputs)?,
        );
        if instruction.mnemonic.is_memory() && self.effective_address.is_none() {
            return Err(format!("{:?} at {:#x} has no effective_address", self.mnemonic, self.pc));
        }
        Ok(TraceRecord {
            pc: self.pc,
            static_instruction: Arc::new(instruction),
            effective_address: self.effective_address,
            next_pc: self.next_pc.unwrap_or(self.pc + INSTRUCTION_SIZE),
        })
    }
}

/// Converts a list of trace item dicts into a trace context.
///
/// # Arguments
///
/// * `py` - Python interpreter handle.
/// * `items` - Dicts with `pc`, `mnemonic`, `inputs`, `outputs` and optionally
///   `effective_address` and `next_pc`.
/// * `index` - Position of the trace; selects a private address space.
///
/// # Returns
///
/// The trace context, or a `ValueError` naming the first malformed item.
pub fn py_list_to_trace(py: Python<'_>, items: &Bound<'_, PyAny>, index: usize) -> PyResult<TraceContext> {
    let json = to_json(py, items)?;
    let items: Vec<TraceItem> =
        serde_json::from_str(&json).map_err(|e| PyValueError::new_err(format!("Invalid trace {index}: {e}")))?;
    let records = items
        .into_iter()
        .map(TraceItem::into_record)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PyValueError::new_err(format!("Invalid trace {index}: {e}")))?;
    Ok(TraceContext::new(records).with_address_space_base(index as u64 * ADDRESS_SPACE_STRIDE))
}
