//! Simulation error definitions.
//!
//! This module defines the fatal error taxonomy of the simulator. It provides:
//! 1. **Register Lifecycle Violations:** Illegal physical register state transitions.
//! 2. **Entry Invariants:** Broken readiness accounting on pipeline entries.
//! 3. **Collaborator Faults:** Unrecognized mnemonics and malformed memory instructions.
//! 4. **Run Aborts:** Commit watchdog expiry and invalid configuration.
//!
//! Structural stalls (full buffers, busy functional units, cache admission denial)
//! are not errors; they are counted in the statistics and retried on a later cycle.

use thiserror::Error;

use crate::common::ids::{AccessId, EntryId};
use crate::core::pipeline::regfile::{PhysicalRegisterId, PhysicalRegisterState};
use crate::isa::{Mnemonic, RegisterDependency};

/// Fatal simulation errors.
///
/// Any of these means the pipeline model can no longer be trusted; the run is
/// aborted and the error is handed to whoever drives the simulation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimError {
    /// A physical register was asked to make a transition its state does not allow.
    #[error("physical register {register} cannot {operation} from state {state:?}")]
    IllegalRegisterTransition {
        /// The register that was operated on.
        register: PhysicalRegisterId,
        /// Name of the attempted operation (`allocate`, `writeback`, ...).
        operation: &'static str,
        /// State the register was in.
        state: PhysicalRegisterState,
    },

    /// A physical register file had no `Available` register although the caller checked.
    #[error("physical register file {0} has no available register")]
    RegisterFileExhausted(&'static str),

    /// An operand-ready notification arrived for an entry with no outstanding operands.
    #[error("entry {0} received more operand notifications than it has sources")]
    NotReadyUnderflow(EntryId),

    /// An effective-address computation reached zero not-ready operands before its
    /// address operand was flagged ready.
    #[error("effective-address entry {0} has no pending operands but its address operand is not ready")]
    AddressOperandNotReady(EntryId),

    /// The instruction stream contained a mnemonic the pipeline cannot classify.
    #[error("unrecognized mnemonic {mnemonic:?} at pc {pc:#x}")]
    UnrecognizedMnemonic {
        /// The offending mnemonic.
        mnemonic: Mnemonic,
        /// Program counter of the instruction.
        pc: u64,
    },

    /// A load or store reached the load/store queue without an effective address.
    #[error("memory instruction at pc {0:#x} carries no effective address")]
    MissingEffectiveAddress(u64),

    /// An architectural register had no mapping in the rename table.
    #[error("architectural register {0} has no physical mapping")]
    UnmappedRegister(RegisterDependency),

    /// A bounded pipeline buffer was pushed past its capacity.
    #[error("{0} overflowed its capacity")]
    BufferOverflow(&'static str),

    /// A queue or buffer referenced an entry that no longer exists.
    #[error("pipeline entry {0} is not present in the entry table")]
    UnknownEntry(EntryId),

    /// A completion signal arrived for an access the coordinator is not tracking.
    #[error("memory access {0} is not in flight")]
    UnknownAccess(AccessId),

    /// No instruction committed on a thread for too many watchdog periods.
    #[error("thread {thread}: no instruction committed for {cycles} cycles ({committed} committed so far)")]
    CommitTimeout {
        /// Global thread id.
        thread: usize,
        /// Length of the final silent period in cycles.
        cycles: u64,
        /// Instructions committed by the thread before the stall.
        committed: u64,
    },

    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used by every pipeline stage.
pub type SimResult<T> = Result<T, SimError>;
