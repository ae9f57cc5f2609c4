//! Common types and constants used throughout the simulator.
//!
//! This module provides the building blocks shared by every other component:
//! 1. **Identifiers:** Monotonic entry, instruction and access ids and their generator.
//! 2. **Constants:** Architectural register counts and instruction geometry.
//! 3. **Error Handling:** The fatal `SimError` taxonomy and the `SimResult` alias.

/// Architectural constants.
pub mod constants;

/// Error types.
pub mod error;

/// Monotonic identifiers.
pub mod ids;

pub use constants::{INSTRUCTION_SIZE, NUM_FLOAT_REGISTERS, NUM_INT_REGISTERS, NUM_MISC_REGISTERS};
pub use error::{SimError, SimResult};
pub use ids::{AccessId, EntryId, IdGenerator, InstructionId};
