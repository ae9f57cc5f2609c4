//! Monotonic identifiers.
//!
//! Entry, instruction and memory-access ids are handed out by a single
//! [`IdGenerator`] owned by the simulation and threaded into every stage that
//! creates one, so ids are unique per run and there is no process-wide state.

use std::fmt;

use serde::Serialize;

/// Identifier of a pipeline entry (ROB or LSQ).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntryId(pub u64);

/// Identifier of a dynamic instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct InstructionId(pub u64);

/// Identifier of a memory hierarchy access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AccessId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

impl fmt::Display for AccessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Source of all monotonic ids in one simulation.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator {
    next_entry: u64,
    next_instruction: u64,
    next_access: u64,
}

impl IdGenerator {
    /// Creates a generator whose first id of every kind is zero.
    pub const fn new() -> Self {
        Self {
            next_entry: 0,
            next_instruction: 0,
            next_access: 0,
        }
    }

    /// Returns the next pipeline entry id.
    pub const fn next_entry_id(&mut self) -> EntryId {
        let id = EntryId(self.next_entry);
        self.next_entry += 1;
        id
    }

    /// Returns the next dynamic instruction id.
    pub const fn next_instruction_id(&mut self) -> InstructionId {
        let id = InstructionId(self.next_instruction);
        self.next_instruction += 1;
        id
    }

    /// Returns the next memory access id.
    pub const fn next_access_id(&mut self) -> AccessId {
        let id = AccessId(self.next_access);
        self.next_access += 1;
        id
    }
}
