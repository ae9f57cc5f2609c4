//! Trace-driven context.
//!
//! [`TraceContext`] replays a recorded, already-resolved instruction stream. The
//! correct path is the trace itself; while speculative, the context synthesizes
//! single-cycle integer instructions so wrong-path fetch has something to chew on
//! until the misprediction reaches commit.

use std::sync::Arc;

use crate::common::constants::INSTRUCTION_SIZE;
use crate::isa::context::{Context, ContextState, DecodedInstruction};
use crate::isa::instruction::{RegisterDependency, StaticInstruction};
use crate::isa::mnemonic::Mnemonic;

/// One resolved instruction of a trace.
#[derive(Clone, Debug)]
pub struct TraceRecord {
    /// Program counter.
    pub pc: u64,
    /// Decoded instruction.
    pub static_instruction: Arc<StaticInstruction>,
    /// Effective address of a load or store.
    pub effective_address: Option<u64>,
    /// Address of the next instruction actually executed.
    pub next_pc: u64,
}

/// A context that replays a recorded trace.
#[derive(Debug)]
pub struct TraceContext {
    records: Vec<TraceRecord>,
    cursor: usize,
    npc: u64,
    state: ContextState,
    resume_npc: Option<u64>,
    wrong_path: Arc<StaticInstruction>,
    address_space_base: u64,
}

impl TraceContext {
    /// Creates a context replaying `records` from the first one.
    ///
    /// An empty trace starts out finished.
    pub fn new(records: Vec<TraceRecord>) -> Self {
        let npc = records.first().map_or(0, |r| r.pc);
        let state = if records.is_empty() {
            ContextState::Finished
        } else {
            ContextState::Running
        };
        Self {
            records,
            cursor: 0,
            npc,
            state,
            resume_npc: None,
            wrong_path: Arc::new(StaticInstruction::new(
                Mnemonic::Addu,
                Vec::new(),
                vec![RegisterDependency::integer(0)],
            )),
            address_space_base: 0,
        }
    }

    /// Offsets every physical address so contexts on one core do not alias.
    #[must_use]
    pub const fn with_address_space_base(mut self, base: u64) -> Self {
        self.address_space_base = base;
        self
    }

    /// Number of trace records not yet decoded on the correct path.
    pub const fn remaining(&self) -> usize {
        self.records.len() - self.cursor
    }
}

impl Context for TraceContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn decode_next(&mut self) -> Option<DecodedInstruction> {
        if self.state != ContextState::Running {
            return None;
        }

        if self.resume_npc.is_some() {
            let pc = self.npc;
            self.npc = pc + INSTRUCTION_SIZE;
            return Some(DecodedInstruction {
                pc,
                static_instruction: Arc::clone(&self.wrong_path),
                effective_address: None,
            });
        }

        let record = self.records.get(self.cursor)?;
        self.cursor += 1;
        self.npc = record.next_pc;
        let decoded = DecodedInstruction {
            pc: record.pc,
            static_instruction: Arc::clone(&record.static_instruction),
            effective_address: record.effective_address,
        };
        if self.cursor == self.records.len() {
            self.state = ContextState::Finished;
        }
        Some(decoded)
    }

    fn npc(&self) -> u64 {
        self.npc
    }

    fn set_npc(&mut self, npc: u64) {
        self.npc = npc;
    }

    fn is_speculative(&self) -> bool {
        self.resume_npc.is_some()
    }

    fn enter_speculative_state(&mut self) {
        self.resume_npc = Some(self.npc);
    }

    fn exit_speculative_state(&mut self) {
        if let Some(npc) = self.resume_npc.take() {
            self.npc = npc;
        }
    }

    fn physical_address(&self, virtual_address: u64) -> u64 {
        virtual_address.wrapping_add(self.address_space_base)
    }
}

/// Fluent builder for traces with sequential program counters.
#[derive(Debug)]
pub struct TraceBuilder {
    records: Vec<TraceRecord>,
    pc: u64,
}

impl TraceBuilder {
    /// Starts a trace at `start_pc`.
    pub const fn new(start_pc: u64) -> Self {
        Self {
            records: Vec::new(),
            pc: start_pc,
        }
    }

    fn append(mut self, instruction: StaticInstruction, effective_address: Option<u64>, next_pc: u64) -> Self {
        self.records.push(TraceRecord {
            pc: self.pc,
            static_instruction: Arc::new(instruction),
            effective_address,
            next_pc,
        });
        self.pc = next_pc;
        self
    }

    /// Appends a non-memory, non-branching instruction.
    #[must_use]
    pub fn op(self, instruction: StaticInstruction) -> Self {
        let next = self.pc + INSTRUCTION_SIZE;
        self.append(instruction, None, next)
    }

    /// Appends a load or store touching `effective_address`.
    #[must_use]
    pub fn memory(self, instruction: StaticInstruction, effective_address: u64) -> Self {
        let next = self.pc + INSTRUCTION_SIZE;
        self.append(instruction, Some(effective_address), next)
    }

    /// Appends a control instruction; execution continues at `target` if `taken`.
    #[must_use]
    pub fn branch(self, instruction: StaticInstruction, target: u64, taken: bool) -> Self {
        let next = if taken { target } else { self.pc + INSTRUCTION_SIZE };
        self.append(instruction, None, next)
    }

    /// Returns the recorded instructions.
    pub fn into_records(self) -> Vec<TraceRecord> {
        self.records
    }

    /// Builds a context replaying the trace.
    pub fn build(self) -> TraceContext {
        TraceContext::new(self.records)
    }
}
