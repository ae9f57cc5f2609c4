//! Process and address-space collaborator.
//!
//! A [`Context`] is the software thread a hardware thread runs. It functionally
//! executes instructions ahead of the timing model, supplies them decoded, and
//! translates addresses. The pipeline drives it through a small protocol:
//! 1. **Decode:** `decode_next` executes the instruction at `npc` and returns it.
//! 2. **Redirect:** When fetch follows a predicted path that disagrees with `npc`,
//!    the context enters speculative state and is steered with `set_npc`.
//! 3. **Recovery:** At commit of the first wrong-path instruction the context
//!    leaves speculative state and `npc` is again the architectural resume point.

use std::fmt;
use std::sync::Arc;

use crate::common::constants::INSTRUCTION_SIZE;
use crate::isa::instruction::StaticInstruction;

/// Execution state of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// Executing; fetch may decode from it.
    Running,
    /// Waiting on an external event; nothing to fetch.
    Blocked,
    /// Has executed its last instruction.
    Finished,
}

/// An instruction returned by [`Context::decode_next`].
#[derive(Clone, Debug)]
pub struct DecodedInstruction {
    /// Program counter of the instruction.
    pub pc: u64,
    /// The decoded instruction.
    pub static_instruction: Arc<StaticInstruction>,
    /// Virtual effective address for loads and stores.
    pub effective_address: Option<u64>,
}

/// Software context bound to a hardware thread.
pub trait Context: Send + Sync + fmt::Debug {
    /// Current execution state.
    fn state(&self) -> ContextState;

    /// Functionally executes the instruction at `npc` and returns it decoded.
    ///
    /// Returns `None` when there is nothing left to execute.
    fn decode_next(&mut self) -> Option<DecodedInstruction>;

    /// Address of the next instruction `decode_next` will return.
    fn npc(&self) -> u64;

    /// Address of the instruction after `npc`.
    fn nnpc(&self) -> u64 {
        self.npc() + INSTRUCTION_SIZE
    }

    /// Redirects execution; only called while speculative.
    fn set_npc(&mut self, npc: u64);

    /// Returns true while executing down a predicted wrong path.
    fn is_speculative(&self) -> bool;

    /// Checkpoints architectural state before following a predicted path.
    fn enter_speculative_state(&mut self);

    /// Discards speculative state and restores the checkpoint.
    fn exit_speculative_state(&mut self);

    /// Translates a virtual address in this context's address space.
    fn physical_address(&self, virtual_address: u64) -> u64;
}
