//! Hardware thread state.
//!
//! A [`Thread`] is one SMT context of a core. It owns everything that is
//! private to the instruction stream it runs:
//! 1. **Buffers:** The decode buffer, the reorder buffer and the load/store
//!    queue, all bounded.
//! 2. **Renaming:** The rename table into the core's shared register files.
//! 3. **Prediction and translation:** A branch predictor and its ITLB/DTLB.
//! 4. **Fetch state:** The fetch pc, the last fetched line and the fetch stall.
//! 5. **Bookkeeping:** Commit watchdog state, retirement tracking and counters.

use std::fmt;

use crate::common::error::SimResult;
use crate::common::ids::{EntryId, InstructionId};
use crate::config::Config;
use crate::core::pipeline::buffer::PipelineBuffer;
use crate::core::pipeline::entry::DecodeBufferEntry;
use crate::core::pipeline::regfile::RegisterFiles;
use crate::core::pipeline::rename_table::RenameTable;
use crate::core::units::bru::BranchPredictorWrapper;
use crate::core::units::mmu::Mmu;
use crate::isa::{Context, ContextState, DecodedInstruction};
use crate::stats::ThreadStats;

/// One hardware thread of a core.
pub struct Thread {
    /// Global thread id.
    pub id: usize,
    /// Index within the owning core.
    pub index: usize,
    /// Software context currently bound, if any.
    pub context: Option<Box<dyn Context>>,
    /// Fetched instructions awaiting rename.
    pub decode_buffer: PipelineBuffer<DecodeBufferEntry>,
    /// Renamed instructions in program order.
    pub reorder_buffer: PipelineBuffer<EntryId>,
    /// Load/store queue entries in program order.
    pub load_store_queue: PipelineBuffer<EntryId>,
    /// Architectural-to-physical register map.
    pub rename_table: RenameTable,
    /// Direction and target predictor.
    pub branch_predictor: BranchPredictorWrapper,
    /// Instruction and data translation buffers.
    pub mmu: Mmu,
    /// Address fetch continues at.
    pub fetch_npc: u64,
    /// Waiting for an instruction line.
    pub fetch_stalled: bool,
    /// Line most recently requested from the instruction cache.
    pub last_fetched_cache_line: Option<u64>,
    /// Last correct-path instruction decoded before the context finished.
    pub last_decoded_instruction: Option<InstructionId>,
    /// Set once `last_decoded_instruction` has committed.
    pub last_instruction_committed: bool,
    /// Cycle of the latest commit, for the watchdog.
    pub last_commit_cycle: u64,
    /// Watchdog expirations since the latest commit.
    pub consecutive_commit_timeouts: u32,
    /// Instruction decoded but not yet replayed through the caches in warmup.
    pub warmup_instruction: Option<DecodedInstruction>,
    /// Counters.
    pub stats: ThreadStats,
}

impl Thread {
    /// Creates an idle thread, seeding its rename table from `files`.
    ///
    /// # Arguments
    ///
    /// * `id` - Global thread id.
    /// * `index` - Index within the core.
    /// * `config` - Simulator configuration.
    /// * `files` - The core's shared register files.
    ///
    /// # Errors
    ///
    /// Propagates register file exhaustion while seeding the rename table.
    pub fn new(id: usize, index: usize, config: &Config, files: &mut RegisterFiles) -> SimResult<Self> {
        let p = &config.processor;
        Ok(Self {
            id,
            index,
            context: None,
            decode_buffer: PipelineBuffer::new(p.decode_buffer_capacity),
            reorder_buffer: PipelineBuffer::new(p.reorder_buffer_capacity),
            load_store_queue: PipelineBuffer::new(p.load_store_queue_capacity),
            rename_table: RenameTable::seeded(files)?,
            branch_predictor: BranchPredictorWrapper::new(&config.branch_predictor),
            mmu: Mmu::new(&config.tlb),
            fetch_npc: 0,
            fetch_stalled: false,
            last_fetched_cache_line: None,
            last_decoded_instruction: None,
            last_instruction_committed: false,
            last_commit_cycle: 0,
            consecutive_commit_timeouts: 0,
            warmup_instruction: None,
            stats: ThreadStats::new(id),
        })
    }

    /// Binds a context and points fetch at its next instruction.
    pub fn attach(&mut self, context: Box<dyn Context>) {
        self.fetch_npc = context.npc();
        self.context = Some(context);
        self.fetch_stalled = false;
        self.last_fetched_cache_line = None;
        self.last_decoded_instruction = None;
        self.last_instruction_committed = false;
        self.warmup_instruction = None;
    }

    /// Unbinds and returns the context.
    pub fn detach(&mut self) -> Option<Box<dyn Context>> {
        self.warmup_instruction = None;
        self.context.take()
    }

    /// Returns true if a context is bound and running.
    pub fn is_running(&self) -> bool {
        self.context
            .as_ref()
            .is_some_and(|ctx| ctx.state() == ContextState::Running)
    }

    /// Returns true once the bound context has finished and nothing it issued
    /// is left in the pipeline.
    pub fn is_retirable(&self) -> bool {
        let finished = self
            .context
            .as_ref()
            .is_some_and(|ctx| ctx.state() == ContextState::Finished);
        let drained = match self.last_decoded_instruction {
            Some(_) => self.last_instruction_committed,
            None => self.reorder_buffer.is_empty() && self.decode_buffer.is_empty(),
        };
        finished && drained
    }

    /// Points fetch at the context's next instruction.
    ///
    /// Called when the pipeline takes over from a functional phase.
    pub fn resync_fetch(&mut self, now: u64) {
        if let Some(ctx) = self.context.as_ref() {
            self.fetch_npc = ctx.npc();
        }
        self.last_fetched_cache_line = None;
        self.last_commit_cycle = now;
        self.consecutive_commit_timeouts = 0;
        self.warmup_instruction = None;
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("context", &self.context.as_ref().map(|ctx| ctx.state()))
            .field("fetch_npc", &format_args!("{:#x}", self.fetch_npc))
            .field("fetch_stalled", &self.fetch_stalled)
            .field("decode_buffer", &self.decode_buffer.len())
            .field("reorder_buffer", &self.reorder_buffer.len())
            .field("load_store_queue", &self.load_store_queue.len())
            .finish_non_exhaustive()
    }
}
