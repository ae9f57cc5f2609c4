//! Main Execution Loop.
//!
//! This module implements one cycle of a core in each simulation mode. It
//! performs the following:
//! 1. **Measurement:** Runs the pipeline stages in reverse pipeline order, then
//!    samples the per-cycle occupancy counters.
//! 2. **Fast-Forward:** Executes one instruction per running thread through its
//!    context, bypassing the pipeline and the memory hierarchy.
//! 3. **Warmup:** Replays each instruction's fetch, load and store accesses
//!    through the memory access coordinator to warm caches and TLBs.
//! 4. **Events:** Routes deferred functional-unit and memory completions back
//!    into the core.
//! 5. **Retirement:** Detaches contexts that have finished and drained.

use crate::common::constants::align_down;
use crate::common::error::SimResult;
use crate::core::cpu::{AccessWaiter, Core};
use crate::core::pipeline::stages::{
    commit_stage, dispatch_stage, fetch_stage, issue_stage, refresh_stage, rename_stage, writeback_stage,
};
use crate::isa::{Context, ContextState, StaticInstructionType};
use crate::sim::event::{CycleContext, Event};

impl Core {
    /// Runs one pipeline cycle.
    ///
    /// Stages run commit first and fetch last, so no stage sees what an earlier
    /// stage produced in the same cycle.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal invariant violation raised by a stage.
    pub fn do_measurement_one_cycle(&mut self, cx: &mut CycleContext<'_>) -> SimResult<()> {
        commit_stage(self, cx)?;
        writeback_stage(self)?;
        refresh_stage(self);
        self.queues.wakeup(&self.entries);
        issue_stage(self, cx)?;
        dispatch_stage(self, cx)?;
        rename_stage(self, cx)?;
        fetch_stage(self, cx)?;
        self.update_per_cycle_stats();
        Ok(())
    }

    /// Samples buffer, register file and functional unit occupancy.
    pub fn update_per_cycle_stats(&mut self) {
        for t in &mut self.threads {
            if t.decode_buffer.is_full() {
                t.stats.decode_buffer_full_cycles += 1;
            }
            if t.reorder_buffer.is_full() {
                t.stats.reorder_buffer_full_cycles += 1;
            }
            if t.load_store_queue.is_full() {
                t.stats.load_store_queue_full_cycles += 1;
            }
        }
        for file in self.register_files.iter() {
            if file.is_full() {
                self.stats.register_file_full_cycles[file.kind().index()] += 1;
            }
        }
        self.functional_units.update_per_cycle_stats();
    }

    /// Executes one instruction per running thread without timing.
    ///
    /// # Returns
    ///
    /// The number of instructions executed, nops excluded.
    pub fn do_fast_forward_one_cycle(&mut self, _cx: &mut CycleContext<'_>) -> u64 {
        let mut executed = 0;
        for t in &mut self.threads {
            let Some(ctx) = t.context.as_mut() else {
                continue;
            };
            if decode_non_nop(ctx.as_mut()).is_some() {
                t.stats.fast_forwarded_instructions += 1;
                executed += 1;
            }
        }
        executed
    }

    /// Replays one instruction per thread through the memory hierarchy.
    ///
    /// A thread decodes its next instruction, fetches its line if it is not
    /// the last line fetched, then issues its load or store. An instruction
    /// whose access is refused is kept and retried next cycle.
    ///
    /// # Returns
    ///
    /// The number of instructions executed, nops excluded.
    pub fn do_warmup_one_cycle(&mut self, cx: &mut CycleContext<'_>) -> u64 {
        (0..self.threads.len()).map(|thread| self.warmup_thread(thread, cx)).sum()
    }

    fn warmup_thread(&mut self, thread: usize, cx: &mut CycleContext<'_>) -> u64 {
        let line_size = self.l1i.line_size();
        let t = &mut self.threads[thread];
        if !t.is_running() || t.fetch_stalled {
            return 0;
        }

        let mut executed = 0;
        if t.warmup_instruction.is_none() {
            if let Some(ctx) = t.context.as_mut() {
                t.warmup_instruction = decode_non_nop(ctx.as_mut());
            }
            if t.warmup_instruction.is_some() {
                t.stats.warmup_instructions += 1;
                executed = 1;
            }
        }
        let Some(instruction) = t.warmup_instruction.clone() else {
            return executed;
        };

        let pc = instruction.pc;
        let line = align_down(pc, line_size);
        if t.last_fetched_cache_line != Some(line) {
            if !self.can_ifetch(thread, pc) {
                return executed;
            }
            self.ifetch(thread, pc, pc, AccessWaiter::Fetch { thread }, cx);
            let t = &mut self.threads[thread];
            t.fetch_stalled = true;
            t.last_fetched_cache_line = Some(line);
        }

        let replayed = match (instruction.static_instruction.kind(), instruction.effective_address) {
            (StaticInstructionType::Load, Some(address)) => {
                let admitted = self.can_load(thread, address);
                if admitted {
                    self.load(thread, address, pc, AccessWaiter::Warmup, cx);
                }
                admitted
            }
            (StaticInstructionType::Store, Some(address)) => {
                let admitted = self.can_store(thread, address);
                if admitted {
                    self.store(thread, address, pc, AccessWaiter::Warmup, cx);
                }
                admitted
            }
            _ => true,
        };
        if replayed {
            self.threads[thread].warmup_instruction = None;
        }
        executed
    }

    /// Applies a deferred event addressed to this core.
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownAccess` if a memory event names an access the
    /// coordinator never started.
    pub fn handle_event(&mut self, event: Event) -> SimResult<()> {
        match event {
            Event::FunctionalUnitReleased {
                unit, index, generation, ..
            } => self.functional_units.release(unit, index, generation),
            Event::FunctionalUnitCompleted { entry, .. } => self.signal_completed(entry),
            Event::TranslationCompleted { access, .. } => self.on_translation_completed(access)?,
            Event::CacheServiced { cache, tag, .. } => self.on_cache_serviced(cache, tag)?,
        }
        Ok(())
    }

    /// Points every thread's fetch at its context's next instruction.
    pub fn resync_fetch(&mut self, now: u64) {
        for t in &mut self.threads {
            t.resync_fetch(now);
        }
    }

    /// Detaches the contexts that have finished and whose last instruction has
    /// left the pipeline.
    ///
    /// # Returns
    ///
    /// The detached contexts, in thread order.
    pub fn retire_finished_contexts(&mut self) -> Vec<Box<dyn Context>> {
        let mut retired = Vec::new();
        for t in &mut self.threads {
            if !t.is_retirable() {
                continue;
            }
            if let Some(ctx) = t.detach() {
                tracing::debug!(
                    core = self.id,
                    thread = t.id,
                    committed = t.stats.committed_instructions,
                    "context retired"
                );
                retired.push(ctx);
            }
        }
        retired
    }
}

/// Decodes until an instruction other than a nop comes out or the context
/// stops running.
fn decode_non_nop(ctx: &mut dyn Context) -> Option<crate::isa::DecodedInstruction> {
    while ctx.state() == ContextState::Running {
        let decoded = ctx.decode_next()?;
        if decoded.static_instruction.kind() != StaticInstructionType::Nop {
            return Some(decoded);
        }
    }
    None
}
