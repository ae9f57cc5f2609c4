//! Dispatch Stage.
//!
//! Dispatch moves renamed ROB entries into the issue queues. Loads and stores
//! are split here: the ROB entry becomes the effective-address computation and
//! a paired LSQ entry is created that owns the memory access itself.

use crate::common::error::{SimError, SimResult};
use crate::common::ids::EntryId;
use crate::core::cpu::Core;
use crate::core::pipeline::entry::PipelineEntry;
use crate::core::pipeline::regfile::DependentKind;
use crate::sim::event::CycleContext;

/// Dispatches up to the decode width across threads, round-robin.
///
/// # Errors
///
/// Propagates any fatal error from dispatching a single entry.
pub fn dispatch_stage(core: &mut Core, cx: &mut CycleContext<'_>) -> SimResult<()> {
    let Some(mut scheduler) = core.dispatch_scheduler.take() else {
        return Ok(());
    };
    let num_threads = core.threads.len();
    let width = core.processor.decode_width;
    let result = scheduler.consume(num_threads, width, &mut |thread| {
        if core.threads[thread].context.is_none() {
            return Ok(false);
        }
        dispatch_one(core, thread, cx)
    });
    core.dispatch_scheduler = Some(scheduler);
    result.map(|_| ())
}

/// Dispatches the oldest undispatched ROB entry of `thread`.
///
/// # Returns
///
/// `false` if nothing is waiting for dispatch, or if a load or store finds the
/// LSQ full (counted as a stall).
///
/// # Errors
///
/// Returns `SimError::MissingEffectiveAddress` for a memory instruction
/// without an address and `SimError::BufferOverflow` if the LSQ overflows.
pub fn dispatch_one(core: &mut Core, thread: usize, cx: &mut CycleContext<'_>) -> SimResult<bool> {
    let t = &mut core.threads[thread];
    let Some(id) = t
        .reorder_buffer
        .iter()
        .copied()
        .find(|&id| core.entries.get(id).is_some_and(|e| !e.dispatched))
    else {
        return Ok(false);
    };

    let memory = core.entries.expect(id)?.is_effective_address_computation();
    if memory && t.load_store_queue.is_full() {
        t.stats.dispatch_stalls_load_store_queue_full += 1;
        return Ok(false);
    }

    let rob = core.entries.expect_mut(id)?;
    rob.dispatched = true;
    if rob.is_all_operand_ready() {
        core.queues.ready_instructions.push(id);
    } else {
        core.queues.waiting_instructions.push(id);
    }

    if memory {
        let lsq_id = cx.ids.next_entry_id();
        let lsq = new_load_store_entry(core, id, lsq_id)?;
        let store = lsq.is_store();
        let ready = lsq.is_all_operand_ready();
        core.entries.expect_mut(id)?.link_load_store(lsq_id);
        core.threads[thread]
            .load_store_queue
            .push(lsq_id)
            .map_err(|_| SimError::BufferOverflow("load/store queue"))?;
        if store {
            if ready {
                core.queues.ready_stores.push(lsq_id);
            } else {
                core.queues.waiting_stores.push(lsq_id);
            }
        }
        tracing::trace!(thread, entry = %id, lsq = %lsq_id, store, "dispatched memory operation");
        core.entries.insert(lsq);
    } else {
        tracing::trace!(thread, entry = %id, "dispatched");
    }
    Ok(true)
}

/// Builds the LSQ entry of ROB entry `rob_id` and registers it on the sources
/// it still waits for.
fn new_load_store_entry(core: &mut Core, rob_id: EntryId, lsq_id: EntryId) -> SimResult<PipelineEntry> {
    let rob = core.entries.expect(rob_id)?;
    let mut lsq = PipelineEntry::load_store(lsq_id, rob)?;
    let base = rob
        .instruction
        .static_instruction
        .base_address_register()
        .and_then(|dep| rob.source_physical_registers.get(&dep).copied());

    let mut sources: Vec<_> = lsq.source_physical_registers.values().copied().collect();
    sources.sort_unstable();
    sources.dedup();
    for physical in sources {
        if !core.register_files.is_ready(physical) {
            lsq.num_not_ready_operands += 1;
            core.register_files
                .file_mut(physical.kind)
                .add_dependent(physical, DependentKind::Generic, lsq_id);
        }
    }

    match base {
        Some(physical) if !core.register_files.is_ready(physical) => {
            core.register_files
                .file_mut(physical.kind)
                .add_dependent(physical, DependentKind::StoreAddress, lsq_id);
        }
        _ => lsq.set_store_address_ready(),
    }
    lsq.dispatched = true;
    Ok(lsq)
}
