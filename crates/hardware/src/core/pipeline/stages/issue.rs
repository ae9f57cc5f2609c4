//! Issue Stage.
//!
//! One issue width per core is shared by three ready queues, drained in fixed
//! priority order:
//! 1. **Instructions:** Computation and effective-address entries. Entries
//!    with no functional unit operation complete and write back at once; a
//!    refused functional unit skips only that entry.
//! 2. **Loads:** Forwarded from an older same-address store of the thread if
//!    possible; otherwise sent to the data cache. A refused load stops the
//!    queue for this cycle.
//! 3. **Stores:** Sent to the data cache and marked completed on admission. A
//!    refused store stops the queue for this cycle.

use crate::common::error::SimResult;
use crate::common::ids::EntryId;
use crate::core::cpu::{AccessWaiter, Core};
use crate::sim::event::CycleContext;

/// Issues from the instruction, load and store queues, in that order.
///
/// # Errors
///
/// Propagates fatal errors from the immediate writeback of zero-latency
/// instructions.
pub fn issue_stage(core: &mut Core, cx: &mut CycleContext<'_>) -> SimResult<()> {
    let mut quant = core.processor.issue_width;
    quant = issue_instruction_queue(core, quant, cx)?;
    quant = issue_load_queue(core, quant, cx)?;
    let _ = issue_store_queue(core, quant, cx)?;
    Ok(())
}

fn issue_instruction_queue(core: &mut Core, mut quant: usize, cx: &mut CycleContext<'_>) -> SimResult<usize> {
    let snapshot = core.queues.ready_instructions.clone();
    for id in snapshot {
        if quant == 0 {
            break;
        }
        let Some(entry) = core.entries.get_mut(id) else {
            core.queues.ready_instructions.retain(|&e| e != id);
            continue;
        };
        let thread = entry.thread;

        match entry.instruction.mnemonic().fu_operation() {
            None => {
                entry.issued = true;
                entry.completed = true;
                core.queues.ready_instructions.retain(|&e| e != id);
                core.complete_entry(id)?;
                quant -= 1;
            }
            Some(op) => {
                if core.functional_units.acquire(id, thread, op, cx) {
                    entry.issued = true;
                    core.queues.ready_instructions.retain(|&e| e != id);
                    quant -= 1;
                } else if let Some(local) = core.local_thread(thread) {
                    core.threads[local].stats.selection_stalls_no_free_functional_unit += 1;
                }
            }
        }
    }
    Ok(quant)
}

/// Finds an older store of the same thread's LSQ to the same address.
fn forwarding_store(core: &Core, thread: usize, load: EntryId, address: u64) -> Option<EntryId> {
    core.threads[thread]
        .load_store_queue
        .iter()
        .copied()
        .take_while(|&id| id != load)
        .filter(|&id| {
            core.entries
                .get(id)
                .is_some_and(|e| e.is_store() && e.effective_address() == Some(address))
        })
        .last()
}

fn issue_load_queue(core: &mut Core, mut quant: usize, cx: &mut CycleContext<'_>) -> SimResult<usize> {
    let snapshot = core.queues.ready_loads.clone();
    for id in snapshot {
        if quant == 0 {
            break;
        }
        let Some(entry) = core.entries.get(id) else {
            core.queues.ready_loads.retain(|&e| e != id);
            continue;
        };
        let Some(local) = core.local_thread(entry.thread) else {
            continue;
        };
        let Some(address) = entry.effective_address() else {
            continue;
        };
        let pc = entry.instruction.pc;

        if let Some(store) = forwarding_store(core, local, id, address) {
            core.entries.expect_mut(id)?.issued = true;
            core.signal_completed(id);
            core.threads[local].stats.forwarded_loads += 1;
            tracing::trace!(entry = %id, %store, address = format_args!("{address:#x}"), "load forwarded");
        } else if core.can_load(local, address) {
            core.load(local, address, pc, AccessWaiter::Load { entry: id }, cx);
            core.entries.expect_mut(id)?.issued = true;
        } else {
            core.threads[local].stats.selection_stalls_cannot_load += 1;
            break;
        }
        core.queues.ready_loads.retain(|&e| e != id);
        quant -= 1;
    }
    Ok(quant)
}

fn issue_store_queue(core: &mut Core, mut quant: usize, cx: &mut CycleContext<'_>) -> SimResult<usize> {
    let snapshot = core.queues.ready_stores.clone();
    for id in snapshot {
        if quant == 0 {
            break;
        }
        let Some(entry) = core.entries.get(id) else {
            core.queues.ready_stores.retain(|&e| e != id);
            continue;
        };
        let Some(local) = core.local_thread(entry.thread) else {
            continue;
        };
        let Some(address) = entry.effective_address() else {
            continue;
        };
        let pc = entry.instruction.pc;

        if !core.can_store(local, address) {
            core.threads[local].stats.selection_stalls_cannot_store += 1;
            break;
        }
        core.store(local, address, pc, AccessWaiter::Store { entry: id }, cx);
        core.entries.expect_mut(id)?.issued = true;
        // Known simplification: a store completes once the data cache admits
        // it, before the hierarchy acknowledges the write. Its waiter is a
        // no-op.
        core.signal_completed(id);
        core.queues.ready_stores.retain(|&e| e != id);
        quant -= 1;
    }
    Ok(quant)
}
