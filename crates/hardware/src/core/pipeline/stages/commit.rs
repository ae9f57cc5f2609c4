//! Commit Stage and Squash.
//!
//! Commit retires each thread's ROB head in program order, up to the commit
//! width. It is responsible for:
//! 1. **Register Retirement:** Destinations become architectural and the
//!    registers they superseded are reclaimed.
//! 2. **Memory Retirement:** A load or store also needs its LSQ entry
//!    completed; both leave together.
//! 3. **Predictor Training:** Control instructions update the branch
//!    predictor with their resolved outcome.
//! 4. **Misprediction Recovery:** A completed head fetched down a wrong path
//!    triggers a squash of the whole thread.
//! 5. **Watchdog:** A thread that stops committing is reported and eventually
//!    aborts the run.

use crate::common::constants::INSTRUCTION_SIZE;
use crate::common::error::{SimError, SimResult};
use crate::core::cpu::Core;
use crate::core::units::bru::{BranchOutcome, BranchPredictor};
use crate::sim::event::CycleContext;

/// Commits every thread of the core.
///
/// # Errors
///
/// Returns `SimError::CommitTimeout` when the watchdog gives up, and
/// propagates register transition violations.
pub fn commit_stage(core: &mut Core, cx: &mut CycleContext<'_>) -> SimResult<()> {
    for thread in 0..core.threads.len() {
        commit(core, thread, cx)?;
    }
    Ok(())
}

fn check_watchdog(core: &mut Core, thread: usize, now: u64) -> SimResult<()> {
    let timeout = core.commit_timeout_cycles;
    let max_timeouts = core.max_commit_timeouts;
    let t = &mut core.threads[thread];
    if t.reorder_buffer.is_empty() {
        t.last_commit_cycle = now;
        t.consecutive_commit_timeouts = 0;
        return Ok(());
    }
    let silent = now.saturating_sub(t.last_commit_cycle);
    if silent <= timeout {
        return Ok(());
    }
    if t.consecutive_commit_timeouts >= max_timeouts {
        return Err(SimError::CommitTimeout {
            thread: t.id,
            cycles: silent,
            committed: t.stats.committed_instructions,
        });
    }
    t.consecutive_commit_timeouts += 1;
    t.stats.commit_timeouts += 1;
    t.last_commit_cycle = now;
    tracing::warn!(
        thread = t.id,
        cycles = silent,
        expirations = t.consecutive_commit_timeouts,
        reorder_buffer = t.reorder_buffer.len(),
        "no instruction committed"
    );
    Ok(())
}

/// Commits up to the commit width of `thread`'s oldest instructions.
///
/// # Errors
///
/// Returns `SimError::CommitTimeout` when the watchdog gives up, and
/// propagates register transition violations.
pub fn commit(core: &mut Core, thread: usize, cx: &mut CycleContext<'_>) -> SimResult<()> {
    check_watchdog(core, thread, cx.now)?;

    for _ in 0..core.processor.commit_width {
        let Some(id) = core.threads[thread].reorder_buffer.front().copied() else {
            break;
        };
        let head = core.entries.expect(id)?;
        if !head.completed {
            core.threads[thread].stats.reorder_buffer_head_wait_cycles += 1;
            break;
        }

        if head.speculative {
            let recover_index = head.return_address_stack_recover_index;
            let t = &mut core.threads[thread];
            t.branch_predictor.recover(recover_index);
            if let Some(ctx) = t.context.as_mut() {
                ctx.exit_speculative_state();
                t.fetch_npc = ctx.npc();
            }
            squash(core, thread)?;
            break;
        }

        if let Some(lsq) = head.load_store_entry() {
            if !core.entries.get(lsq).is_some_and(|e| e.completed) {
                break;
            }
            core.queues.remove_from_queues(lsq);
            let _ = core.threads[thread].load_store_queue.remove(&lsq);
            let _ = core.entries.remove(lsq);
        }

        let Some(entry) = core.entries.remove(id) else {
            break;
        };
        for (dep, &target) in &entry.target_physical_registers {
            if let Some(&old) = entry.old_physical_registers.get(dep) {
                core.register_files.file_mut(old.kind).reclaim(old)?;
            }
            core.register_files.file_mut(target.kind).commit(target)?;
        }

        let t = &mut core.threads[thread];
        let mnemonic = entry.instruction.mnemonic();
        if mnemonic.is_control() {
            let fall_through = entry.instruction.pc + INSTRUCTION_SIZE;
            let outcome = BranchOutcome {
                pc: entry.instruction.pc,
                target: entry.npc,
                taken: entry.npc != fall_through,
                predicted_taken: entry.predicted_npc != fall_through,
                correct: entry.predicted_npc == entry.npc,
                mnemonic,
            };
            t.branch_predictor.update(&outcome, &entry.branch_predictor_update);
        }

        core.queues.remove_from_queues(id);
        let _ = t.reorder_buffer.pop_front();
        if t.last_decoded_instruction == Some(entry.instruction.id) {
            t.last_instruction_committed = true;
        }
        t.stats.committed_instructions += 1;
        t.last_commit_cycle = cx.now;
        t.consecutive_commit_timeouts = 0;

        #[cfg(feature = "commit-log")]
        tracing::info!(
            thread = t.id,
            cycle = cx.now,
            pc = format_args!("{:#010x}", entry.instruction.pc),
            mnemonic = ?mnemonic,
            "commit"
        );
        tracing::trace!(thread = t.id, entry = %id, instruction = %entry.instruction.id, "committed");
    }
    Ok(())
}

/// Discards every in-flight instruction of `thread`.
///
/// The ROB is unwound from the tail so each destination's previous mapping is
/// restored in reverse rename order. Callbacks still pending for the removed
/// entries find nothing and do nothing.
///
/// # Errors
///
/// Propagates register transition violations.
pub fn squash(core: &mut Core, thread: usize) -> SimResult<()> {
    let mut squashed = 0u64;
    while let Some(id) = core.threads[thread].reorder_buffer.pop_back() {
        let Some(mut entry) = core.entries.remove(id) else {
            continue;
        };
        core.queues.remove_from_queues(id);
        if let Some(lsq) = entry.load_store_entry() {
            core.queues.remove_from_queues(lsq);
            if let Some(mut e) = core.entries.remove(lsq) {
                let _ = e.mark_squashed();
            }
        }
        let t = &mut core.threads[thread];
        for (dep, &target) in entry.target_physical_registers.iter().rev() {
            core.register_files.file_mut(target.kind).recover(target)?;
            if let Some(&old) = entry.old_physical_registers.get(dep) {
                let _ = t.rename_table.set(*dep, old);
            }
        }
        let _ = entry.mark_squashed();
        squashed += 1;
    }

    let t = &mut core.threads[thread];
    t.load_store_queue.clear();
    t.decode_buffer.clear();
    t.stats.squashes += 1;
    t.stats.squashed_entries += squashed;
    let global = t.id;
    core.functional_units.release_all_for_thread(global);
    tracing::debug!(thread = global, squashed, fetch_npc = format_args!("{:#x}", t.fetch_npc), "squash");
    Ok(())
}
