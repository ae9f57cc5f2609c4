//! Instruction Fetch Stage.
//!
//! Fetch pulls decoded instructions out of each selected thread's context into
//! its decode buffer. A thread first needs the instruction line holding its
//! fetch pc: a line not yet requested is fetched through the memory access
//! coordinator and the thread stalls until the line arrives. Within a line,
//! instructions are decoded until the decode buffer fills, the predicted path
//! leaves the line, or a taken prediction redirects fetch.

use crate::common::constants::{align_down, INSTRUCTION_SIZE};
use crate::common::error::SimResult;
use crate::core::cpu::{AccessWaiter, Core, Thread};
use crate::core::pipeline::entry::DecodeBufferEntry;
use crate::core::units::bru::{BranchPredictor, BranchPredictorUpdate};
use crate::isa::{ContextState, DynamicInstruction, StaticInstructionType};
use crate::sim::event::CycleContext;

/// Runs fetch for every thread the fetch policy selects this cycle.
///
/// # Errors
///
/// Fetch itself cannot fail; the signature matches the other stages.
pub fn fetch_stage(core: &mut Core, cx: &mut CycleContext<'_>) -> SimResult<()> {
    let running: Vec<bool> = core.threads.iter().map(Thread::is_running).collect();
    for thread in core.fetch_strategy.select(&running) {
        fetch(core, thread, cx);
    }
    Ok(())
}

/// Requests the line at the fetch pc if it is not the last one requested.
///
/// # Returns
///
/// `true` if the thread may decode from its current line this cycle.
fn can_fetch(core: &mut Core, thread: usize, cx: &mut CycleContext<'_>) -> bool {
    let line_size = core.l1i.line_size();
    let t = &core.threads[thread];
    if t.fetch_stalled {
        return false;
    }
    let fetch_npc = t.fetch_npc;
    let line = align_down(fetch_npc, line_size);
    if t.last_fetched_cache_line == Some(line) {
        return true;
    }
    if core.can_ifetch(thread, fetch_npc) {
        core.ifetch(thread, fetch_npc, fetch_npc, AccessWaiter::Fetch { thread }, cx);
        let t = &mut core.threads[thread];
        t.fetch_stalled = true;
        t.last_fetched_cache_line = Some(line);
    }
    false
}

/// Fetches one group of instructions for core-local thread `thread`.
pub fn fetch(core: &mut Core, thread: usize, cx: &mut CycleContext<'_>) {
    if !can_fetch(core, thread, cx) {
        return;
    }
    let line_size = core.l1i.line_size();
    let t = &mut core.threads[thread];
    let Some(ctx) = t.context.as_mut() else {
        return;
    };

    loop {
        if ctx.state() != ContextState::Running {
            break;
        }
        if t.decode_buffer.is_full() {
            t.stats.fetch_stalls_decode_buffer_full += 1;
            break;
        }

        if ctx.npc() != t.fetch_npc {
            if !ctx.is_speculative() {
                ctx.enter_speculative_state();
            }
            ctx.set_npc(t.fetch_npc);
        }

        let decoded = loop {
            match ctx.decode_next() {
                Some(d) if d.static_instruction.kind() == StaticInstructionType::Nop => {}
                other => break other,
            }
        };
        let Some(decoded) = decoded else {
            break;
        };

        let instruction = DynamicInstruction {
            id: cx.ids.next_instruction_id(),
            thread: t.id,
            pc: decoded.pc,
            static_instruction: decoded.static_instruction,
            effective_address: decoded.effective_address,
        };
        let npc = ctx.npc();
        let nnpc = ctx.nnpc();
        let fall_through = instruction.pc + INSTRUCTION_SIZE;

        let (predicted_npc, update, recover_index) = if instruction.mnemonic().is_control() {
            let prediction = t.branch_predictor.predict(instruction.pc, instruction.mnemonic(), npc);
            (
                prediction.next_pc,
                prediction.update,
                prediction.return_address_stack_recover_index,
            )
        } else {
            (
                fall_through,
                BranchPredictorUpdate::default(),
                t.branch_predictor.return_address_stack_top(),
            )
        };
        t.fetch_npc = predicted_npc;

        if !ctx.is_speculative() && ctx.state() != ContextState::Running {
            t.last_decoded_instruction = Some(instruction.id);
            t.last_instruction_committed = false;
        }

        tracing::trace!(
            thread = t.id,
            id = %instruction.id,
            pc = format_args!("{:#x}", instruction.pc),
            mnemonic = ?instruction.mnemonic(),
            predicted = format_args!("{predicted_npc:#x}"),
            speculative = ctx.is_speculative(),
            "fetched"
        );

        let entry = DecodeBufferEntry {
            instruction,
            npc,
            nnpc,
            predicted_npc,
            return_address_stack_recover_index: recover_index,
            branch_predictor_update: update,
            speculative: ctx.is_speculative(),
        };
        if t.decode_buffer.push(entry).is_err() {
            break;
        }

        if predicted_npc != fall_through || predicted_npc % line_size == 0 {
            break;
        }
    }
}
