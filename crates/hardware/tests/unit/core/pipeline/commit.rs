//! Commit Stage Tests.
//!
//! Verifies in-order retirement, misprediction recovery and the commit
//! watchdog.

use oosim_core::common::ids::InstructionId;
use oosim_core::config::BranchPredictorType;
use oosim_core::core::pipeline::regfile::PhysicalRegisterState;
use oosim_core::core::pipeline::stages::squash;
use oosim_core::core::units::cache::{AccessKind, BasicCacheController};
use oosim_core::core::Core;
use oosim_core::isa::{StaticInstructionType, TraceBuilder, TraceContext};
use oosim_core::SimError;
use pretty_assertions::assert_eq;

use crate::common::harness::{addu, assert_registers_conserved, beq, div, lw, single_thread_config, TestContext};
use crate::common::mocks::cache::recording_cache;

/// Alternating straight-line blocks and taken branches.
fn branchy_trace() -> TraceBuilder {
    let mut trace = TraceBuilder::new(0x400);
    for i in 0..5u64 {
        trace = trace
            .op(div(3, 1, 2))
            .op(addu(4, 3, 1))
            .op(addu(5, 4, 4))
            .branch(beq(5, 0), 0x1000 + i * 0x200, true);
    }
    trace.op(addu(6, 5, 5))
}

/// ROB contents of thread 0, oldest first.
fn rob_snapshot(core: &Core) -> Vec<(InstructionId, u64, bool)> {
    core.threads[0]
        .reorder_buffer
        .iter()
        .filter_map(|&id| core.entries.get(id))
        .map(|e| (e.instruction.id, e.instruction.pc, e.speculative))
        .collect()
}

// ══════════════════════════════════════════════════════════
// Ordering
// ══════════════════════════════════════════════════════════

/// Whatever the predictor does, the committed stream is exactly the program
/// order of the trace and never contains a wrong-path instruction.
#[test]
fn commits_follow_program_order_and_skip_wrong_path() {
    for kind in [BranchPredictorType::Perfect, BranchPredictorType::NotTaken, BranchPredictorType::TwoBit] {
        let mut config = single_thread_config();
        config.branch_predictor.kind = kind;
        let records = branchy_trace().into_records();
        let expected: Vec<u64> = records
            .iter()
            .filter(|r| r.static_instruction.kind() != StaticInstructionType::Nop)
            .map(|r| r.pc)
            .collect();

        let mut tc = TestContext::new(&config);
        tc.core.attach(0, Box::new(TraceContext::new(records)));

        let mut committed_pcs = Vec::new();
        let mut last_id: Option<InstructionId> = None;
        while tc.core.has_contexts() {
            assert!(tc.now < 5_000, "{kind:?}: run did not finish");
            let snapshot = rob_snapshot(&tc.core);
            let before = tc.core.threads[0].stats.committed_instructions;
            tc.cycle().unwrap();
            let delta = (tc.core.threads[0].stats.committed_instructions - before) as usize;

            for &(id, pc, speculative) in &snapshot[..delta] {
                assert!(!speculative, "{kind:?}: committed a wrong-path instruction at {pc:#x}");
                assert!(last_id.is_none_or(|last| id > last));
                last_id = Some(id);
                committed_pcs.push(pc);
            }
        }

        assert_eq!(committed_pcs, expected, "{kind:?}");
        let stats = &tc.core.threads[0].stats;
        if kind == BranchPredictorType::Perfect {
            assert_eq!(stats.squashes, 0);
        } else {
            assert!(stats.squashes > 0, "{kind:?}");
            assert!(stats.squashed_entries > 0, "{kind:?}");
        }
    }
}

// ══════════════════════════════════════════════════════════
// Squash
// ══════════════════════════════════════════════════════════

/// The cycle a misprediction is recovered, every in-flight structure of the
/// thread is empty and the rename table maps only architectural registers.
#[test]
fn squash_empties_thread_and_restores_rename_table() {
    let mut config = single_thread_config();
    config.branch_predictor.kind = BranchPredictorType::NotTaken;
    let mut tc = TestContext::new(&config);
    let _ = tc.attach(0, branchy_trace());

    let _ = tc.run_until(2_000, |core| core.threads[0].stats.squashes > 0);
    let core = &tc.core;
    let t = &core.threads[0];
    assert!(t.reorder_buffer.is_empty());
    assert!(t.load_store_queue.is_empty());
    assert_eq!(core.entries.len(), 0);
    assert_eq!(core.queues.num_queued(), 0);
    for (dep, &physical) in t.rename_table.iter() {
        assert_eq!(
            core.register_files.file(physical.kind).state(physical),
            PhysicalRegisterState::ArchitecturalRegister,
            "{dep} still maps a rename buffer"
        );
    }
    for file in core.register_files.iter() {
        assert_eq!(file.count(PhysicalRegisterState::RenameBufferNotValid), 0);
        assert_eq!(file.count(PhysicalRegisterState::RenameBufferValid), 0);
    }
}

/// A load still in flight when its thread is squashed completes later in the
/// memory hierarchy; the completion finds no entry and changes nothing.
#[test]
fn completion_after_squash_is_ignored() {
    let config = single_thread_config();
    let (l1d, _) = recording_cache(64, 60, |_, _| true);
    let l1i = BasicCacheController::new("l1i", &config.l1i);
    let core = Core::with_caches(0, &config, Box::new(l1i), Box::new(l1d)).unwrap();
    let mut tc = TestContext::with_core(core);
    let _ = tc.attach(0, TraceBuilder::new(0x400).memory(lw(3, 4), 0x2000).op(addu(5, 3, 1)));

    let _ = tc.run_until(200, |core| {
        core.threads[0]
            .load_store_queue
            .front()
            .and_then(|&id| core.entries.get(id))
            .is_some_and(|e| e.issued)
    });
    assert!(tc.core.memory.num_pending() >= 1);

    tc.with(|core, _| squash(core, 0)).unwrap();
    for _ in 0..100 {
        tc.advance().unwrap();
    }

    assert!(tc.core.queues.completed.is_empty());
    assert_eq!(tc.core.entries.len(), 0);
    assert_eq!(tc.core.memory.num_pending(), 0);
    assert_eq!(tc.core.threads[0].stats.committed_instructions, 0);
    assert_registers_conserved(&tc.core);
}

// ══════════════════════════════════════════════════════════
// Watchdog
// ══════════════════════════════════════════════════════════

/// A load the data cache never admits blocks commit; the watchdog warns up
/// to the configured number of times, then aborts the run.
#[test]
fn watchdog_aborts_after_repeated_timeouts() {
    let mut config = single_thread_config();
    config.simulation.commit_timeout_cycles = 10;
    config.simulation.max_commit_timeouts = 2;
    let (l1d, _) = recording_cache(64, 1, |kind, _| kind != AccessKind::Load);
    let l1i = BasicCacheController::new("l1i", &config.l1i);
    let core = Core::with_caches(0, &config, Box::new(l1i), Box::new(l1d)).unwrap();
    let mut tc = TestContext::with_core(core);
    let _ = tc.attach(0, TraceBuilder::new(0x400).memory(lw(3, 4), 0x2000).op(addu(5, 1, 2)));

    let err = loop {
        assert!(tc.now < 1_000, "watchdog never fired");
        if let Err(err) = tc.cycle() {
            break err;
        }
    };
    assert!(matches!(err, SimError::CommitTimeout { thread: 0, committed: 0, .. }), "{err:?}");
    let t = &tc.core.threads[0];
    assert_eq!(t.stats.commit_timeouts, 2);
    assert!(t.stats.selection_stalls_cannot_load > 0);
}

/// Each slow load trips the watchdog once, but the commit in between resets
/// the run of expirations, so a limit of one never aborts.
#[test]
fn commit_between_timeouts_keeps_run_alive() {
    let mut config = single_thread_config();
    config.simulation.commit_timeout_cycles = 40;
    config.simulation.max_commit_timeouts = 1;
    let (l1d, _) = recording_cache(64, 60, |_, _| true);
    let l1i = BasicCacheController::new("l1i", &config.l1i);
    let core = Core::with_caches(0, &config, Box::new(l1i), Box::new(l1d)).unwrap();
    let mut tc = TestContext::with_core(core);
    // The second load's base is the first load's result, so the two slow
    // stretches cannot overlap.
    let trace = TraceBuilder::new(0x400)
        .memory(lw(3, 4), 0x2000)
        .op(addu(5, 1, 2))
        .memory(lw(6, 3), 0x3000)
        .op(addu(7, 6, 6));
    let _ = tc.attach(0, trace);

    let _ = tc.run_to_completion(1_000);
    let t = &tc.core.threads[0].stats;
    assert_eq!(t.committed_instructions, 4);
    assert_eq!(t.commit_timeouts, 2);
}

#[test]
fn empty_reorder_buffer_never_times_out() {
    let mut config = single_thread_config();
    config.simulation.commit_timeout_cycles = 5;
    config.simulation.max_commit_timeouts = 0;
    let mut tc = TestContext::new(&config);

    for _ in 0..50 {
        tc.cycle().unwrap();
    }
    assert_eq!(tc.core.threads[0].stats.commit_timeouts, 0);
}
