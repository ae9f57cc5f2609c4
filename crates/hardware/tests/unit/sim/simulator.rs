//! Simulation Driver Tests.
//!
//! Verifies binding of contexts to hardware threads across cores, the
//! fast-forward, warmup and measurement phases, the cycle limit, fatal error
//! propagation and run-to-run determinism.

use oosim_core::config::BranchPredictorType;
use oosim_core::core::units::cache::{AccessKind, BasicCacheController};
use oosim_core::core::Core;
use oosim_core::isa::{Context, Mnemonic, StaticInstruction, TraceBuilder};
use oosim_core::sim::SimulationMode;
use oosim_core::{Config, SimError, Simulation};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{addu, beq, div, init_tracing, lw, mul, single_thread_config, sw};
use crate::common::mocks::cache::recording_cache;

/// `blocks` repetitions of a mixed block: arithmetic, a load/store pair and a
/// conditional branch that alternates between taken and not taken.
fn mixed_trace(start: u64, data: u64, blocks: u64) -> TraceBuilder {
    let mut trace = TraceBuilder::new(start);
    for i in 0..blocks {
        let taken = i % 2 == 0;
        trace = trace
            .op(addu(3, 1, 2))
            .op(mul(4, 3, 3))
            .memory(sw(4, 5), data + (i % 16) * 8)
            .memory(lw(6, 5), data + ((i + 3) % 16) * 8)
            .op(div(7, 6, 4))
            .branch(beq(6, 7), start + (i + 1) * 0x40, taken);
        if !taken {
            // Fall through lands mid-line; pad to the next block start.
            let pad = (start + (i + 1) * 0x40 - (start + i * 0x40 + 24)) / 4;
            for _ in 0..pad {
                trace = trace.op(addu(8, 8, 1));
            }
        }
    }
    trace
}

fn instructions_in(trace: TraceBuilder) -> (Box<dyn Context>, u64) {
    let records = trace.into_records();
    let n = records.len() as u64;
    (Box::new(oosim_core::isa::TraceContext::new(records)), n)
}

fn contexts(count: usize, blocks: u64) -> (Vec<Box<dyn Context>>, Vec<u64>) {
    (0..count as u64)
        .map(|i| instructions_in(mixed_trace(0x40_0000 + i * 0x1_0000, 0x1000_0000 + i * 0x1000, blocks)))
        .unzip()
}

// ══════════════════════════════════════════════════════════
// Binding and completion
// ══════════════════════════════════════════════════════════

/// Four traces on two cores of two threads each all commit every
/// instruction, and the run ends once the last one retires.
#[rstest]
#[case::perfect(BranchPredictorType::Perfect)]
#[case::not_taken(BranchPredictorType::NotTaken)]
#[case::taken(BranchPredictorType::Taken)]
#[case::two_bit(BranchPredictorType::TwoBit)]
fn smt_run_commits_every_instruction(#[case] kind: BranchPredictorType) {
    init_tracing();
    let mut config = Config::default();
    config.branch_predictor.kind = kind;
    let (contexts, lengths) = contexts(4, 12);

    let mut sim = Simulation::new(&config, contexts).unwrap();
    let stats = sim.run().unwrap();

    assert!(sim.is_done());
    assert_eq!(sim.mode(), SimulationMode::Measurement);
    let committed: Vec<u64> = stats.threads.iter().map(|t| t.committed_instructions).collect();
    assert_eq!(committed, lengths);
    assert_eq!(stats.measurement_cycles, stats.cycles);
    assert!(stats.ipc() > 0.0);
    assert_eq!(stats.cores.len(), 2);
    assert!(stats.cores.iter().all(|c| c.l1i.accesses() > 0 && c.l1d.accesses() > 0));
}

#[test]
fn idle_hardware_threads_are_allowed() {
    let (contexts, lengths) = contexts(1, 4);
    let mut sim = Simulation::new(&Config::default(), contexts).unwrap();
    let stats = sim.run().unwrap();
    assert_eq!(stats.threads.len(), 4);
    assert_eq!(stats.threads[0].committed_instructions, lengths[0]);
    assert!(stats.threads[1..].iter().all(|t| t.committed_instructions == 0));
}

#[test]
fn more_contexts_than_threads_is_rejected() {
    let (contexts, _) = contexts(5, 1);
    let err = Simulation::new(&Config::default(), contexts).unwrap_err();
    assert!(matches!(err, SimError::InvalidConfig(msg) if msg.contains("5 contexts")));
}

#[test]
fn invalid_config_is_rejected_before_building_cores() {
    let mut config = Config::default();
    config.processor.commit_width = 0;
    assert!(matches!(Simulation::new(&config, Vec::new()), Err(SimError::InvalidConfig(_))));
}

#[test]
fn empty_simulation_is_done_immediately() {
    let mut sim = Simulation::new(&Config::default(), Vec::new()).unwrap();
    assert!(sim.is_done());
    let stats = sim.run().unwrap();
    assert_eq!(stats.cycles, 0);
    assert_eq!(stats.committed_instructions(), 0);
}

// ══════════════════════════════════════════════════════════
// Phases
// ══════════════════════════════════════════════════════════

/// Fast-forwarded and warmed-up instructions are executed but never
/// committed; measurement picks up exactly where warmup stopped.
#[test]
fn phases_partition_the_instruction_stream() {
    let mut config = single_thread_config();
    config.simulation.fast_forward_instructions = 10;
    config.simulation.warmup_instructions = 10;
    let trace = (0..50).fold(TraceBuilder::new(0x400), |t, i| {
        if i % 5 == 0 {
            t.memory(lw(3, 4), 0x8000 + i * 64)
        } else {
            t.op(addu(5, 3, 1))
        }
    });
    let mut sim = Simulation::new(&config, vec![Box::new(trace.build())]).unwrap();
    assert_eq!(sim.mode(), SimulationMode::FastForward);

    let stats = sim.run().unwrap();
    let t = &stats.threads[0];
    assert_eq!(t.fast_forwarded_instructions, 10);
    assert_eq!(t.warmup_instructions, 10);
    assert_eq!(t.committed_instructions, 30);
    assert!(stats.measurement_cycles < stats.cycles);
    // Warmup touched the data cache before measurement began.
    assert!(stats.cores[0].l1d.accesses() > 0);
}

#[test]
fn warmup_only_starts_in_warmup() {
    let mut config = single_thread_config();
    config.simulation.warmup_instructions = 5;
    let trace = (0..20).fold(TraceBuilder::new(0x400), |t, _| t.op(addu(3, 1, 2)));
    let mut sim = Simulation::new(&config, vec![Box::new(trace.build())]).unwrap();
    assert_eq!(sim.mode(), SimulationMode::Warmup);

    let stats = sim.run().unwrap();
    assert_eq!(stats.threads[0].warmup_instructions, 5);
    assert_eq!(stats.threads[0].committed_instructions, 15);
}

#[test]
fn nops_do_not_count_towards_phases() {
    let mut config = single_thread_config();
    config.simulation.fast_forward_instructions = 2;
    let nop = StaticInstruction::new(Mnemonic::Nop, vec![], vec![]);
    let trace = TraceBuilder::new(0x400)
        .op(nop.clone())
        .op(addu(3, 1, 2))
        .op(nop)
        .op(addu(4, 1, 2))
        .op(addu(5, 1, 2));
    let mut sim = Simulation::new(&config, vec![Box::new(trace.build())]).unwrap();
    let stats = sim.run().unwrap();
    assert_eq!(stats.threads[0].fast_forwarded_instructions, 2);
    assert_eq!(stats.threads[0].committed_instructions, 1);
}

// ══════════════════════════════════════════════════════════
// Termination
// ══════════════════════════════════════════════════════════

#[test]
fn cycle_limit_stops_run() {
    let mut config = Config::default();
    config.simulation.max_cycles = Some(25);
    let (contexts, _) = contexts(4, 50);
    let mut sim = Simulation::new(&config, contexts).unwrap();

    let stats = sim.run().unwrap();
    assert_eq!(stats.cycles, 25);
    assert_eq!(sim.cycle(), 25);
    assert!(!sim.is_done());
}

#[test]
fn unknown_instruction_aborts_run() {
    let unknown = StaticInstruction::new(Mnemonic::Unknown, vec![], vec![]);
    let trace = TraceBuilder::new(0x400).op(addu(3, 1, 2)).op(unknown);
    let mut sim = Simulation::new(&single_thread_config(), vec![Box::new(trace.build())]).unwrap();
    let err = sim.run().unwrap_err();
    assert!(matches!(err, SimError::UnrecognizedMnemonic { mnemonic: Mnemonic::Unknown, pc: 0x404 }));
}

/// Cores built by the caller run under the driver like default ones; a data
/// cache that never takes a store trips the watchdog.
#[test]
fn caller_built_cores_propagate_commit_timeout() {
    let mut config = single_thread_config();
    config.simulation.commit_timeout_cycles = 20;
    config.simulation.max_commit_timeouts = 1;
    let (l1d, _) = recording_cache(64, 1, |kind, _| kind != AccessKind::Store);
    let core = Core::with_caches(
        0,
        &config,
        Box::new(BasicCacheController::new("l1i", &config.l1i)),
        Box::new(l1d),
    )
    .unwrap();
    let trace = TraceBuilder::new(0x400).memory(sw(3, 4), 0x2000).op(addu(5, 1, 2));

    let mut sim = Simulation::with_cores(&config, vec![core], vec![Box::new(trace.build())]).unwrap();
    let err = sim.run().unwrap_err();
    assert!(matches!(err, SimError::CommitTimeout { thread: 0, .. }), "{err:?}");
}

#[test]
fn runs_are_deterministic() {
    let run = || {
        let mut config = Config::default();
        config.branch_predictor.kind = BranchPredictorType::TwoBit;
        let (contexts, _) = contexts(4, 8);
        let stats = Simulation::new(&config, contexts).unwrap().run().unwrap();
        serde_json::to_string(&stats).unwrap()
    };
    assert_eq!(run(), run());
}
