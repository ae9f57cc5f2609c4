//! Physical Register File Tests.
//!
//! The file is a four-state machine per register. These tests check the legal
//! transitions, that an illegal transition is refused without side effects,
//! and that registers are neither created nor lost, both for arbitrary
//! operation sequences and across a full pipeline run with squashes.

use oosim_core::common::ids::EntryId;
use oosim_core::config::BranchPredictorType;
use oosim_core::core::pipeline::regfile::{
    DependentKind, PhysicalRegisterFile, PhysicalRegisterId, PhysicalRegisterState,
};
use oosim_core::isa::{RegisterDependencyType, TraceBuilder};
use oosim_core::SimError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::common::harness::{
    addu, assert_registers_conserved, beq, div, lw, single_thread_config, sw, TestContext,
};

const CAPACITY: usize = 16;

fn conserved(file: &PhysicalRegisterFile) -> bool {
    let total = file.count(PhysicalRegisterState::Available)
        + file.count(PhysicalRegisterState::ArchitecturalRegister)
        + file.count(PhysicalRegisterState::RenameBufferNotValid)
        + file.count(PhysicalRegisterState::RenameBufferValid);
    total == file.capacity()
}

// ══════════════════════════════════════════════════════════
// Transitions
// ══════════════════════════════════════════════════════════

/// allocate -> writeback -> commit -> reclaim walks one register through
/// its whole life and back to the free pool.
#[test]
fn full_lifecycle_returns_register_to_pool() {
    let mut file = PhysicalRegisterFile::new(RegisterDependencyType::Integer, CAPACITY);
    let reg = file.allocate().unwrap();
    assert_eq!(file.state(reg), PhysicalRegisterState::RenameBufferNotValid);
    assert!(!file.is_ready(reg));

    let _ = file.writeback(reg).unwrap();
    assert_eq!(file.state(reg), PhysicalRegisterState::RenameBufferValid);
    assert!(file.is_ready(reg));

    file.commit(reg).unwrap();
    assert_eq!(file.state(reg), PhysicalRegisterState::ArchitecturalRegister);

    file.reclaim(reg).unwrap();
    assert_eq!(file.state(reg), PhysicalRegisterState::Available);
    assert_eq!(file.num_free(), CAPACITY);
}

#[test]
fn recover_accepts_both_rename_buffer_states() {
    let mut file = PhysicalRegisterFile::new(RegisterDependencyType::Float, CAPACITY);
    let pending = file.allocate().unwrap();
    let written = file.allocate().unwrap();
    let _ = file.writeback(written).unwrap();

    file.recover(pending).unwrap();
    file.recover(written).unwrap();
    assert_eq!(file.num_free(), CAPACITY);
}

#[test]
fn illegal_transition_is_refused_without_side_effects() {
    let mut file = PhysicalRegisterFile::new(RegisterDependencyType::Integer, CAPACITY);
    let reg = file.allocate().unwrap();

    let err = file.commit(reg).unwrap_err();
    assert!(matches!(
        err,
        SimError::IllegalRegisterTransition {
            operation: "commit",
            state: PhysicalRegisterState::RenameBufferNotValid,
            ..
        }
    ));
    assert_eq!(file.state(reg), PhysicalRegisterState::RenameBufferNotValid);
    assert_eq!(file.count(PhysicalRegisterState::RenameBufferNotValid), 1);

    assert!(file.reclaim(reg).is_err());
    let _ = file.writeback(reg).unwrap();
    assert!(file.writeback(reg).is_err());
    assert!(conserved(&file));
}

#[test]
fn allocation_fails_once_exhausted() {
    let mut file = PhysicalRegisterFile::new(RegisterDependencyType::Misc, 3);
    for _ in 0..3 {
        let _ = file.allocate().unwrap();
    }
    assert!(file.is_full());
    assert!(matches!(file.allocate(), Err(SimError::RegisterFileExhausted(_))));
}

/// Dependents registered while the producer is in flight are handed back by
/// writeback, grouped by kind, and not handed back twice.
#[test]
fn writeback_drains_dependents() {
    let mut file = PhysicalRegisterFile::new(RegisterDependencyType::Integer, CAPACITY);
    let reg = file.allocate().unwrap();
    file.add_dependent(reg, DependentKind::Generic, EntryId(1));
    file.add_dependent(reg, DependentKind::EffectiveAddressComputation, EntryId(2));
    file.add_dependent(reg, DependentKind::StoreAddress, EntryId(3));
    file.add_dependent(reg, DependentKind::Generic, EntryId(4));

    let dependents = file.writeback(reg).unwrap();
    assert_eq!(dependents.generic, vec![EntryId(1), EntryId(4)]);
    assert_eq!(dependents.effective_address_computation, vec![EntryId(2)]);
    assert_eq!(dependents.store_address, vec![EntryId(3)]);
    assert!(file.dependents(reg).is_empty());
}

// ══════════════════════════════════════════════════════════
// Conservation
// ══════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug)]
enum Op {
    Reserve,
    Allocate,
    Writeback(usize),
    Commit(usize),
    Recover(usize),
    Reclaim(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Reserve),
        Just(Op::Allocate),
        any::<usize>().prop_map(Op::Writeback),
        any::<usize>().prop_map(Op::Commit),
        any::<usize>().prop_map(Op::Recover),
        any::<usize>().prop_map(Op::Reclaim),
    ]
}

proptest! {
    /// Whatever sequence of operations is attempted, the four state counts
    /// always add up to the capacity, and a refused operation changes nothing.
    #[test]
    fn state_counts_always_sum_to_capacity(ops in prop::collection::vec(op(), 1..200)) {
        let mut file = PhysicalRegisterFile::new(RegisterDependencyType::Integer, CAPACITY);
        let mut seen: Vec<PhysicalRegisterId> = Vec::new();

        for op in ops {
            match op {
                Op::Reserve => {
                    if let Ok(reg) = file.reserve() {
                        seen.push(reg);
                    }
                }
                Op::Allocate => {
                    if let Ok(reg) = file.allocate() {
                        seen.push(reg);
                    }
                }
                Op::Writeback(k) | Op::Commit(k) | Op::Recover(k) | Op::Reclaim(k) => {
                    let Some(&reg) = seen.get(k % seen.len().max(1)) else { continue };
                    let before = file.state(reg);
                    let result = match op {
                        Op::Writeback(_) => file.writeback(reg).map(|_| ()),
                        Op::Commit(_) => file.commit(reg),
                        Op::Recover(_) => file.recover(reg),
                        _ => file.reclaim(reg),
                    };
                    if result.is_err() {
                        prop_assert_eq!(file.state(reg), before);
                    }
                }
            }
            prop_assert!(conserved(&file));
        }
    }
}

/// A run with mispredictions, loads, stores and long-latency producers leaves
/// exactly the architectural registers mapped once it drains.
#[test]
fn pipeline_run_leaks_no_registers() {
    let mut config = single_thread_config();
    config.branch_predictor.kind = BranchPredictorType::NotTaken;
    config.processor.physical_register_file_capacity = 48;

    let mut trace = TraceBuilder::new(0x400);
    for i in 0..6u64 {
        trace = trace
            .op(div(8, 1, 2))
            .op(addu(9, 8, 3))
            .memory(sw(9, 4), 0x2000 + i * 8)
            .memory(lw(10, 4), 0x2000 + i * 8)
            .branch(beq(10, 0), 0x400 + (i + 1) * 0x100, true);
    }

    let mut tc = TestContext::new(&config);
    let _ = tc.attach(0, trace);
    let mut squashes = 0;
    while tc.core.has_contexts() {
        assert!(tc.now < 20_000, "run did not finish");
        tc.cycle().unwrap();
        assert_registers_conserved(&tc.core);
        squashes = tc.core.threads[0].stats.squashes;
    }
    assert!(squashes > 0, "taken branches under a not-taken predictor must squash");

    for file in tc.core.register_files.iter() {
        assert_eq!(file.count(PhysicalRegisterState::RenameBufferNotValid), 0);
        assert_eq!(file.count(PhysicalRegisterState::RenameBufferValid), 0);
        assert_eq!(
            file.count(PhysicalRegisterState::ArchitecturalRegister),
            file.kind().num_architectural_registers()
        );
    }
}
