//! Issue Stage Tests.
//!
//! Verifies zero-latency completion, operand wakeup, functional unit
//! back-pressure and the issue width.

use std::collections::HashMap;

use oosim_core::common::ids::EntryId;
use oosim_core::core::pipeline::regfile::PhysicalRegisterState;
use oosim_core::core::units::fu::{FunctionalUnitOperationType, FunctionalUnitType};
use oosim_core::core::Core;
use oosim_core::isa::TraceBuilder;
use pretty_assertions::assert_eq;

use crate::common::harness::{addu, div, mul, r, single_thread_config, TestContext};

/// Cycle at which each ROB entry of thread 0 was first seen issued, by pc.
fn record_issue(core: &Core, now: u64, issued_at: &mut HashMap<u64, u64>) {
    for &id in core.threads[0].reorder_buffer.iter() {
        if let Some(e) = core.entries.get(id) {
            if e.issued {
                let _ = issued_at.entry(e.instruction.pc).or_insert(now);
            }
        }
    }
}

fn occurrences(core: &Core, id: EntryId) -> usize {
    let q = &core.queues;
    [&q.waiting_instructions, &q.ready_instructions, &q.completed]
        .iter()
        .map(|queue| queue.iter().filter(|&&e| e == id).count())
        .sum()
}

// ══════════════════════════════════════════════════════════
// Zero-latency instructions
// ══════════════════════════════════════════════════════════

/// `mul r3, r1, r2` with ready sources: renamed with no pending operands,
/// dispatched straight to the ready queue, issued and completed in one cycle
/// without a functional unit, committed the cycle after.
#[test]
fn zero_latency_instruction_completes_at_issue() {
    let mut tc = TestContext::new(&single_thread_config());
    let _ = tc.attach(0, TraceBuilder::new(0x400).op(mul(3, 1, 2)));

    let _ = tc.run_until(200, |core| !core.threads[0].reorder_buffer.is_empty());
    let id = *tc.core.threads[0].reorder_buffer.front().unwrap();
    let entry = tc.core.entries.get(id).unwrap();
    assert_eq!(entry.num_not_ready_operands, 0);
    assert!(!entry.dispatched);
    let target = entry.target_physical_registers[&r(3)];

    tc.cycle().unwrap();
    let entry = tc.core.entries.get(id).unwrap();
    assert!(entry.dispatched && !entry.issued);
    assert!(tc.core.queues.ready_instructions.contains(&id));

    tc.cycle().unwrap();
    let entry = tc.core.entries.get(id).unwrap();
    assert!(entry.issued && entry.completed);
    let files = &tc.core.register_files;
    assert_eq!(files.file(target.kind).state(target), PhysicalRegisterState::RenameBufferValid);
    for unit in FunctionalUnitType::ALL {
        assert_eq!(tc.core.functional_units.num_busy(unit), 0);
    }

    tc.cycle().unwrap();
    assert!(!tc.core.entries.is_live(id));
    assert_eq!(tc.core.threads[0].stats.committed_instructions, 1);
    let files = &tc.core.register_files;
    assert_eq!(files.file(target.kind).state(target), PhysicalRegisterState::ArchitecturalRegister);
}

// ══════════════════════════════════════════════════════════
// Wakeup
// ══════════════════════════════════════════════════════════

/// A consumer of two staggered producers counts down to zero one operand at
/// a time, is queued at most once and issues exactly once.
#[test]
fn operand_counter_reaches_zero_once() {
    let trace = TraceBuilder::new(0x400)
        .op(div(1, 20, 21))
        .op(div(2, 1, 22))
        .op(addu(3, 1, 2));
    let mut tc = TestContext::new(&single_thread_config());
    let _ = tc.attach(0, trace);

    let _ = tc.run_until(200, |core| core.threads[0].reorder_buffer.len() == 3);
    let consumer = *tc.core.threads[0].reorder_buffer.back().unwrap();
    let mut counts = vec![tc.core.entries.get(consumer).unwrap().num_not_ready_operands];
    assert_eq!(counts[0], 2);

    let mut issue_cycles = 0;
    while let Some(e) = tc.core.entries.get(consumer) {
        assert!(tc.now < 500, "consumer never committed");
        let was_issued = e.issued;
        tc.cycle().unwrap();
        let Some(e) = tc.core.entries.get(consumer) else { break };
        assert!(occurrences(&tc.core, consumer) <= 1);
        if e.issued && !was_issued {
            issue_cycles += 1;
            assert_eq!(e.num_not_ready_operands, 0);
        }
        if counts.last() != Some(&e.num_not_ready_operands) {
            counts.push(e.num_not_ready_operands);
        }
    }
    assert_eq!(counts, vec![2, 1, 0]);
    assert_eq!(issue_cycles, 1);
    assert_eq!(tc.core.threads[0].stats.committed_instructions, 3);
}

// ══════════════════════════════════════════════════════════
// Functional units and width
// ══════════════════════════════════════════════════════════

/// With one divider, the second divide waits for the unit while the
/// independent add behind it issues.
#[test]
fn refused_functional_unit_skips_only_that_entry() {
    let mut config = single_thread_config();
    config.functional_units.integer_multiply_divide = 1;
    let trace = TraceBuilder::new(0x400)
        .op(div(3, 1, 2))
        .op(div(4, 1, 2))
        .op(addu(5, 1, 2));
    let mut tc = TestContext::new(&config);
    let _ = tc.attach(0, trace);

    let mut issued_at = HashMap::new();
    while tc.core.has_contexts() {
        assert!(tc.now < 500, "run did not finish");
        tc.cycle().unwrap();
        record_issue(&tc.core, tc.now, &mut issued_at);
    }

    assert_eq!(issued_at[&0x400], issued_at[&0x408]);
    assert!(issued_at[&0x404] > issued_at[&0x408]);
    let t = &tc.core.threads[0].stats;
    assert!(t.selection_stalls_no_free_functional_unit > 0);
    let fu = &tc.core.functional_units.stats;
    assert!(fu.stalls(FunctionalUnitOperationType::IntDivide) > 0);
    assert!(fu.full_cycles(FunctionalUnitType::IntegerMultiplyDivide) > 0);
}

#[test]
fn issue_width_bounds_instructions_per_cycle() {
    let mut config = single_thread_config();
    config.processor.issue_width = 2;
    let trace = (0..8).fold(TraceBuilder::new(0x400), |t, i| t.op(mul(3 + i, 1, 2)));
    let mut tc = TestContext::new(&config);
    let _ = tc.attach(0, trace);

    let mut issued_at = HashMap::new();
    while tc.core.has_contexts() {
        assert!(tc.now < 500, "run did not finish");
        tc.cycle().unwrap();
        record_issue(&tc.core, tc.now, &mut issued_at);
    }

    let mut per_cycle: HashMap<u64, usize> = HashMap::new();
    for cycle in issued_at.values() {
        *per_cycle.entry(*cycle).or_default() += 1;
    }
    assert!(per_cycle.values().all(|&n| n <= 2), "{per_cycle:?}");
    assert_eq!(tc.core.threads[0].stats.committed_instructions, 8);
}
