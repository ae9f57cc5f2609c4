//! Fetch Stage Tests.
//!
//! Verifies instruction line requests, fetch group termination (line
//! boundary, taken prediction, full decode buffer) and the fetch policies.

use oosim_core::config::FetchPolicy;
use oosim_core::core::pipeline::stages::fetch::fetch;
use oosim_core::core::pipeline::stages::fetch_stage;
use oosim_core::isa::TraceBuilder;
use pretty_assertions::assert_eq;

use crate::common::harness::{addu, beq, nop, single_thread_config, TestContext};

fn straight_line(start: u64, count: usize) -> TraceBuilder {
    (0..count).fold(TraceBuilder::new(start), |t, i| t.op(addu(3 + (i % 8) as u8, 1, 2)))
}

/// Marks the line holding the thread's fetch pc as already delivered.
fn line_present(tc: &mut TestContext, thread: usize) {
    let t = &mut tc.core.threads[thread];
    t.last_fetched_cache_line = Some(t.fetch_npc & !63);
}

// ══════════════════════════════════════════════════════════
// Instruction lines
// ══════════════════════════════════════════════════════════

/// The first fetch of a line only requests it; decoding waits for the line.
#[test]
fn first_fetch_requests_line_and_stalls() {
    let mut tc = TestContext::new(&single_thread_config());
    let _ = tc.attach(0, straight_line(0x400, 4));

    tc.with(|core, cx| fetch(core, 0, cx));
    let t = &tc.core.threads[0];
    assert!(t.fetch_stalled);
    assert_eq!(t.last_fetched_cache_line, Some(0x400));
    assert!(t.decode_buffer.is_empty());
    assert!(!tc.events.is_empty());

    let waited = tc.run_until(100, |core| !core.threads[0].fetch_stalled);
    assert!(waited > 0);
    tc.with(|core, cx| fetch(core, 0, cx));
    assert_eq!(tc.core.threads[0].decode_buffer.len(), 4);
}

#[test]
fn group_ends_at_line_boundary() {
    let mut tc = TestContext::new(&single_thread_config());
    let _ = tc.attach(0, straight_line(0x400, 32));
    line_present(&mut tc, 0);

    tc.with(|core, cx| fetch(core, 0, cx));
    let t = &tc.core.threads[0];
    assert_eq!(t.decode_buffer.len(), 16);
    assert_eq!(t.fetch_npc, 0x440);
}

#[test]
fn taken_prediction_ends_group() {
    let mut tc = TestContext::new(&single_thread_config());
    let trace = TraceBuilder::new(0x400)
        .op(addu(3, 1, 2))
        .branch(beq(1, 2), 0x800, true)
        .op(addu(4, 1, 2));
    let _ = tc.attach(0, trace);
    line_present(&mut tc, 0);

    tc.with(|core, cx| fetch(core, 0, cx));
    let t = &tc.core.threads[0];
    assert_eq!(t.decode_buffer.len(), 2);
    assert_eq!(t.fetch_npc, 0x800);
}

#[test]
fn nops_are_not_buffered() {
    let mut tc = TestContext::new(&single_thread_config());
    let trace = TraceBuilder::new(0x400).op(nop()).op(addu(3, 1, 2)).op(nop()).op(addu(4, 1, 2));
    let _ = tc.attach(0, trace);
    line_present(&mut tc, 0);

    tc.with(|core, cx| fetch(core, 0, cx));
    let pcs: Vec<u64> = tc.core.threads[0].decode_buffer.iter().map(|e| e.instruction.pc).collect();
    assert_eq!(pcs, vec![0x404, 0x40c]);
}

// ══════════════════════════════════════════════════════════
// Back-pressure
// ══════════════════════════════════════════════════════════

/// With a decode buffer of eight, a ninth fetch attempt inserts nothing and
/// counts one stall.
#[test]
fn full_decode_buffer_stalls_fetch() {
    let mut config = single_thread_config();
    config.processor.decode_buffer_capacity = 8;
    let mut tc = TestContext::new(&config);
    let _ = tc.attach(0, straight_line(0x400, 16));
    line_present(&mut tc, 0);

    tc.with(|core, cx| fetch(core, 0, cx));
    assert!(tc.core.threads[0].decode_buffer.is_full());
    let stalls = tc.core.threads[0].stats.fetch_stalls_decode_buffer_full;
    let npc = tc.core.threads[0].context.as_ref().unwrap().npc();
    assert_eq!(npc, 0x420);

    tc.with(|core, cx| fetch(core, 0, cx));
    let t = &tc.core.threads[0];
    assert_eq!(t.decode_buffer.len(), 8);
    assert_eq!(t.stats.fetch_stalls_decode_buffer_full, stalls + 1);
    assert_eq!(t.context.as_ref().unwrap().npc(), npc);
}

// ══════════════════════════════════════════════════════════
// Fetch policies
// ══════════════════════════════════════════════════════════

#[test]
fn all_threads_policy_fetches_every_thread() {
    let mut config = single_thread_config();
    config.processor.threads_per_core = 2;
    let mut tc = TestContext::new(&config);
    let _ = tc.attach(0, straight_line(0x400, 4)).attach(1, straight_line(0x400, 4));
    line_present(&mut tc, 0);
    line_present(&mut tc, 1);

    tc.with(|core, cx| fetch_stage(core, cx)).unwrap();
    assert_eq!(tc.core.threads[0].decode_buffer.len(), 4);
    assert_eq!(tc.core.threads[1].decode_buffer.len(), 4);
}

#[test]
fn round_robin_policy_alternates_threads() {
    let mut config = single_thread_config();
    config.processor.threads_per_core = 2;
    config.processor.fetch_policy = FetchPolicy::RoundRobin;
    let mut tc = TestContext::new(&config);
    let _ = tc.attach(0, straight_line(0x400, 32)).attach(1, straight_line(0x400, 32));
    line_present(&mut tc, 0);
    line_present(&mut tc, 1);

    tc.with(|core, cx| fetch_stage(core, cx)).unwrap();
    let first: Vec<usize> = tc.core.threads.iter().map(|t| t.decode_buffer.len()).collect();
    assert_eq!(first, vec![16, 0]);

    line_present(&mut tc, 0);
    line_present(&mut tc, 1);
    tc.with(|core, cx| fetch_stage(core, cx)).unwrap();
    let second: Vec<usize> = tc.core.threads.iter().map(|t| t.decode_buffer.len()).collect();
    assert_eq!(second, vec![16, 16]);
}
