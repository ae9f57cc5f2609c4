//! Simulation statistics collection and reporting.
//!
//! This module tracks the read-only counters the pipeline exposes. It provides:
//! 1. **Thread counters:** Committed work, squashes, forwarding and every stall
//!    the per-thread stages can hit.
//! 2. **Core counters:** Functional-unit pressure, register file occupancy,
//!    coalesced memory accesses and the collaborators' hit/miss counts.
//! 3. **Aggregate view:** Cycle count and IPC over snapshots of both.
//! 4. **Reporting:** A sectioned text report in the style of the simulator's
//!    command-line output.
//!
//! Stalls are never errors; each one bumps exactly one counter here.

use std::fmt::Write as _;

use serde::Serialize;

use crate::core::units::bru::BranchPredictorStats;
use crate::core::units::cache::CacheStats;
use crate::core::units::fu::{FunctionalUnitOperationType, FunctionalUnitStats, FunctionalUnitType};
use crate::isa::RegisterDependencyType;

/// Counters of one hardware thread.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ThreadStats {
    /// Global thread id.
    pub thread: usize,
    /// Instructions committed in measurement.
    pub committed_instructions: u64,
    /// Instructions executed functionally in fast-forward.
    pub fast_forwarded_instructions: u64,
    /// Instructions executed while warming the caches.
    pub warmup_instructions: u64,
    /// Squashes performed.
    pub squashes: u64,
    /// Entries removed by squashes.
    pub squashed_entries: u64,
    /// Loads satisfied by store-to-load forwarding.
    pub forwarded_loads: u64,

    /// Fetch attempts refused because the decode buffer was full.
    pub fetch_stalls_decode_buffer_full: u64,
    /// Rename attempts with nothing to rename.
    pub rename_stalls_decode_buffer_empty: u64,
    /// Rename attempts refused because the ROB was full.
    pub rename_stalls_reorder_buffer_full: u64,
    /// Rename attempts refused per register class with too few free registers.
    pub rename_stalls_register_file_full: [u64; 3],
    /// Dispatch attempts refused because the LSQ was full.
    pub dispatch_stalls_load_store_queue_full: u64,
    /// Loads left in the ready queue because the data cache refused them.
    pub selection_stalls_cannot_load: u64,
    /// Stores left in the ready queue because the data cache refused them.
    pub selection_stalls_cannot_store: u64,
    /// Issue attempts refused for want of a functional unit.
    pub selection_stalls_no_free_functional_unit: u64,

    /// Cycles with a full decode buffer.
    pub decode_buffer_full_cycles: u64,
    /// Cycles with a full ROB.
    pub reorder_buffer_full_cycles: u64,
    /// Cycles with a full LSQ.
    pub load_store_queue_full_cycles: u64,
    /// Cycles in which the ROB head was not yet completed.
    pub reorder_buffer_head_wait_cycles: u64,
    /// Commit watchdog expirations over the whole run.
    pub commit_timeouts: u32,

    /// Branch predictor accuracy, filled in by snapshots.
    pub branch_predictor: BranchPredictorStats,
    /// Instruction TLB counters, filled in by snapshots.
    pub itlb: CacheStats,
    /// Data TLB counters, filled in by snapshots.
    pub dtlb: CacheStats,
}

impl ThreadStats {
    /// Fresh counters for `thread`.
    pub fn new(thread: usize) -> Self {
        Self {
            thread,
            ..Self::default()
        }
    }

    /// Rename stalls charged to a full `kind` register file.
    pub const fn rename_stalls_register_file_full(&self, kind: RegisterDependencyType) -> u64 {
        self.rename_stalls_register_file_full[kind.index()]
    }
}

/// Counters of one core.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CoreStats {
    /// Core index.
    pub core: usize,
    /// Functional unit stalls and full cycles.
    pub functional_units: FunctionalUnitStats,
    /// Cycles in which a register file had no free register, per class.
    pub register_file_full_cycles: [u64; 3],
    /// Accesses folded into an in-flight access to the same line.
    pub aliased_accesses: u64,
    /// L1 instruction cache counters, filled in by snapshots.
    pub l1i: CacheStats,
    /// L1 data cache counters, filled in by snapshots.
    pub l1d: CacheStats,
}

impl CoreStats {
    /// Fresh counters for `core`.
    pub fn new(core: usize) -> Self {
        Self {
            core,
            ..Self::default()
        }
    }
}

/// Snapshot of every counter of a simulation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SimStats {
    /// Cycles simulated.
    pub cycles: u64,
    /// Cycles spent in measurement.
    pub measurement_cycles: u64,
    /// Per-thread counters in global thread order.
    pub threads: Vec<ThreadStats>,
    /// Per-core counters.
    pub cores: Vec<CoreStats>,
}

impl SimStats {
    /// Instructions committed by every thread.
    pub fn committed_instructions(&self) -> u64 {
        self.threads.iter().map(|t| t.committed_instructions).sum()
    }

    /// Committed instructions per measurement cycle, or 0 before any.
    pub fn ipc(&self) -> f64 {
        if self.measurement_cycles == 0 {
            0.0
        } else {
            self.committed_instructions() as f64 / self.measurement_cycles as f64
        }
    }

    /// Renders the requested report sections.
    ///
    /// Known sections are `summary`, `threads`, `functional_units` and
    /// `memory`; an empty list selects all of them.
    pub fn render_sections(&self, sections: &[String]) -> String {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let mut out = String::new();
        let rule = "----------------------------------------------------------";

        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "OUT-OF-ORDER CORE SIMULATION STATISTICS");
        let _ = writeln!(out, "==========================================================");
        if want("summary") {
            let _ = writeln!(out, "sim_cycles               {}", self.cycles);
            let _ = writeln!(out, "sim_measurement_cycles   {}", self.measurement_cycles);
            let _ = writeln!(out, "sim_insts                {}", self.committed_instructions());
            let _ = writeln!(out, "sim_ipc                  {:.4}", self.ipc());
            let _ = writeln!(out, "{rule}");
        }
        if want("threads") {
            let _ = writeln!(out, "THREADS");
            for t in &self.threads {
                let _ = writeln!(
                    out,
                    "  t{:<3} committed: {:<10} squashes: {:<8} forwarded: {:<8} bp.accuracy: {:.2}%",
                    t.thread,
                    t.committed_instructions,
                    t.squashes,
                    t.forwarded_loads,
                    t.branch_predictor.hit_rate() * 100.0
                );
                let _ = writeln!(
                    out,
                    "       stalls fetch.full: {} rename.empty: {} rename.rob: {} rename.regs: {:?} dispatch.lsq: {}",
                    t.fetch_stalls_decode_buffer_full,
                    t.rename_stalls_decode_buffer_empty,
                    t.rename_stalls_reorder_buffer_full,
                    t.rename_stalls_register_file_full,
                    t.dispatch_stalls_load_store_queue_full
                );
                let _ = writeln!(
                    out,
                    "       stalls load: {} store: {} fu: {} rob_head_wait: {}",
                    t.selection_stalls_cannot_load,
                    t.selection_stalls_cannot_store,
                    t.selection_stalls_no_free_functional_unit,
                    t.reorder_buffer_head_wait_cycles
                );
            }
            let _ = writeln!(out, "{rule}");
        }
        if want("functional_units") {
            let _ = writeln!(out, "FUNCTIONAL UNITS");
            for c in &self.cores {
                for unit in FunctionalUnitType::ALL {
                    let _ = writeln!(
                        out,
                        "  c{} {:<24} full_cycles: {}",
                        c.core,
                        unit.name(),
                        c.functional_units.full_cycles(unit)
                    );
                }
                for op in FunctionalUnitOperationType::ALL {
                    let stalls = c.functional_units.stalls(op);
                    if stalls > 0 {
                        let _ = writeln!(out, "  c{} {:<24} stalls: {stalls}", c.core, op.name());
                    }
                }
            }
            let _ = writeln!(out, "{rule}");
        }
        if want("memory") {
            let _ = writeln!(out, "MEMORY HIERARCHY");
            let mut line = |name: String, stats: CacheStats| {
                let _ = writeln!(
                    out,
                    "  {:<8} accesses: {:<10} | hits: {:<10} | miss_rate: {:.2}%",
                    name,
                    stats.accesses(),
                    stats.hits,
                    if stats.accesses() == 0 { 0.0 } else { 100.0 - stats.hit_rate() * 100.0 }
                );
            };
            for c in &self.cores {
                line(format!("c{}.l1i", c.core), c.l1i);
                line(format!("c{}.l1d", c.core), c.l1d);
            }
            for t in &self.threads {
                line(format!("t{}.itlb", t.thread), t.itlb);
                line(format!("t{}.dtlb", t.thread), t.dtlb);
            }
            for c in &self.cores {
                let _ = writeln!(out, "  c{}.aliased_accesses {}", c.core, c.aliased_accesses);
            }
        }
        let _ = writeln!(out, "==========================================================");
        out
    }

    /// Prints the requested report sections to stdout.
    pub fn print_sections(&self, sections: &[String]) {
        print!("{}", self.render_sections(sections));
    }

    /// Prints every section to stdout.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
