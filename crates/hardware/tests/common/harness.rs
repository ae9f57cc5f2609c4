//! Core-level test harness.
//!
//! `TestContext` owns one core together with the event queue and id generator
//! a `Simulation` would own, so tests can run whole cycles or call single
//! stages and inspect every structure in between.

use std::sync::Arc;

use oosim_core::common::ids::{EntryId, IdGenerator};
use oosim_core::config::Config;
use oosim_core::core::pipeline::entry::{DecodeBufferEntry, PipelineEntry};
use oosim_core::core::pipeline::regfile::PhysicalRegisterState;
use oosim_core::core::units::bru::BranchPredictorUpdate;
use oosim_core::core::Core;
use oosim_core::isa::{
    DynamicInstruction, Mnemonic, RegisterDependency, StaticInstruction, TraceBuilder,
};
use oosim_core::sim::event::{CycleContext, EventQueue};
use oosim_core::SimResult;
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One core running one thread, everything else at its defaults.
pub fn single_thread_config() -> Config {
    let mut config = Config::default();
    config.processor.num_cores = 1;
    config.processor.threads_per_core = 1;
    config
}

// ══════════════════════════════════════════════════════════
// Instruction shorthands
// ══════════════════════════════════════════════════════════

/// Integer register `r<index>`.
pub const fn r(index: u8) -> RegisterDependency {
    RegisterDependency::integer(index)
}

fn ins(mnemonic: Mnemonic, inputs: &[RegisterDependency], outputs: &[RegisterDependency]) -> StaticInstruction {
    StaticInstruction::new(mnemonic, inputs.to_vec(), outputs.to_vec())
}

/// `addu rd, rs, rt`
pub fn addu(rd: u8, rs: u8, rt: u8) -> StaticInstruction {
    ins(Mnemonic::Addu, &[r(rs), r(rt)], &[r(rd)])
}

/// `mul rd, rs, rt`, which completes without a functional unit.
pub fn mul(rd: u8, rs: u8, rt: u8) -> StaticInstruction {
    ins(Mnemonic::Mul, &[r(rs), r(rt)], &[r(rd)])
}

/// `div rs, rt` writing `rd`.
pub fn div(rd: u8, rs: u8, rt: u8) -> StaticInstruction {
    ins(Mnemonic::Div, &[r(rs), r(rt)], &[r(rd)])
}

/// `lw rt, 0(base)`
pub fn lw(rt: u8, base: u8) -> StaticInstruction {
    ins(Mnemonic::Lw, &[r(base)], &[r(rt)])
}

/// `sw rt, 0(base)`
pub fn sw(rt: u8, base: u8) -> StaticInstruction {
    ins(Mnemonic::Sw, &[r(base), r(rt)], &[])
}

/// `beq rs, rt`
pub fn beq(rs: u8, rt: u8) -> StaticInstruction {
    ins(Mnemonic::Beq, &[r(rs), r(rt)], &[])
}

/// `nop`
pub fn nop() -> StaticInstruction {
    ins(Mnemonic::Nop, &[], &[])
}

/// A decode buffer entry for a non-speculative, non-control instruction.
pub fn decoded(
    ids: &mut IdGenerator,
    thread: usize,
    pc: u64,
    instruction: StaticInstruction,
    effective_address: Option<u64>,
) -> DecodeBufferEntry {
    DecodeBufferEntry {
        instruction: DynamicInstruction {
            id: ids.next_instruction_id(),
            thread,
            pc,
            static_instruction: Arc::new(instruction),
            effective_address,
        },
        npc: pc + 4,
        nnpc: pc + 8,
        predicted_npc: pc + 4,
        return_address_stack_recover_index: 0,
        branch_predictor_update: BranchPredictorUpdate::default(),
        speculative: false,
    }
}

// ══════════════════════════════════════════════════════════
// TestContext
// ══════════════════════════════════════════════════════════

/// One core plus the event queue and id generator it runs against.
#[derive(Debug)]
pub struct TestContext {
    pub core: Core,
    pub events: EventQueue,
    pub ids: IdGenerator,
    pub now: u64,
}

impl TestContext {
    /// Builds core 0 from `config` with the default cache controllers.
    pub fn new(config: &Config) -> Self {
        Self::with_core(Core::new(0, config).expect("core"))
    }

    /// Wraps an already built core.
    pub fn with_core(core: Core) -> Self {
        init_tracing();
        Self {
            core,
            events: EventQueue::new(),
            ids: IdGenerator::new(),
            now: 0,
        }
    }

    /// Binds the trace to core-local thread `thread`.
    pub fn attach(&mut self, thread: usize, trace: TraceBuilder) -> &mut Self {
        self.core.attach(thread, Box::new(trace.build()));
        self
    }

    /// Runs `f` against the core with a context for the current cycle.
    pub fn with<R>(&mut self, f: impl FnOnce(&mut Core, &mut CycleContext<'_>) -> R) -> R {
        let mut cx = CycleContext {
            now: self.now,
            events: &mut self.events,
            ids: &mut self.ids,
        };
        f(&mut self.core, &mut cx)
    }

    /// Advances the clock by one cycle and delivers the events now due.
    pub fn advance(&mut self) -> SimResult<()> {
        self.now += 1;
        while let Some(event) = self.events.pop_due(self.now) {
            self.core.handle_event(event)?;
        }
        Ok(())
    }

    /// One full measurement cycle, as `Simulation::step` would run it.
    pub fn cycle(&mut self) -> SimResult<()> {
        self.with(|core, cx| core.do_measurement_one_cycle(cx))?;
        self.advance()?;
        let _ = self.core.retire_finished_contexts();
        Ok(())
    }

    /// Runs cycles until `done` holds, panicking after `limit` cycles.
    ///
    /// Returns the number of cycles run.
    pub fn run_until(&mut self, limit: u64, mut done: impl FnMut(&Core) -> bool) -> u64 {
        let mut cycles = 0;
        while !done(&self.core) {
            assert!(cycles < limit, "condition not reached within {limit} cycles");
            self.cycle().expect("cycle");
            cycles += 1;
        }
        cycles
    }

    /// Runs until every context has retired.
    pub fn run_to_completion(&mut self, limit: u64) -> u64 {
        self.run_until(limit, |core| !core.has_contexts())
    }

    /// Inserts a standalone ROB entry, outside any thread's buffers.
    pub fn live_entry(
        &mut self,
        thread: usize,
        pc: u64,
        instruction: StaticInstruction,
        effective_address: Option<u64>,
    ) -> EntryId {
        let id = self.ids.next_entry_id();
        let entry = PipelineEntry::reorder(id, decoded(&mut self.ids, thread, pc, instruction, effective_address));
        self.core.entries.insert(entry);
        id
    }
}

/// Asserts that every register file's state counts add up to its capacity.
pub fn assert_registers_conserved(core: &Core) {
    for file in core.register_files.iter() {
        let total = file.count(PhysicalRegisterState::Available)
            + file.count(PhysicalRegisterState::ArchitecturalRegister)
            + file.count(PhysicalRegisterState::RenameBufferNotValid)
            + file.count(PhysicalRegisterState::RenameBufferValid);
        assert_eq!(total, file.capacity(), "{:?} file leaked registers", file.kind());
    }
}
