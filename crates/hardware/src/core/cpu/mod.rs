//! Core Definition and Initialization.
//!
//! This module defines the central `Core` structure, the container for one
//! out-of-order core and its SMT threads. It coordinates the following:
//! 1. **Shared Resources:** Physical register files, the entry table, issue
//!    queues and the functional unit pool, shared by every thread of the core.
//! 2. **Threads:** Per-thread buffers, rename tables, predictors and TLBs.
//! 3. **Memory Hierarchy:** L1 instruction and data cache controllers and the
//!    access coordinator joining them with the TLBs.
//! 4. **Strategies:** Thread schedulers for rename and dispatch and the fetch
//!    policy, injected at construction.

/// Per-cycle execution, simulation modes and event handling.
pub mod execution;

/// Memory access coordination.
pub mod memory;

/// Hardware thread state.
pub mod thread;

use crate::common::error::SimResult;
use crate::config::{Config, ProcessorConfig};
use crate::core::pipeline::entry::EntryTable;
use crate::core::pipeline::queues::IssueQueues;
use crate::core::pipeline::regfile::RegisterFiles;
use crate::core::pipeline::scheduler::{fetch_strategy, FetchStrategy, RoundRobinScheduler, ThreadScheduler};
use crate::core::units::cache::{BasicCacheController, CacheController};
use crate::core::units::fu::FunctionalUnitPool;
use crate::isa::Context;
use crate::stats::{CoreStats, ThreadStats};

pub use self::memory::{AccessWaiter, MemoryAccessCoordinator};
pub use self::thread::Thread;

/// One out-of-order core.
///
/// Stages are methods on `Core` taking a core-local thread index; entries
/// record the global thread id.
#[derive(Debug)]
pub struct Core {
    /// Core index.
    pub id: usize,
    /// Hardware threads, in core-local order.
    pub threads: Vec<Thread>,
    /// Integer, floating-point and misc physical register files.
    pub register_files: RegisterFiles,
    /// Every live ROB and LSQ entry.
    pub entries: EntryTable,
    /// Issue and completion queues.
    pub queues: IssueQueues,
    /// Functional units.
    pub functional_units: FunctionalUnitPool,
    /// L1 instruction cache controller.
    pub l1i: Box<dyn CacheController>,
    /// L1 data cache controller.
    pub l1d: Box<dyn CacheController>,
    /// Join counters of in-flight memory accesses.
    pub memory: MemoryAccessCoordinator,
    /// Core-level counters.
    pub stats: CoreStats,
    pub(crate) rename_scheduler: Option<Box<dyn ThreadScheduler>>,
    pub(crate) dispatch_scheduler: Option<Box<dyn ThreadScheduler>>,
    pub(crate) fetch_strategy: Box<dyn FetchStrategy>,
    pub(crate) processor: ProcessorConfig,
    pub(crate) commit_timeout_cycles: u64,
    pub(crate) max_commit_timeouts: u32,
}

impl Core {
    /// Creates core `id` with basic L1 cache controllers.
    ///
    /// # Errors
    ///
    /// Propagates register file exhaustion while seeding the threads' rename
    /// tables.
    pub fn new(id: usize, config: &Config) -> SimResult<Self> {
        Self::with_caches(
            id,
            config,
            Box::new(BasicCacheController::new(format!("c{id}.l1i"), &config.l1i)),
            Box::new(BasicCacheController::new(format!("c{id}.l1d"), &config.l1d)),
        )
    }

    /// Creates core `id` around caller-supplied cache controllers.
    ///
    /// # Errors
    ///
    /// Propagates register file exhaustion while seeding the threads' rename
    /// tables.
    pub fn with_caches(
        id: usize,
        config: &Config,
        l1i: Box<dyn CacheController>,
        l1d: Box<dyn CacheController>,
    ) -> SimResult<Self> {
        let p = &config.processor;
        let mut register_files = RegisterFiles::new(p.physical_register_file_capacity);
        let threads = (0..p.threads_per_core)
            .map(|index| Thread::new(id * p.threads_per_core + index, index, config, &mut register_files))
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Self {
            id,
            threads,
            register_files,
            entries: EntryTable::new(),
            queues: IssueQueues::new(),
            functional_units: FunctionalUnitPool::new(id, &config.functional_units),
            l1i,
            l1d,
            memory: MemoryAccessCoordinator::new(),
            stats: CoreStats::new(id),
            rename_scheduler: Some(Box::new(RoundRobinScheduler::new())),
            dispatch_scheduler: Some(Box::new(RoundRobinScheduler::new())),
            fetch_strategy: fetch_strategy(p.fetch_policy),
            processor: p.clone(),
            commit_timeout_cycles: config.simulation.commit_timeout_cycles,
            max_commit_timeouts: config.simulation.max_commit_timeouts,
        })
    }

    /// Replaces the rename and dispatch thread schedulers.
    #[must_use]
    pub fn with_schedulers(mut self, rename: Box<dyn ThreadScheduler>, dispatch: Box<dyn ThreadScheduler>) -> Self {
        self.rename_scheduler = Some(rename);
        self.dispatch_scheduler = Some(dispatch);
        self
    }

    /// Replaces the fetch policy.
    #[must_use]
    pub fn with_fetch_strategy(mut self, strategy: Box<dyn FetchStrategy>) -> Self {
        self.fetch_strategy = strategy;
        self
    }

    /// Binds `context` to core-local thread `thread`.
    pub fn attach(&mut self, thread: usize, context: Box<dyn Context>) {
        if let Some(t) = self.threads.get_mut(thread) {
            t.attach(context);
        }
    }

    /// Core-local index of global thread `thread`.
    pub fn local_thread(&self, thread: usize) -> Option<usize> {
        self.threads.iter().position(|t| t.id == thread)
    }

    /// Returns true if any thread still has a context bound.
    pub fn has_contexts(&self) -> bool {
        self.threads.iter().any(|t| t.context.is_some())
    }

    /// Snapshot of the core's counters, with collaborator counts filled in.
    pub fn core_stats(&self) -> CoreStats {
        let mut stats = self.stats.clone();
        stats.functional_units = self.functional_units.stats.clone();
        stats.aliased_accesses = self.memory.aliased_accesses();
        stats.l1i = self.l1i.stats();
        stats.l1d = self.l1d.stats();
        stats
    }

    /// Snapshots of the threads' counters, with collaborator counts filled in.
    pub fn thread_stats(&self) -> Vec<ThreadStats> {
        use crate::core::units::bru::BranchPredictor as _;
        self.threads
            .iter()
            .map(|t| {
                let mut stats = t.stats.clone();
                stats.branch_predictor = t.branch_predictor.stats();
                stats.itlb = t.mmu.itlb.stats();
                stats.dtlb = t.mmu.dtlb.stats();
                stats
            })
            .collect()
    }
}
