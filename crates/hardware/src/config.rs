//! Configuration system for the out-of-order core simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline microarchitectural constants (widths, capacities, latencies).
//! 2. **Structures:** Hierarchical config for the processor, functional units, branch
//!    predictor, translation buffers, L1 caches and simulation phases.
//! 3. **Enums:** Fetch policy and branch predictor selection.
//! 4. **Validation:** Rejection of geometries the pipeline cannot run with.
//!
//! Configuration is supplied as JSON (from the Python API or a file) or built with
//! `Config::default()`.

use std::path::Path;

use serde::Deserialize;

use crate::common::constants::{NUM_FLOAT_REGISTERS, NUM_INT_REGISTERS, NUM_MISC_REGISTERS};
use crate::common::error::{SimError, SimResult};

/// Default configuration constants for the simulator.
mod defaults {
    /// Number of cores in the simulated processor.
    pub const NUM_CORES: usize = 2;

    /// Hardware threads per core (SMT contexts).
    pub const THREADS_PER_CORE: usize = 2;

    /// Physical registers per register file.
    ///
    /// Each core owns one integer, one floating-point and one miscellaneous file
    /// of this capacity, shared by all of its threads.
    pub const PHYSICAL_REGISTER_FILE_CAPACITY: usize = 128;

    /// Instructions renamed per core per cycle.
    pub const DECODE_WIDTH: usize = 4;

    /// Instructions issued per core per cycle.
    pub const ISSUE_WIDTH: usize = 4;

    /// Instructions committed per thread per cycle.
    pub const COMMIT_WIDTH: usize = 4;

    /// Per-thread decode buffer capacity.
    pub const DECODE_BUFFER_CAPACITY: usize = 96;

    /// Per-thread reorder buffer capacity.
    pub const REORDER_BUFFER_CAPACITY: usize = 96;

    /// Per-thread load/store queue capacity.
    pub const LOAD_STORE_QUEUE_CAPACITY: usize = 48;

    /// Integer ALUs per core.
    pub const INTEGER_ALU: usize = 8;

    /// Integer multiply/divide units per core.
    pub const INTEGER_MULTIPLY_DIVIDE: usize = 2;

    /// Floating-point adders per core.
    pub const FLOAT_ADD: usize = 8;

    /// Floating-point multiply/divide units per core.
    pub const FLOAT_MULTIPLY_DIVIDE: usize = 2;

    /// Memory ports (effective-address computation) per core.
    pub const MEMORY_PORT: usize = 4;

    /// Entries in the bimodal two-bit counter table.
    pub const BIMOD_SIZE: usize = 2048;

    /// Branch target buffer sets.
    pub const BTB_SETS: usize = 512;

    /// Branch target buffer associativity.
    pub const BTB_ASSOCIATIVITY: usize = 4;

    /// Return address stack depth.
    pub const RAS_SIZE: usize = 8;

    /// Translation buffer entries.
    pub const TLB_ENTRIES: usize = 512;

    /// Translation buffer associativity.
    pub const TLB_ASSOCIATIVITY: usize = 4;

    /// Translation granule in bytes.
    pub const PAGE_SIZE: u64 = 4096;

    /// Translation buffer hit latency in cycles.
    pub const TLB_HIT_LATENCY: u64 = 2;

    /// Translation buffer miss latency in cycles.
    pub const TLB_MISS_LATENCY: u64 = 30;

    /// L1 cache size in bytes (64 KiB).
    pub const CACHE_SIZE: usize = 64 * 1024;

    /// L1 cache associativity.
    pub const CACHE_ASSOCIATIVITY: usize = 4;

    /// L1 cache line size in bytes.
    pub const CACHE_LINE: u64 = 64;

    /// L1 hit latency in cycles.
    pub const CACHE_HIT_LATENCY: u64 = 1;

    /// Additional cycles to service an L1 miss from the next level.
    pub const CACHE_MISS_LATENCY: u64 = 10;

    /// Outstanding distinct line fills per L1 cache.
    pub const CACHE_MSHRS: usize = 8;

    /// Cycles without a commit before the watchdog fires.
    pub const COMMIT_TIMEOUT_CYCLES: u64 = 1_000_000;

    /// Watchdog expirations tolerated before the run is aborted.
    pub const MAX_COMMIT_TIMEOUTS: u32 = 5;
}

/// Thread selection policy for the fetch stage.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum FetchPolicy {
    /// Every running thread fetches every cycle.
    #[default]
    AllThreads,
    /// One running thread fetches per cycle, rotating between threads.
    RoundRobin,
}

/// Branch predictor selection.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum BranchPredictorType {
    /// Oracle predictor; never mispredicts.
    #[default]
    Perfect,
    /// Static predictor: conditional branches predicted taken.
    Taken,
    /// Static predictor: conditional branches predicted not taken.
    NotTaken,
    /// Bimodal table of two-bit saturating counters.
    #[serde(alias = "Bimod")]
    TwoBit,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use oosim_core::config::{BranchPredictorType, Config};
///
/// let json = r#"{
///     "processor": { "num_cores": 1, "threads_per_core": 2, "issue_width": 2 },
///     "branch_predictor": { "kind": "TwoBit" },
///     "l1d": { "mshrs": 4 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.processor.issue_width, 2);
/// assert_eq!(config.processor.decode_width, 4);
/// assert_eq!(config.branch_predictor.kind, BranchPredictorType::TwoBit);
/// assert_eq!(config.l1d.mshrs, 4);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Core count, widths and buffer capacities.
    #[serde(default)]
    pub processor: ProcessorConfig,
    /// Functional unit quantities.
    #[serde(default)]
    pub functional_units: FunctionalUnitConfig,
    /// Branch predictor selection and geometry.
    #[serde(default)]
    pub branch_predictor: BranchPredictorConfig,
    /// Per-thread instruction and data translation buffers.
    #[serde(default)]
    pub tlb: TlbConfig,
    /// Per-core L1 instruction cache.
    #[serde(default)]
    pub l1i: CacheConfig,
    /// Per-core L1 data cache.
    #[serde(default)]
    pub l1d: CacheConfig,
    /// Simulation phases and watchdog.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Config {
    /// Parses a configuration from a JSON document and validates it.
    ///
    /// Missing sections and fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidConfig` if the JSON is malformed or the resulting
    /// configuration fails [`Config::validate`].
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidConfig` if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SimError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Checks that the configuration describes a machine the pipeline can run.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidConfig` naming the first offending parameter.
    pub fn validate(&self) -> SimResult<()> {
        let p = &self.processor;
        let nonzero = [
            ("processor.num_cores", p.num_cores),
            ("processor.threads_per_core", p.threads_per_core),
            ("processor.decode_width", p.decode_width),
            ("processor.issue_width", p.issue_width),
            ("processor.commit_width", p.commit_width),
            ("processor.decode_buffer_capacity", p.decode_buffer_capacity),
            ("processor.reorder_buffer_capacity", p.reorder_buffer_capacity),
            ("processor.load_store_queue_capacity", p.load_store_queue_capacity),
            ("functional_units.integer_alu", self.functional_units.integer_alu),
            ("functional_units.memory_port", self.functional_units.memory_port),
            ("tlb.num_entries", self.tlb.num_entries),
            ("l1i.mshrs", self.l1i.mshrs),
            ("l1d.mshrs", self.l1d.mshrs),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(SimError::InvalidConfig(format!("{name} must be non-zero")));
            }
        }

        for (name, count) in [
            ("integer", NUM_INT_REGISTERS),
            ("floating-point", NUM_FLOAT_REGISTERS),
            ("misc", NUM_MISC_REGISTERS),
        ] {
            let reserved = p.threads_per_core * count;
            if p.physical_register_file_capacity <= reserved {
                return Err(SimError::InvalidConfig(format!(
                    "physical_register_file_capacity {} leaves no rename registers in the {name} file \
                     ({} threads x {count} architectural registers)",
                    p.physical_register_file_capacity, p.threads_per_core
                )));
            }
        }

        if !self.tlb.page_size.is_power_of_two() {
            return Err(SimError::InvalidConfig("tlb.page_size must be a power of two".into()));
        }
        if self.tlb.associativity == 0 || self.tlb.num_entries % self.tlb.associativity != 0 {
            return Err(SimError::InvalidConfig(
                "tlb.num_entries must be a multiple of tlb.associativity".into(),
            ));
        }
        if !(self.tlb.num_entries / self.tlb.associativity).is_power_of_two() {
            return Err(SimError::InvalidConfig("tlb set count must be a power of two".into()));
        }

        self.l1i.validate("l1i")?;
        self.l1d.validate("l1d")?;

        let bp = &self.branch_predictor;
        if bp.kind != BranchPredictorType::Perfect {
            if !bp.bimod_size.is_power_of_two() || !bp.btb_sets.is_power_of_two() {
                return Err(SimError::InvalidConfig(
                    "branch_predictor.bimod_size and btb_sets must be powers of two".into(),
                ));
            }
            if bp.btb_associativity == 0 {
                return Err(SimError::InvalidConfig(
                    "branch_predictor.btb_associativity must be non-zero".into(),
                ));
            }
        }
        Ok(())
    }

    /// Total number of hardware threads across all cores.
    pub const fn num_threads(&self) -> usize {
        self.processor.num_cores * self.processor.threads_per_core
    }
}

/// Processor-wide pipeline geometry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Number of cores.
    #[serde(default = "ProcessorConfig::default_num_cores")]
    pub num_cores: usize,
    /// Hardware threads per core.
    #[serde(default = "ProcessorConfig::default_threads_per_core")]
    pub threads_per_core: usize,
    /// Capacity of each physical register file.
    #[serde(default = "ProcessorConfig::default_physical_register_file_capacity")]
    pub physical_register_file_capacity: usize,
    /// Rename width (instructions per core per cycle).
    #[serde(default = "ProcessorConfig::default_decode_width")]
    pub decode_width: usize,
    /// Issue width shared by the instruction, load and store queues.
    #[serde(default = "ProcessorConfig::default_issue_width")]
    pub issue_width: usize,
    /// Commit width per thread.
    #[serde(default = "ProcessorConfig::default_commit_width")]
    pub commit_width: usize,
    /// Decode buffer capacity per thread.
    #[serde(default = "ProcessorConfig::default_decode_buffer_capacity")]
    pub decode_buffer_capacity: usize,
    /// Reorder buffer capacity per thread.
    #[serde(default = "ProcessorConfig::default_reorder_buffer_capacity")]
    pub reorder_buffer_capacity: usize,
    /// Load/store queue capacity per thread.
    #[serde(default = "ProcessorConfig::default_load_store_queue_capacity")]
    pub load_store_queue_capacity: usize,
    /// Which threads may fetch in a cycle.
    #[serde(default)]
    pub fetch_policy: FetchPolicy,
}

impl ProcessorConfig {
    fn default_num_cores() -> usize {
        defaults::NUM_CORES
    }

    fn default_threads_per_core() -> usize {
        defaults::THREADS_PER_CORE
    }

    fn default_physical_register_file_capacity() -> usize {
        defaults::PHYSICAL_REGISTER_FILE_CAPACITY
    }

    fn default_decode_width() -> usize {
        defaults::DECODE_WIDTH
    }

    fn default_issue_width() -> usize {
        defaults::ISSUE_WIDTH
    }

    fn default_commit_width() -> usize {
        defaults::COMMIT_WIDTH
    }

    fn default_decode_buffer_capacity() -> usize {
        defaults::DECODE_BUFFER_CAPACITY
    }

    fn default_reorder_buffer_capacity() -> usize {
        defaults::REORDER_BUFFER_CAPACITY
    }

    fn default_load_store_queue_capacity() -> usize {
        defaults::LOAD_STORE_QUEUE_CAPACITY
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            num_cores: defaults::NUM_CORES,
            threads_per_core: defaults::THREADS_PER_CORE,
            physical_register_file_capacity: defaults::PHYSICAL_REGISTER_FILE_CAPACITY,
            decode_width: defaults::DECODE_WIDTH,
            issue_width: defaults::ISSUE_WIDTH,
            commit_width: defaults::COMMIT_WIDTH,
            decode_buffer_capacity: defaults::DECODE_BUFFER_CAPACITY,
            reorder_buffer_capacity: defaults::REORDER_BUFFER_CAPACITY,
            load_store_queue_capacity: defaults::LOAD_STORE_QUEUE_CAPACITY,
            fetch_policy: FetchPolicy::default(),
        }
    }
}

/// Functional unit quantities per core.
///
/// Operation and issue latencies are fixed per operation; only the number of
/// units of each type is configurable.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionalUnitConfig {
    /// Integer ALUs.
    #[serde(default = "FunctionalUnitConfig::default_integer_alu")]
    pub integer_alu: usize,
    /// Integer multiply/divide units.
    #[serde(default = "FunctionalUnitConfig::default_integer_multiply_divide")]
    pub integer_multiply_divide: usize,
    /// Floating-point adders.
    #[serde(default = "FunctionalUnitConfig::default_float_add")]
    pub float_add: usize,
    /// Floating-point multiply/divide units.
    #[serde(default = "FunctionalUnitConfig::default_float_multiply_divide")]
    pub float_multiply_divide: usize,
    /// Memory ports.
    #[serde(default = "FunctionalUnitConfig::default_memory_port")]
    pub memory_port: usize,
}

impl FunctionalUnitConfig {
    fn default_integer_alu() -> usize {
        defaults::INTEGER_ALU
    }

    fn default_integer_multiply_divide() -> usize {
        defaults::INTEGER_MULTIPLY_DIVIDE
    }

    fn default_float_add() -> usize {
        defaults::FLOAT_ADD
    }

    fn default_float_multiply_divide() -> usize {
        defaults::FLOAT_MULTIPLY_DIVIDE
    }

    fn default_memory_port() -> usize {
        defaults::MEMORY_PORT
    }
}

impl Default for FunctionalUnitConfig {
    fn default() -> Self {
        Self {
            integer_alu: defaults::INTEGER_ALU,
            integer_multiply_divide: defaults::INTEGER_MULTIPLY_DIVIDE,
            float_add: defaults::FLOAT_ADD,
            float_multiply_divide: defaults::FLOAT_MULTIPLY_DIVIDE,
            memory_port: defaults::MEMORY_PORT,
        }
    }
}

/// Branch predictor configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchPredictorConfig {
    /// Predictor algorithm.
    #[serde(default)]
    pub kind: BranchPredictorType,
    /// Bimodal counter table size (`TwoBit` only).
    #[serde(default = "BranchPredictorConfig::default_bimod_size")]
    pub bimod_size: usize,
    /// Branch target buffer sets.
    #[serde(default = "BranchPredictorConfig::default_btb_sets")]
    pub btb_sets: usize,
    /// Branch target buffer associativity.
    #[serde(default = "BranchPredictorConfig::default_btb_associativity")]
    pub btb_associativity: usize,
    /// Return address stack depth.
    #[serde(default = "BranchPredictorConfig::default_ras_size")]
    pub ras_size: usize,
}

impl BranchPredictorConfig {
    fn default_bimod_size() -> usize {
        defaults::BIMOD_SIZE
    }

    fn default_btb_sets() -> usize {
        defaults::BTB_SETS
    }

    fn default_btb_associativity() -> usize {
        defaults::BTB_ASSOCIATIVITY
    }

    fn default_ras_size() -> usize {
        defaults::RAS_SIZE
    }
}

impl Default for BranchPredictorConfig {
    fn default() -> Self {
        Self {
            kind: BranchPredictorType::default(),
            bimod_size: defaults::BIMOD_SIZE,
            btb_sets: defaults::BTB_SETS,
            btb_associativity: defaults::BTB_ASSOCIATIVITY,
            ras_size: defaults::RAS_SIZE,
        }
    }
}

/// Translation buffer configuration (used for both ITLB and DTLB).
#[derive(Debug, Clone, Deserialize)]
pub struct TlbConfig {
    /// Total entries.
    #[serde(default = "TlbConfig::default_num_entries")]
    pub num_entries: usize,
    /// Ways per set.
    #[serde(default = "TlbConfig::default_associativity")]
    pub associativity: usize,
    /// Translation granule in bytes.
    #[serde(default = "TlbConfig::default_page_size")]
    pub page_size: u64,
    /// Cycles to complete a hit.
    #[serde(default = "TlbConfig::default_hit_latency")]
    pub hit_latency: u64,
    /// Cycles to complete a miss.
    #[serde(default = "TlbConfig::default_miss_latency")]
    pub miss_latency: u64,
}

impl TlbConfig {
    fn default_num_entries() -> usize {
        defaults::TLB_ENTRIES
    }

    fn default_associativity() -> usize {
        defaults::TLB_ASSOCIATIVITY
    }

    fn default_page_size() -> u64 {
        defaults::PAGE_SIZE
    }

    fn default_hit_latency() -> u64 {
        defaults::TLB_HIT_LATENCY
    }

    fn default_miss_latency() -> u64 {
        defaults::TLB_MISS_LATENCY
    }
}

impl Default for TlbConfig {
    fn default() -> Self {
        Self {
            num_entries: defaults::TLB_ENTRIES,
            associativity: defaults::TLB_ASSOCIATIVITY,
            page_size: defaults::PAGE_SIZE,
            hit_latency: defaults::TLB_HIT_LATENCY,
            miss_latency: defaults::TLB_MISS_LATENCY,
        }
    }
}

/// L1 cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Total capacity in bytes.
    #[serde(default = "CacheConfig::default_size")]
    pub size: usize,
    /// Ways per set.
    #[serde(default = "CacheConfig::default_associativity")]
    pub associativity: usize,
    /// Line size in bytes.
    #[serde(default = "CacheConfig::default_line_size")]
    pub line_size: u64,
    /// Cycles to service a hit.
    #[serde(default = "CacheConfig::default_hit_latency")]
    pub hit_latency: u64,
    /// Extra cycles to service a miss.
    #[serde(default = "CacheConfig::default_miss_latency")]
    pub miss_latency: u64,
    /// Maximum distinct lines in flight.
    #[serde(default = "CacheConfig::default_mshrs")]
    pub mshrs: usize,
}

impl CacheConfig {
    fn default_size() -> usize {
        defaults::CACHE_SIZE
    }

    fn default_associativity() -> usize {
        defaults::CACHE_ASSOCIATIVITY
    }

    fn default_line_size() -> u64 {
        defaults::CACHE_LINE
    }

    fn default_hit_latency() -> u64 {
        defaults::CACHE_HIT_LATENCY
    }

    fn default_miss_latency() -> u64 {
        defaults::CACHE_MISS_LATENCY
    }

    fn default_mshrs() -> usize {
        defaults::CACHE_MSHRS
    }

    /// Number of sets implied by size, line size and associativity.
    pub const fn num_sets(&self) -> usize {
        let lines = self.size / self.line_size as usize;
        if self.associativity == 0 {
            0
        } else {
            lines / self.associativity
        }
    }

    fn validate(&self, name: &str) -> SimResult<()> {
        if !self.line_size.is_power_of_two() {
            return Err(SimError::InvalidConfig(format!("{name}.line_size must be a power of two")));
        }
        if self.associativity == 0 {
            return Err(SimError::InvalidConfig(format!("{name}.associativity must be non-zero")));
        }
        let sets = self.num_sets();
        if sets == 0 || !sets.is_power_of_two() {
            return Err(SimError::InvalidConfig(format!(
                "{name} must have a power-of-two number of sets (got {sets})"
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: defaults::CACHE_SIZE,
            associativity: defaults::CACHE_ASSOCIATIVITY,
            line_size: defaults::CACHE_LINE,
            hit_latency: defaults::CACHE_HIT_LATENCY,
            miss_latency: defaults::CACHE_MISS_LATENCY,
            mshrs: defaults::CACHE_MSHRS,
        }
    }
}

/// Simulation phase lengths and the commit watchdog.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Instructions to execute functionally before warming the caches.
    #[serde(default)]
    pub fast_forward_instructions: u64,
    /// Instructions to replay through the caches before measuring.
    #[serde(default)]
    pub warmup_instructions: u64,
    /// Upper bound on total simulated cycles, if any.
    #[serde(default)]
    pub max_cycles: Option<u64>,
    /// Cycles without a commit before the watchdog fires.
    #[serde(default = "SimulationConfig::default_commit_timeout_cycles")]
    pub commit_timeout_cycles: u64,
    /// Consecutive watchdog expirations, with no commit between them,
    /// tolerated before the run aborts.
    #[serde(default = "SimulationConfig::default_max_commit_timeouts")]
    pub max_commit_timeouts: u32,
}

impl SimulationConfig {
    fn default_commit_timeout_cycles() -> u64 {
        defaults::COMMIT_TIMEOUT_CYCLES
    }

    fn default_max_commit_timeouts() -> u32 {
        defaults::MAX_COMMIT_TIMEOUTS
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fast_forward_instructions: 0,
            warmup_instructions: 0,
            max_cycles: None,
            commit_timeout_cycles: defaults::COMMIT_TIMEOUT_CYCLES,
            max_commit_timeouts: defaults::MAX_COMMIT_TIMEOUTS,
        }
    }
}
