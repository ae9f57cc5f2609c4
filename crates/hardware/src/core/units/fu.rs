//! Functional unit pool.
//!
//! Every core owns one pool shared by its hardware threads. Units are grouped by
//! type; each type serves a fixed set of operations with an operation latency
//! (cycles until the result is available) and an issue latency (cycles until the
//! unit accepts another operation).
//!
//! | Unit type | Operations |
//! |---|---|
//! | `IntegerAlu` | IntAlu 2/1 |
//! | `IntegerMultiplyDivide` | IntMultiply 3/1, IntDivide 20/19 |
//! | `FloatAdd` | FloatAdd, FloatCompare, FloatConvert 4/1 |
//! | `FloatMultiplyDivide` | FloatMultiply 8/1, FloatDivide 40/20, FloatSqrt 80/40 |
//! | `MemoryPort` | ReadPort 1/1, WritePort 1/1 |
//!
//! Acquisition schedules two events: the unit's release after the issue latency
//! and the operation's completion after the operation latency. Releases carry
//! the generation of the acquisition they belong to, so a unit freed early by a
//! squash and re-acquired is never released by the stale event.

use serde::Serialize;

use crate::common::ids::EntryId;
use crate::config::FunctionalUnitConfig;
use crate::sim::event::{CycleContext, Event};

/// Kind of execution resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionalUnitType {
    /// Integer ALU.
    IntegerAlu,
    /// Integer multiplier/divider.
    IntegerMultiplyDivide,
    /// Floating-point adder.
    FloatAdd,
    /// Floating-point multiplier/divider.
    FloatMultiplyDivide,
    /// Data cache port.
    MemoryPort,
}

impl FunctionalUnitType {
    /// All unit types in pool order.
    pub const ALL: [Self; 5] = [
        Self::IntegerAlu,
        Self::IntegerMultiplyDivide,
        Self::FloatAdd,
        Self::FloatMultiplyDivide,
        Self::MemoryPort,
    ];

    /// Position in per-type arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::IntegerAlu => 0,
            Self::IntegerMultiplyDivide => 1,
            Self::FloatAdd => 2,
            Self::FloatMultiplyDivide => 3,
            Self::MemoryPort => 4,
        }
    }

    /// Name used in statistics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::IntegerAlu => "integer_alu",
            Self::IntegerMultiplyDivide => "integer_multiply_divide",
            Self::FloatAdd => "float_add",
            Self::FloatMultiplyDivide => "float_multiply_divide",
            Self::MemoryPort => "memory_port",
        }
    }

    const fn quantity(self, config: &FunctionalUnitConfig) -> usize {
        match self {
            Self::IntegerAlu => config.integer_alu,
            Self::IntegerMultiplyDivide => config.integer_multiply_divide,
            Self::FloatAdd => config.float_add,
            Self::FloatMultiplyDivide => config.float_multiply_divide,
            Self::MemoryPort => config.memory_port,
        }
    }
}

/// Operation an issued instruction performs on a functional unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum FunctionalUnitOperationType {
    /// Integer arithmetic and logic.
    IntAlu,
    /// Integer multiply.
    IntMultiply,
    /// Integer divide.
    IntDivide,
    /// Floating-point add/subtract.
    FloatAdd,
    /// Floating-point compare and sign operations.
    FloatCompare,
    /// Floating-point format conversion.
    FloatConvert,
    /// Floating-point multiply.
    FloatMultiply,
    /// Floating-point divide.
    FloatDivide,
    /// Floating-point square root.
    FloatSqrt,
    /// Data cache read.
    ReadPort,
    /// Data cache write.
    WritePort,
}

impl FunctionalUnitOperationType {
    /// All operations.
    pub const ALL: [Self; 11] = [
        Self::IntAlu,
        Self::IntMultiply,
        Self::IntDivide,
        Self::FloatAdd,
        Self::FloatCompare,
        Self::FloatConvert,
        Self::FloatMultiply,
        Self::FloatDivide,
        Self::FloatSqrt,
        Self::ReadPort,
        Self::WritePort,
    ];

    /// Position in per-operation arrays.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name used in statistics.
    pub const fn name(self) -> &'static str {
        match self {
            Self::IntAlu => "int_alu",
            Self::IntMultiply => "int_multiply",
            Self::IntDivide => "int_divide",
            Self::FloatAdd => "float_add",
            Self::FloatCompare => "float_compare",
            Self::FloatConvert => "float_convert",
            Self::FloatMultiply => "float_multiply",
            Self::FloatDivide => "float_divide",
            Self::FloatSqrt => "float_sqrt",
            Self::ReadPort => "read_port",
            Self::WritePort => "write_port",
        }
    }

    /// Unit type that executes this operation.
    pub const fn unit_type(self) -> FunctionalUnitType {
        match self {
            Self::IntAlu => FunctionalUnitType::IntegerAlu,
            Self::IntMultiply | Self::IntDivide => FunctionalUnitType::IntegerMultiplyDivide,
            Self::FloatAdd | Self::FloatCompare | Self::FloatConvert => FunctionalUnitType::FloatAdd,
            Self::FloatMultiply | Self::FloatDivide | Self::FloatSqrt => {
                FunctionalUnitType::FloatMultiplyDivide
            }
            Self::ReadPort | Self::WritePort => FunctionalUnitType::MemoryPort,
        }
    }

    /// `(operation latency, issue latency)` in cycles.
    pub const fn latencies(self) -> (u64, u64) {
        match self {
            Self::IntAlu => (2, 1),
            Self::IntMultiply => (3, 1),
            Self::IntDivide => (20, 19),
            Self::FloatAdd | Self::FloatCompare | Self::FloatConvert => (4, 1),
            Self::FloatMultiply => (8, 1),
            Self::FloatDivide => (40, 20),
            Self::FloatSqrt => (80, 40),
            Self::ReadPort | Self::WritePort => (1, 1),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct FunctionalUnit {
    owner: Option<usize>,
    generation: u64,
}

/// Stall and utilization counters of a pool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FunctionalUnitStats {
    /// Acquisitions denied, per operation.
    pub stalls: [u64; 11],
    /// Cycles in which every unit of a type was busy, per type.
    pub full_cycles: [u64; 5],
}

impl FunctionalUnitStats {
    /// Denied acquisitions of `op`.
    pub const fn stalls(&self, op: FunctionalUnitOperationType) -> u64 {
        self.stalls[op.index()]
    }

    /// Cycles with every unit of `unit` busy.
    pub const fn full_cycles(&self, unit: FunctionalUnitType) -> u64 {
        self.full_cycles[unit.index()]
    }
}

/// The functional units of one core.
#[derive(Clone, Debug)]
pub struct FunctionalUnitPool {
    core: usize,
    units: [Vec<FunctionalUnit>; 5],
    /// Stall and utilization counters.
    pub stats: FunctionalUnitStats,
}

impl FunctionalUnitPool {
    /// Creates the pool of core `core` with the configured quantities.
    pub fn new(core: usize, config: &FunctionalUnitConfig) -> Self {
        Self {
            core,
            units: FunctionalUnitType::ALL
                .map(|unit| vec![FunctionalUnit::default(); unit.quantity(config)]),
            stats: FunctionalUnitStats::default(),
        }
    }

    /// Tries to start `op` for `entry` of `thread`.
    ///
    /// # Returns
    ///
    /// `false` if every unit of the operation's type is busy; the denial is
    /// counted and nothing is scheduled.
    pub fn acquire(
        &mut self,
        entry: EntryId,
        thread: usize,
        op: FunctionalUnitOperationType,
        cx: &mut CycleContext<'_>,
    ) -> bool {
        let unit_type = op.unit_type();
        let Some((index, unit)) = self.units[unit_type.index()]
            .iter_mut()
            .enumerate()
            .find(|(_, unit)| unit.owner.is_none())
        else {
            self.stats.stalls[op.index()] += 1;
            return false;
        };

        unit.owner = Some(thread);
        unit.generation += 1;
        let generation = unit.generation;
        let (operation_latency, issue_latency) = op.latencies();
        cx.schedule_after(
            issue_latency,
            Event::FunctionalUnitReleased {
                core: self.core,
                unit: unit_type,
                index,
                generation,
            },
        );
        cx.schedule_after(
            operation_latency,
            Event::FunctionalUnitCompleted {
                core: self.core,
                entry,
            },
        );
        tracing::trace!(core = self.core, %entry, ?op, index, "functional unit acquired");
        true
    }

    /// Frees a unit if `generation` is still its current acquisition.
    pub fn release(&mut self, unit: FunctionalUnitType, index: usize, generation: u64) {
        if let Some(u) = self.units[unit.index()].get_mut(index) {
            if u.generation == generation {
                u.owner = None;
            }
        }
    }

    /// Frees every unit held by `thread`.
    pub fn release_all_for_thread(&mut self, thread: usize) {
        for unit in self.units.iter_mut().flatten() {
            if unit.owner == Some(thread) {
                unit.owner = None;
            }
        }
    }

    /// Number of busy units of `unit`.
    pub fn num_busy(&self, unit: FunctionalUnitType) -> usize {
        self.units[unit.index()]
            .iter()
            .filter(|u| u.owner.is_some())
            .count()
    }

    /// Returns true if every unit of `unit` is busy.
    pub fn is_full(&self, unit: FunctionalUnitType) -> bool {
        let units = &self.units[unit.index()];
        !units.is_empty() && units.iter().all(|u| u.owner.is_some())
    }

    /// Counts, per type, whether every unit was busy this cycle.
    pub fn update_per_cycle_stats(&mut self) {
        for unit in FunctionalUnitType::ALL {
            if self.is_full(unit) {
                self.stats.full_cycles[unit.index()] += 1;
            }
        }
    }
}
