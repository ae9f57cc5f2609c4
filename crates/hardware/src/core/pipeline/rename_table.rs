//! Register rename table.
//!
//! Maps every architectural register of one thread to the physical register
//! that currently holds (or will hold) its newest value. The table is total:
//! it is seeded at thread creation by reserving one physical register per
//! architectural register, and afterwards only ever rebound.

use std::collections::BTreeMap;

use crate::common::error::SimResult;
use crate::core::pipeline::regfile::{PhysicalRegisterId, RegisterFiles};
use crate::isa::instruction::{RegisterDependency, RegisterDependencyType};

/// Architectural-to-physical mapping of one thread.
#[derive(Clone, Debug)]
pub struct RenameTable {
    mappings: BTreeMap<RegisterDependency, PhysicalRegisterId>,
}

impl RenameTable {
    /// Reserves one physical register per architectural register of every class.
    ///
    /// # Errors
    ///
    /// Propagates exhaustion of a register file; configuration validation
    /// guarantees enough capacity for every thread of a core.
    pub fn seeded(files: &mut RegisterFiles) -> SimResult<Self> {
        let mut mappings = BTreeMap::new();
        for kind in RegisterDependencyType::ALL {
            for index in 0..kind.num_architectural_registers() {
                let dep = RegisterDependency {
                    kind,
                    index: index as u8,
                };
                let physical = files.file_mut(kind).reserve()?;
                let _ = mappings.insert(dep, physical);
            }
        }
        Ok(Self { mappings })
    }

    /// Current physical register of `dep`.
    ///
    /// The table is total, so every valid dependency resolves.
    pub fn get(&self, dep: RegisterDependency) -> Option<PhysicalRegisterId> {
        self.mappings.get(&dep).copied()
    }

    /// Rebinds `dep`, returning the previous mapping.
    pub fn set(&mut self, dep: RegisterDependency, physical: PhysicalRegisterId) -> Option<PhysicalRegisterId> {
        self.mappings.insert(dep, physical)
    }

    /// Number of architectural registers mapped.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Iterates over all mappings in architectural order.
    pub fn iter(&self) -> impl Iterator<Item = (&RegisterDependency, &PhysicalRegisterId)> {
        self.mappings.iter()
    }
}
