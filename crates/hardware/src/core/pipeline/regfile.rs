//! Physical register files.
//!
//! A core owns one physical register file per dependency class, shared by all of
//! its hardware threads. Each register moves through a fixed lifecycle:
//! 1. **Reserve:** `Available → ArchitecturalRegister`, seeding a rename table.
//! 2. **Allocate:** `Available → RenameBufferNotValid`, at rename of a destination.
//! 3. **Writeback:** `RenameBufferNotValid → RenameBufferValid`, releasing dependents.
//! 4. **Commit:** `RenameBufferValid → ArchitecturalRegister`.
//! 5. **Reclaim / Recover:** Back to `Available` when superseded at commit or squashed.
//!
//! The free count plus the number of registers in every other state always
//! equals the file capacity. Any transition from the wrong state is fatal.

use std::fmt;

use crate::common::error::{SimError, SimResult};
use crate::common::ids::EntryId;
use crate::isa::instruction::RegisterDependencyType;

/// Names one physical register of one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicalRegisterId {
    /// File (register class) the register belongs to.
    pub kind: RegisterDependencyType,
    /// Index within the file.
    pub index: u16,
}

impl fmt::Display for PhysicalRegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:p{}", self.kind.name(), self.index)
    }
}

/// Lifecycle state of a physical register.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PhysicalRegisterState {
    /// Free for allocation.
    #[default]
    Available,
    /// Holds committed architectural state.
    ArchitecturalRegister,
    /// Allocated to an in-flight producer that has not written back.
    RenameBufferNotValid,
    /// Written back by an in-flight producer, not yet committed.
    RenameBufferValid,
}

impl PhysicalRegisterState {
    const fn slot(self) -> usize {
        match self {
            Self::Available => 0,
            Self::ArchitecturalRegister => 1,
            Self::RenameBufferNotValid => 2,
            Self::RenameBufferValid => 3,
        }
    }
}

/// Consumers waiting on a register's writeback.
///
/// Each list is delivered exactly once, at writeback, and then emptied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterDependents {
    /// Entries counting this register among their not-ready operands.
    pub generic: Vec<EntryId>,
    /// Effective-address computations whose base is this register.
    pub effective_address_computation: Vec<EntryId>,
    /// Load/store queue entries whose address base is this register.
    pub store_address: Vec<EntryId>,
}

impl RegisterDependents {
    /// Returns true if nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.generic.is_empty()
            && self.effective_address_computation.is_empty()
            && self.store_address.is_empty()
    }
}

/// Which dependents list a consumer joins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependentKind {
    /// Counted operand.
    Generic,
    /// Effective-address operand of a ROB entry.
    EffectiveAddressComputation,
    /// Address operand of a load/store queue entry.
    StoreAddress,
}

#[derive(Clone, Debug, Default)]
struct PhysicalRegister {
    state: PhysicalRegisterState,
    dependents: RegisterDependents,
}

/// One class of physical registers.
#[derive(Clone, Debug)]
pub struct PhysicalRegisterFile {
    kind: RegisterDependencyType,
    registers: Vec<PhysicalRegister>,
    counts: [usize; 4],
}

impl PhysicalRegisterFile {
    /// Creates a file of `capacity` available registers.
    pub fn new(kind: RegisterDependencyType, capacity: usize) -> Self {
        let mut counts = [0; 4];
        counts[PhysicalRegisterState::Available.slot()] = capacity;
        Self {
            kind,
            registers: vec![PhysicalRegister::default(); capacity],
            counts,
        }
    }

    /// Register class of this file.
    pub const fn kind(&self) -> RegisterDependencyType {
        self.kind
    }

    /// Total number of registers.
    pub fn capacity(&self) -> usize {
        self.registers.len()
    }

    /// Number of `Available` registers.
    pub const fn num_free(&self) -> usize {
        self.counts[0]
    }

    /// Returns true when no register can be allocated.
    pub const fn is_full(&self) -> bool {
        self.num_free() == 0
    }

    /// Number of registers currently in `state`.
    pub const fn count(&self, state: PhysicalRegisterState) -> usize {
        self.counts[state.slot()]
    }

    /// State of a register.
    pub fn state(&self, id: PhysicalRegisterId) -> PhysicalRegisterState {
        self.registers[usize::from(id.index)].state
    }

    /// Returns true once the register's value can be read.
    pub fn is_ready(&self, id: PhysicalRegisterId) -> bool {
        matches!(
            self.state(id),
            PhysicalRegisterState::RenameBufferValid | PhysicalRegisterState::ArchitecturalRegister
        )
    }

    /// Dependents currently waiting on a register.
    pub fn dependents(&self, id: PhysicalRegisterId) -> &RegisterDependents {
        &self.registers[usize::from(id.index)].dependents
    }

    /// Claims the first available register as architectural state.
    ///
    /// # Errors
    ///
    /// Returns `SimError::RegisterFileExhausted` if every register is in use.
    pub fn reserve(&mut self) -> SimResult<PhysicalRegisterId> {
        let id = self.first_available()?;
        self.transition(id, "reserve", &[PhysicalRegisterState::Available], PhysicalRegisterState::ArchitecturalRegister)?;
        Ok(id)
    }

    /// Claims the first available register for an in-flight producer.
    ///
    /// # Errors
    ///
    /// Returns `SimError::RegisterFileExhausted` if every register is in use.
    pub fn allocate(&mut self) -> SimResult<PhysicalRegisterId> {
        let id = self.first_available()?;
        self.transition(id, "allocate", &[PhysicalRegisterState::Available], PhysicalRegisterState::RenameBufferNotValid)?;
        self.registers[usize::from(id.index)].dependents = RegisterDependents::default();
        Ok(id)
    }

    /// Marks the producer's value as written and hands back everyone waiting on it.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalRegisterTransition` unless the register is
    /// `RenameBufferNotValid`.
    pub fn writeback(&mut self, id: PhysicalRegisterId) -> SimResult<RegisterDependents> {
        self.transition(id, "writeback", &[PhysicalRegisterState::RenameBufferNotValid], PhysicalRegisterState::RenameBufferValid)?;
        Ok(std::mem::take(&mut self.registers[usize::from(id.index)].dependents))
    }

    /// Promotes a written-back register to architectural state.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalRegisterTransition` unless the register is
    /// `RenameBufferValid`.
    pub fn commit(&mut self, id: PhysicalRegisterId) -> SimResult<()> {
        self.transition(id, "commit", &[PhysicalRegisterState::RenameBufferValid], PhysicalRegisterState::ArchitecturalRegister)
    }

    /// Frees a register allocated to a squashed producer.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalRegisterTransition` unless the register is in a
    /// rename-buffer state.
    pub fn recover(&mut self, id: PhysicalRegisterId) -> SimResult<()> {
        self.transition(
            id,
            "recover",
            &[PhysicalRegisterState::RenameBufferNotValid, PhysicalRegisterState::RenameBufferValid],
            PhysicalRegisterState::Available,
        )?;
        self.registers[usize::from(id.index)].dependents = RegisterDependents::default();
        Ok(())
    }

    /// Frees an architectural register superseded by a committed producer.
    ///
    /// # Errors
    ///
    /// Returns `SimError::IllegalRegisterTransition` unless the register is
    /// `ArchitecturalRegister`.
    pub fn reclaim(&mut self, id: PhysicalRegisterId) -> SimResult<()> {
        self.transition(id, "reclaim", &[PhysicalRegisterState::ArchitecturalRegister], PhysicalRegisterState::Available)
    }

    /// Registers `entry` to be notified when `id` is written back.
    pub fn add_dependent(&mut self, id: PhysicalRegisterId, kind: DependentKind, entry: EntryId) {
        let dependents = &mut self.registers[usize::from(id.index)].dependents;
        match kind {
            DependentKind::Generic => dependents.generic.push(entry),
            DependentKind::EffectiveAddressComputation => {
                dependents.effective_address_computation.push(entry);
            }
            DependentKind::StoreAddress => dependents.store_address.push(entry),
        }
    }

    fn first_available(&self) -> SimResult<PhysicalRegisterId> {
        self.registers
            .iter()
            .position(|r| r.state == PhysicalRegisterState::Available)
            .map(|index| PhysicalRegisterId {
                kind: self.kind,
                index: index as u16,
            })
            .ok_or(SimError::RegisterFileExhausted(self.kind.name()))
    }

    fn transition(
        &mut self,
        id: PhysicalRegisterId,
        operation: &'static str,
        from: &[PhysicalRegisterState],
        to: PhysicalRegisterState,
    ) -> SimResult<()> {
        let register = &mut self.registers[usize::from(id.index)];
        if !from.contains(&register.state) {
            return Err(SimError::IllegalRegisterTransition {
                register: id,
                operation,
                state: register.state,
            });
        }
        self.counts[register.state.slot()] -= 1;
        self.counts[to.slot()] += 1;
        register.state = to;
        Ok(())
    }
}

/// The three per-class files of one core.
#[derive(Clone, Debug)]
pub struct RegisterFiles {
    files: [PhysicalRegisterFile; 3],
}

impl RegisterFiles {
    /// Creates integer, floating-point and misc files of equal capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            files: RegisterDependencyType::ALL.map(|kind| PhysicalRegisterFile::new(kind, capacity)),
        }
    }

    /// File holding registers of `kind`.
    pub const fn file(&self, kind: RegisterDependencyType) -> &PhysicalRegisterFile {
        &self.files[kind.index()]
    }

    /// Mutable file holding registers of `kind`.
    pub const fn file_mut(&mut self, kind: RegisterDependencyType) -> &mut PhysicalRegisterFile {
        &mut self.files[kind.index()]
    }

    /// Returns true once the register's value can be read.
    pub fn is_ready(&self, id: PhysicalRegisterId) -> bool {
        self.file(id.kind).is_ready(id)
    }

    /// Iterates over all three files.
    pub fn iter(&self) -> impl Iterator<Item = &PhysicalRegisterFile> {
        self.files.iter()
    }
}
