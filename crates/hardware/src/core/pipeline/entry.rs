//! Pipeline entry records.
//!
//! An instruction travels through three records:
//! 1. **Decode buffer entry:** Created by fetch with the prediction made for it.
//! 2. **Reorder buffer entry:** Created at rename with its register maps. For loads
//!    and stores it is the effective-address computation, readied by a one-shot
//!    flag on its base register instead of the operand counter.
//! 3. **Load/store queue entry:** Created at dispatch for loads and stores; it
//!    owns the memory access and its own store-address-ready flag.
//!
//! ROB and LSQ entries share one [`PipelineEntry`] type whose [`EntryKind`]
//! selects the readiness predicate and writeback policy. All live entries of a
//! core sit in an [`EntryTable`]; queues refer to them by [`EntryId`]. Squashed
//! and retired entries leave the table, which makes every later callback for
//! them a no-op.

use std::collections::{BTreeMap, HashMap};

use crate::common::error::{SimError, SimResult};
use crate::common::ids::EntryId;
use crate::core::pipeline::regfile::PhysicalRegisterId;
use crate::core::units::bru::BranchPredictorUpdate;
use crate::isa::instruction::{DynamicInstruction, RegisterDependency};

/// Register map keyed by architectural dependency.
pub type RegisterMap = BTreeMap<RegisterDependency, PhysicalRegisterId>;

/// An instruction waiting in the decode buffer.
#[derive(Clone, Debug)]
pub struct DecodeBufferEntry {
    /// The fetched instruction.
    pub instruction: DynamicInstruction,
    /// Address actually executed after this instruction.
    pub npc: u64,
    /// Address after `npc`, as reported by the context.
    pub nnpc: u64,
    /// Address fetch continued at after this instruction.
    pub predicted_npc: u64,
    /// Return address stack top before this instruction's prediction.
    pub return_address_stack_recover_index: usize,
    /// Opaque predictor state handed back at commit.
    pub branch_predictor_update: BranchPredictorUpdate,
    /// Fetched down a predicted wrong path.
    pub speculative: bool,
}

/// Effective-address computation state of a load or store ROB entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddressComputation {
    /// One-shot flag: the base register has been written.
    pub operand_ready: bool,
    /// Paired LSQ entry, once dispatched.
    pub load_store: Option<EntryId>,
}

/// Variant-specific state of a pipeline entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Reorder buffer entry.
    Reorder {
        /// Present for loads and stores.
        address_computation: Option<AddressComputation>,
    },
    /// Load/store queue entry.
    LoadStore {
        /// Owning ROB entry.
        reorder: EntryId,
        /// Virtual effective address.
        effective_address: u64,
        /// True for stores.
        store: bool,
        /// One-shot flag: the address is known.
        store_address_ready: bool,
    },
}

/// A ROB or LSQ entry.
#[derive(Clone, Debug)]
pub struct PipelineEntry {
    /// Monotonic id.
    pub id: EntryId,
    /// Global id of the owning thread.
    pub thread: usize,
    /// The instruction.
    pub instruction: DynamicInstruction,
    /// Address actually executed after this instruction.
    pub npc: u64,
    /// Address after `npc`.
    pub nnpc: u64,
    /// Predicted successor.
    pub predicted_npc: u64,
    /// Fetched down a predicted wrong path.
    pub speculative: bool,
    /// Return address stack top before prediction.
    pub return_address_stack_recover_index: usize,
    /// Opaque predictor state.
    pub branch_predictor_update: BranchPredictorUpdate,
    /// Registers superseded by this instruction's destinations.
    pub old_physical_registers: RegisterMap,
    /// Registers allocated to this instruction's destinations.
    pub target_physical_registers: RegisterMap,
    /// Registers read by this instruction.
    pub source_physical_registers: RegisterMap,
    /// Source registers not yet written back.
    pub num_not_ready_operands: usize,
    /// Placed in an issue queue.
    pub dispatched: bool,
    /// Sent to a functional unit or the memory hierarchy.
    pub issued: bool,
    /// Result available.
    pub completed: bool,
    /// Removed by a squash.
    pub squashed: bool,
    /// Variant-specific state.
    pub kind: EntryKind,
}

impl PipelineEntry {
    /// Creates the ROB entry for a renamed decode buffer entry.
    ///
    /// Register maps are filled in by the caller.
    pub fn reorder(id: EntryId, decoded: DecodeBufferEntry) -> Self {
        let address_computation = decoded
            .instruction
            .mnemonic()
            .is_memory()
            .then(AddressComputation::default);
        Self {
            id,
            thread: decoded.instruction.thread,
            instruction: decoded.instruction,
            npc: decoded.npc,
            nnpc: decoded.nnpc,
            predicted_npc: decoded.predicted_npc,
            speculative: decoded.speculative,
            return_address_stack_recover_index: decoded.return_address_stack_recover_index,
            branch_predictor_update: decoded.branch_predictor_update,
            old_physical_registers: RegisterMap::new(),
            target_physical_registers: RegisterMap::new(),
            source_physical_registers: RegisterMap::new(),
            num_not_ready_operands: 0,
            dispatched: false,
            issued: false,
            completed: false,
            squashed: false,
            kind: EntryKind::Reorder { address_computation },
        }
    }

    /// Creates the LSQ entry paired with a load or store ROB entry.
    ///
    /// The LSQ entry shares the ROB entry's source and target maps; it is the one
    /// that writes the loaded value back.
    ///
    /// # Errors
    ///
    /// Returns `SimError::MissingEffectiveAddress` if the instruction carries none.
    pub fn load_store(id: EntryId, rob: &Self) -> SimResult<Self> {
        let effective_address = rob
            .instruction
            .effective_address
            .ok_or(SimError::MissingEffectiveAddress(rob.instruction.pc))?;
        let store = matches!(
            rob.instruction.static_instruction.kind(),
            crate::isa::StaticInstructionType::Store
        );
        Ok(Self {
            id,
            thread: rob.thread,
            instruction: rob.instruction.clone(),
            npc: rob.npc,
            nnpc: rob.nnpc,
            predicted_npc: rob.predicted_npc,
            speculative: rob.speculative,
            return_address_stack_recover_index: rob.return_address_stack_recover_index,
            branch_predictor_update: rob.branch_predictor_update,
            old_physical_registers: RegisterMap::new(),
            target_physical_registers: rob.target_physical_registers.clone(),
            source_physical_registers: rob.source_physical_registers.clone(),
            num_not_ready_operands: 0,
            dispatched: false,
            issued: false,
            completed: false,
            squashed: false,
            kind: EntryKind::LoadStore {
                reorder: rob.id,
                effective_address,
                store,
                store_address_ready: false,
            },
        })
    }

    /// Readiness predicate used by wakeup and dispatch.
    ///
    /// Effective-address computations wait only on their base register flag;
    /// everything else waits for the operand counter to reach zero.
    pub const fn is_all_operand_ready(&self) -> bool {
        match self.kind {
            EntryKind::Reorder {
                address_computation: Some(ac),
            } => ac.operand_ready,
            _ => self.num_not_ready_operands == 0,
        }
    }

    /// Returns true if completion writes destination registers back.
    ///
    /// An effective-address computation produces an address, not a register
    /// value; its LSQ entry does the writeback.
    pub const fn needs_writeback(&self) -> bool {
        !matches!(
            self.kind,
            EntryKind::Reorder {
                address_computation: Some(_)
            }
        )
    }

    /// Returns true for the ROB entry of a load or store.
    pub const fn is_effective_address_computation(&self) -> bool {
        matches!(
            self.kind,
            EntryKind::Reorder {
                address_computation: Some(_)
            }
        )
    }

    /// Paired LSQ entry of an effective-address computation.
    pub const fn load_store_entry(&self) -> Option<EntryId> {
        match self.kind {
            EntryKind::Reorder {
                address_computation: Some(ac),
            } => ac.load_store,
            _ => None,
        }
    }

    /// Effective address of an LSQ entry.
    pub const fn effective_address(&self) -> Option<u64> {
        match self.kind {
            EntryKind::LoadStore {
                effective_address, ..
            } => Some(effective_address),
            EntryKind::Reorder { .. } => None,
        }
    }

    /// Returns true for an LSQ store.
    pub const fn is_store(&self) -> bool {
        matches!(self.kind, EntryKind::LoadStore { store: true, .. })
    }

    /// Returns true for an LSQ load.
    pub const fn is_load(&self) -> bool {
        matches!(self.kind, EntryKind::LoadStore { store: false, .. })
    }

    /// Returns true once an LSQ entry's address is known.
    pub const fn is_store_address_ready(&self) -> bool {
        matches!(
            self.kind,
            EntryKind::LoadStore {
                store_address_ready: true,
                ..
            }
        )
    }

    /// Sets the store-address-ready flag of an LSQ entry.
    pub const fn set_store_address_ready(&mut self) {
        if let EntryKind::LoadStore {
            store_address_ready,
            ..
        } = &mut self.kind
        {
            *store_address_ready = true;
        }
    }

    /// Sets the base-operand flag of an effective-address computation.
    pub const fn set_address_operand_ready(&mut self) {
        if let EntryKind::Reorder {
            address_computation: Some(ac),
        } = &mut self.kind
        {
            ac.operand_ready = true;
        }
    }

    /// Links an effective-address computation to its LSQ entry.
    pub const fn link_load_store(&mut self, lsq: EntryId) {
        if let EntryKind::Reorder {
            address_computation: Some(ac),
        } = &mut self.kind
        {
            ac.load_store = Some(lsq);
        }
    }

    /// Delivers one operand writeback.
    ///
    /// # Returns
    ///
    /// `true` if this notification made the counter reach zero.
    ///
    /// # Errors
    ///
    /// `SimError::NotReadyUnderflow` if nothing was outstanding, and
    /// `SimError::AddressOperandNotReady` if an effective-address computation
    /// runs out of operands before its base register was flagged.
    pub fn notify_operand_ready(&mut self) -> SimResult<bool> {
        if self.num_not_ready_operands == 0 {
            return Err(SimError::NotReadyUnderflow(self.id));
        }
        self.num_not_ready_operands -= 1;
        if self.num_not_ready_operands == 0 {
            if let EntryKind::Reorder {
                address_computation: Some(ac),
            } = self.kind
            {
                if !ac.operand_ready {
                    return Err(SimError::AddressOperandNotReady(self.id));
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Marks the entry squashed.
    ///
    /// # Returns
    ///
    /// `false` if it already was; the flag is only ever set once.
    pub const fn mark_squashed(&mut self) -> bool {
        if self.squashed {
            false
        } else {
            self.squashed = true;
            true
        }
    }
}

/// Arena of the live entries of one core.
#[derive(Clone, Debug, Default)]
pub struct EntryTable {
    entries: HashMap<EntryId, PipelineEntry>,
}

impl EntryTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    pub fn insert(&mut self, entry: PipelineEntry) {
        let _ = self.entries.insert(entry.id, entry);
    }

    /// Live entry with `id`, if any.
    pub fn get(&self, id: EntryId) -> Option<&PipelineEntry> {
        self.entries.get(&id)
    }

    /// Mutable live entry with `id`, if any.
    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut PipelineEntry> {
        self.entries.get_mut(&id)
    }

    /// Live entry with `id`, which the caller knows must exist.
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownEntry` if it does not.
    pub fn expect(&self, id: EntryId) -> SimResult<&PipelineEntry> {
        self.entries.get(&id).ok_or(SimError::UnknownEntry(id))
    }

    /// Mutable variant of [`EntryTable::expect`].
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownEntry` if the entry does not exist.
    pub fn expect_mut(&mut self, id: EntryId) -> SimResult<&mut PipelineEntry> {
        self.entries.get_mut(&id).ok_or(SimError::UnknownEntry(id))
    }

    /// Removes an entry from the table.
    pub fn remove(&mut self, id: EntryId) -> Option<PipelineEntry> {
        self.entries.remove(&id)
    }

    /// Returns true if `id` is live and not squashed.
    pub fn is_live(&self, id: EntryId) -> bool {
        self.entries.get(&id).is_some_and(|e| !e.squashed)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
