//! Register Rename Stage.
//!
//! Rename moves the oldest decode buffer entry of a thread into its reorder
//! buffer. It performs the following steps per instruction:
//! 1. **Admission:** Every register class must have enough free registers for
//!    all destinations, or nothing is allocated.
//! 2. **Sources:** Each source resolves through the rename table before any
//!    destination is rebound.
//! 3. **Destinations:** Each destination gets a fresh register; the superseded
//!    one is recorded for reclamation at commit or restoration at squash.
//! 4. **Dependents:** The entry joins the dependents list of every source not
//!    yet written back, once per distinct register.

use std::collections::BTreeSet;

use crate::common::error::{SimError, SimResult};
use crate::core::cpu::Core;
use crate::core::pipeline::entry::PipelineEntry;
use crate::core::pipeline::regfile::DependentKind;
use crate::isa::{RegisterDependencyType, StaticInstructionType};
use crate::sim::event::CycleContext;

/// Renames up to the decode width across threads, round-robin.
///
/// # Errors
///
/// Propagates any fatal error from renaming a single instruction.
pub fn rename_stage(core: &mut Core, cx: &mut CycleContext<'_>) -> SimResult<()> {
    let Some(mut scheduler) = core.rename_scheduler.take() else {
        return Ok(());
    };
    let num_threads = core.threads.len();
    let width = core.processor.decode_width;
    let result = scheduler.consume(num_threads, width, &mut |thread| {
        if !can_register_rename(core, thread) {
            return Ok(false);
        }
        register_rename_one(core, thread, cx)
    });
    core.rename_scheduler = Some(scheduler);
    result.map(|_| ())
}

/// Checks whether `thread` has something to rename and room to put it.
///
/// An empty decode buffer and a full ROB are counted as stalls; a thread
/// without a context is skipped silently.
pub fn can_register_rename(core: &mut Core, thread: usize) -> bool {
    let t = &mut core.threads[thread];
    if t.context.is_none() {
        return false;
    }
    if t.decode_buffer.is_empty() {
        t.stats.rename_stalls_decode_buffer_empty += 1;
        return false;
    }
    if t.reorder_buffer.is_full() {
        t.stats.rename_stalls_reorder_buffer_full += 1;
        return false;
    }
    true
}

/// Renames the oldest decode buffer entry of `thread`.
///
/// # Returns
///
/// `false` if a register class lacks free registers; the stall is counted
/// against that class and the decode buffer is left untouched.
///
/// # Errors
///
/// Returns `SimError::UnrecognizedMnemonic` for an unknown mnemonic,
/// `SimError::UnmappedRegister` for a source outside the rename table, and
/// propagates register file and buffer invariant violations.
pub fn register_rename_one(core: &mut Core, thread: usize, cx: &mut CycleContext<'_>) -> SimResult<bool> {
    let t = &mut core.threads[thread];
    let Some(decoded) = t.decode_buffer.front().cloned() else {
        return Ok(false);
    };
    let static_instruction = &decoded.instruction.static_instruction;
    if static_instruction.kind() == StaticInstructionType::Unknown {
        return Err(SimError::UnrecognizedMnemonic {
            mnemonic: static_instruction.mnemonic,
            pc: decoded.instruction.pc,
        });
    }

    let needed = static_instruction.num_free_physical_registers_to_allocate();
    for kind in RegisterDependencyType::ALL {
        if core.register_files.file(kind).num_free() < needed[kind.index()] {
            t.stats.rename_stalls_register_file_full[kind.index()] += 1;
            return Ok(false);
        }
    }

    let static_instruction = std::sync::Arc::clone(static_instruction);
    let id = cx.ids.next_entry_id();
    let mut entry = PipelineEntry::reorder(id, decoded);

    for &dep in &static_instruction.input_dependencies {
        let physical = t.rename_table.get(dep).ok_or(SimError::UnmappedRegister(dep))?;
        let _ = entry.source_physical_registers.insert(dep, physical);
    }

    let outputs: BTreeSet<_> = static_instruction.renamed_outputs().collect();
    for dep in outputs {
        let physical = core.register_files.file_mut(dep.kind).allocate()?;
        if let Some(old) = t.rename_table.set(dep, physical) {
            let _ = entry.old_physical_registers.insert(dep, old);
        }
        let _ = entry.target_physical_registers.insert(dep, physical);
    }

    let sources: BTreeSet<_> = entry.source_physical_registers.values().copied().collect();
    for physical in sources {
        if !core.register_files.is_ready(physical) {
            entry.num_not_ready_operands += 1;
            core.register_files
                .file_mut(physical.kind)
                .add_dependent(physical, DependentKind::Generic, id);
        }
    }

    if entry.is_effective_address_computation() {
        let base = static_instruction
            .base_address_register()
            .and_then(|dep| entry.source_physical_registers.get(&dep).copied());
        match base {
            Some(physical) if !core.register_files.is_ready(physical) => {
                core.register_files.file_mut(physical.kind).add_dependent(
                    physical,
                    DependentKind::EffectiveAddressComputation,
                    id,
                );
            }
            _ => entry.set_address_operand_ready(),
        }
    }

    t.reorder_buffer
        .push(id)
        .map_err(|_| SimError::BufferOverflow("reorder buffer"))?;
    let _ = t.decode_buffer.pop_front();
    tracing::trace!(
        thread = t.id,
        entry = %id,
        instruction = %entry.instruction.id,
        not_ready = entry.num_not_ready_operands,
        "renamed"
    );
    core.entries.insert(entry);
    Ok(true)
}
