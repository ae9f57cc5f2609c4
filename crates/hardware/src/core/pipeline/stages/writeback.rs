//! Writeback Stage.
//!
//! Entries that signaled completion since the last cycle are marked completed
//! and their destination registers become valid. Each register delivers its
//! dependents exactly once, in this order:
//! 1. **Effective-address computations:** Their base-operand flag is set.
//! 2. **Store-address consumers:** The LSQ entry's address becomes known.
//! 3. **Generic consumers:** One outstanding operand is retired.
//!
//! An effective-address computation writes no register; its completion makes
//! the paired LSQ entry's address known instead.

use crate::common::error::SimResult;
use crate::common::ids::EntryId;
use crate::core::cpu::Core;

/// Processes every entry that signaled completion.
///
/// # Errors
///
/// Propagates register transition and operand accounting violations.
pub fn writeback_stage(core: &mut Core) -> SimResult<()> {
    let completed = std::mem::take(&mut core.queues.completed);
    for id in completed {
        let Some(entry) = core.entries.get_mut(id) else {
            continue;
        };
        if entry.squashed {
            continue;
        }
        entry.completed = true;
        core.complete_entry(id)?;
    }
    Ok(())
}

impl Core {
    /// Queues `id` for writeback, unless it has been squashed or retired.
    pub fn signal_completed(&mut self, id: EntryId) {
        if self.entries.is_live(id) && !self.queues.completed.contains(&id) {
            self.queues.completed.push(id);
        }
    }

    /// Applies the writeback policy of a completed entry.
    ///
    /// # Errors
    ///
    /// Propagates register transition and operand accounting violations.
    pub fn complete_entry(&mut self, id: EntryId) -> SimResult<()> {
        let entry = self.entries.expect(id)?;
        if entry.needs_writeback() {
            let targets: Vec<_> = entry.target_physical_registers.values().copied().collect();
            for physical in targets {
                let dependents = self.register_files.file_mut(physical.kind).writeback(physical)?;
                for dependent in dependents.effective_address_computation {
                    if let Some(e) = self.entries.get_mut(dependent).filter(|e| !e.squashed) {
                        e.set_address_operand_ready();
                    }
                }
                for dependent in dependents.store_address {
                    if let Some(e) = self.entries.get_mut(dependent).filter(|e| !e.squashed) {
                        e.set_store_address_ready();
                    }
                }
                for dependent in dependents.generic {
                    if let Some(e) = self.entries.get_mut(dependent).filter(|e| !e.squashed) {
                        let _ = e.notify_operand_ready()?;
                    }
                }
            }
            tracing::trace!(entry = %id, "written back");
        } else if let Some(lsq) = entry.load_store_entry() {
            if let Some(e) = self.entries.get_mut(lsq) {
                e.set_store_address_ready();
            }
            tracing::trace!(entry = %id, %lsq, "address computed");
        }
        Ok(())
    }
}
