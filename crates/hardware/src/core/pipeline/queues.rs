//! Issue and completion queues of a core.
//!
//! All hardware threads of a core share these queues; each holds entry ids in
//! insertion order:
//! 1. **Instruction queues:** Waiting and ready ROB entries (computation and
//!    effective-address computation).
//! 2. **Load queue:** Ready loads, filled by the LSQ refresh.
//! 3. **Store queues:** Waiting and ready stores.
//! 4. **Completion queue:** Entries that signaled completion since the last
//!    writeback.

use crate::common::ids::EntryId;
use crate::core::pipeline::entry::EntryTable;

/// The shared queues of one core.
#[derive(Clone, Debug, Default)]
pub struct IssueQueues {
    /// Dispatched ROB entries with operands outstanding.
    pub waiting_instructions: Vec<EntryId>,
    /// ROB entries ready to issue.
    pub ready_instructions: Vec<EntryId>,
    /// Loads ready to issue.
    pub ready_loads: Vec<EntryId>,
    /// Stores with operands outstanding.
    pub waiting_stores: Vec<EntryId>,
    /// Stores ready to issue.
    pub ready_stores: Vec<EntryId>,
    /// Entries completed since the last writeback.
    pub completed: Vec<EntryId>,
}

impl IssueQueues {
    /// Creates empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes `id` from every queue.
    pub fn remove_from_queues(&mut self, id: EntryId) {
        for queue in [
            &mut self.waiting_instructions,
            &mut self.ready_instructions,
            &mut self.ready_loads,
            &mut self.waiting_stores,
            &mut self.ready_stores,
            &mut self.completed,
        ] {
            queue.retain(|&e| e != id);
        }
    }

    /// Moves every waiting entry whose readiness predicate holds to its ready
    /// queue.
    ///
    /// Readiness is sampled once for the whole queue before anything moves, so
    /// no entry is judged twice within a cycle. Entries no longer in the table
    /// are dropped.
    pub fn wakeup(&mut self, entries: &EntryTable) {
        Self::wakeup_queue(&mut self.waiting_instructions, &mut self.ready_instructions, entries);
        Self::wakeup_queue(&mut self.waiting_stores, &mut self.ready_stores, entries);
    }

    fn wakeup_queue(waiting: &mut Vec<EntryId>, ready: &mut Vec<EntryId>, entries: &EntryTable) {
        let snapshot: Vec<bool> = waiting
            .iter()
            .map(|&id| entries.get(id).is_some_and(|e| e.is_all_operand_ready()))
            .collect();
        let mut still_waiting = Vec::with_capacity(waiting.len());
        for (id, is_ready) in waiting.drain(..).zip(snapshot) {
            if is_ready {
                ready.push(id);
            } else if entries.is_live(id) {
                still_waiting.push(id);
            }
        }
        *waiting = still_waiting;
    }

    /// Total entries across the issue queues, excluding the completion queue.
    pub fn num_queued(&self) -> usize {
        self.waiting_instructions.len()
            + self.ready_instructions.len()
            + self.ready_loads.len()
            + self.waiting_stores.len()
            + self.ready_stores.len()
    }
}
