//! Load/store queue refresh.
//!
//! Decides which loads may issue. The LSQ of each thread is walked in program
//! order; a load becomes ready only when no older store could still write its
//! address:
//! 1. A store whose address is unknown ends the walk.
//! 2. A store with a known address but unready data blocks loads to that
//!    address.
//! 3. A ready store unblocks its address again.

use std::collections::HashSet;

use crate::core::cpu::Core;

/// Refreshes the LSQ of every thread.
pub fn refresh_stage(core: &mut Core) {
    for thread in 0..core.threads.len() {
        refresh_load_store_queue(core, thread);
    }
}

/// Moves the loads of `thread` that can no longer alias an older store into
/// the ready load queue.
pub fn refresh_load_store_queue(core: &mut Core, thread: usize) {
    let mut unknown_data_addresses = HashSet::new();
    let mut ready = Vec::new();

    for &id in core.threads[thread].load_store_queue.iter() {
        let Some(entry) = core.entries.get(id) else {
            continue;
        };
        let Some(address) = entry.effective_address() else {
            continue;
        };
        if entry.is_store() {
            if !entry.is_store_address_ready() {
                break;
            }
            if entry.is_all_operand_ready() {
                let _ = unknown_data_addresses.remove(&address);
            } else {
                let _ = unknown_data_addresses.insert(address);
            }
        } else if entry.dispatched
            && !entry.issued
            && !entry.completed
            && entry.is_all_operand_ready()
            && !unknown_data_addresses.contains(&address)
            && !core.queues.ready_loads.contains(&id)
        {
            ready.push(id);
        }
    }

    core.queues.ready_loads.extend(ready);
}
