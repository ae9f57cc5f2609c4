//! Memory access coordination.
//!
//! Fetch, load and store all enter the memory hierarchy through one primitive
//! with the following protocol:
//! 1. **Translation:** The thread's context maps the virtual address; the target
//!    cache derives the line tag.
//! 2. **Aliasing:** If the cache already has an access in flight for the tag, the
//!    request joins it and starts no transaction of its own.
//! 3. **Transaction:** Otherwise a TLB lookup and a cache transaction start
//!    together, each scheduling an event after its latency.
//! 4. **Join:** The access resolves once both events have fired, in whichever
//!    order, and every waiter folded into it is notified exactly once.
//!
//! Waiters name what to do on resolution instead of capturing callbacks, so a
//! waiter whose entry has been squashed meanwhile resolves to nothing.

use std::collections::HashMap;

use crate::common::error::{SimError, SimResult};
use crate::common::ids::{AccessId, EntryId};
use crate::core::cpu::Core;
use crate::core::units::cache::{AccessKind, MemoryAccess};
use crate::sim::event::{CacheLevel, CycleContext, Event};

/// Who is notified when an access resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessWaiter {
    /// Instruction fetch of a thread (core-local index); clears its fetch stall.
    Fetch {
        /// Thread index within the core.
        thread: usize,
    },
    /// A load queue entry; signals its completion.
    Load {
        /// The LSQ entry.
        entry: EntryId,
    },
    /// A store queue entry; stores complete at issue, so nothing happens.
    Store {
        /// The LSQ entry.
        entry: EntryId,
    },
    /// A cache warmup access; nothing happens.
    Warmup,
}

#[derive(Clone, Debug)]
struct PendingAccess {
    access: MemoryAccess,
    remaining: u8,
    waiters: Vec<AccessWaiter>,
}

/// Join counters of the accesses in flight on one core.
#[derive(Clone, Debug, Default)]
pub struct MemoryAccessCoordinator {
    pending: HashMap<AccessId, PendingAccess>,
    aliased_accesses: u64,
}

impl MemoryAccessCoordinator {
    /// Creates a coordinator with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a new access whose translation and cache transaction have both
    /// been started.
    pub fn begin(&mut self, access: MemoryAccess, waiter: AccessWaiter) {
        let _ = self.pending.insert(
            access.id,
            PendingAccess {
                access,
                remaining: 2,
                waiters: vec![waiter],
            },
        );
    }

    /// Folds `waiter` into the in-flight access `primary`.
    ///
    /// # Returns
    ///
    /// `false` if `primary` is not in flight; the caller must start its own
    /// transaction.
    pub fn alias(&mut self, primary: AccessId, waiter: AccessWaiter) -> bool {
        match self.pending.get_mut(&primary) {
            Some(pending) => {
                pending.waiters.push(waiter);
                self.aliased_accesses += 1;
                true
            }
            None => false,
        }
    }

    /// Records that one of the two halves of `id` finished.
    ///
    /// # Returns
    ///
    /// The waiters to notify once both halves are done, `None` before that.
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownAccess` if `id` is not in flight.
    pub fn complete_part(&mut self, id: AccessId) -> SimResult<Option<Vec<AccessWaiter>>> {
        let pending = self.pending.get_mut(&id).ok_or(SimError::UnknownAccess(id))?;
        pending.remaining -= 1;
        if pending.remaining > 0 {
            return Ok(None);
        }
        Ok(self.pending.remove(&id).map(|p| {
            tracing::trace!(access = %id, kind = ?p.access.kind, waiters = p.waiters.len(), "access resolved");
            p.waiters
        }))
    }

    /// Accesses still waiting on translation or the cache.
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    /// Requests folded into an existing access so far.
    pub const fn aliased_accesses(&self) -> u64 {
        self.aliased_accesses
    }
}

impl Core {
    fn translate(&self, thread: usize, virtual_address: u64) -> u64 {
        self.threads[thread]
            .context
            .as_ref()
            .map_or(virtual_address, |ctx| ctx.physical_address(virtual_address))
    }

    fn admits(&self, thread: usize, kind: AccessKind, virtual_address: u64) -> bool {
        let physical = self.translate(thread, virtual_address);
        let cache = match kind {
            AccessKind::Ifetch => &self.l1i,
            AccessKind::Load | AccessKind::Store => &self.l1d,
        };
        cache.can_access(kind, cache.tag(physical))
    }

    /// Returns true if the instruction cache admits a fetch of `virtual_address`.
    pub fn can_ifetch(&self, thread: usize, virtual_address: u64) -> bool {
        self.admits(thread, AccessKind::Ifetch, virtual_address)
    }

    /// Returns true if the data cache admits a load of `virtual_address`.
    pub fn can_load(&self, thread: usize, virtual_address: u64) -> bool {
        self.admits(thread, AccessKind::Load, virtual_address)
    }

    /// Returns true if the data cache admits a store to `virtual_address`.
    pub fn can_store(&self, thread: usize, virtual_address: u64) -> bool {
        self.admits(thread, AccessKind::Store, virtual_address)
    }

    /// Fetches the line holding `virtual_address` for `thread`.
    pub fn ifetch(&mut self, thread: usize, virtual_address: u64, pc: u64, waiter: AccessWaiter, cx: &mut CycleContext<'_>) {
        self.access(thread, AccessKind::Ifetch, virtual_address, pc, waiter, cx);
    }

    /// Reads `virtual_address` for `thread`.
    pub fn load(&mut self, thread: usize, virtual_address: u64, pc: u64, waiter: AccessWaiter, cx: &mut CycleContext<'_>) {
        self.access(thread, AccessKind::Load, virtual_address, pc, waiter, cx);
    }

    /// Writes `virtual_address` for `thread`.
    pub fn store(&mut self, thread: usize, virtual_address: u64, pc: u64, waiter: AccessWaiter, cx: &mut CycleContext<'_>) {
        self.access(thread, AccessKind::Store, virtual_address, pc, waiter, cx);
    }

    fn access(
        &mut self,
        thread: usize,
        kind: AccessKind,
        virtual_address: u64,
        pc: u64,
        waiter: AccessWaiter,
        cx: &mut CycleContext<'_>,
    ) {
        let physical_address = self.translate(thread, virtual_address);
        let (cache, level) = match kind {
            AccessKind::Ifetch => (&mut self.l1i, CacheLevel::Instruction),
            AccessKind::Load | AccessKind::Store => (&mut self.l1d, CacheLevel::Data),
        };
        let tag = cache.tag(physical_address);

        if let Some(primary) = cache.find_access(tag) {
            if self.memory.alias(primary, waiter) {
                tracing::trace!(core = self.id, thread, %primary, tag, "access aliased");
                return;
            }
        }

        let access = MemoryAccess {
            id: cx.ids.next_access_id(),
            kind,
            thread: self.threads[thread].id,
            pc,
            virtual_address,
            physical_address,
            tag,
        };
        cache.begin_access(&access);
        let cache_latency = cache.receive(&access);
        let mmu = &mut self.threads[thread].mmu;
        let translation_latency = match kind {
            AccessKind::Ifetch => mmu.itlb.access(&access),
            AccessKind::Load | AccessKind::Store => mmu.dtlb.access(&access),
        };

        cx.schedule_after(
            translation_latency,
            Event::TranslationCompleted {
                core: self.id,
                access: access.id,
            },
        );
        cx.schedule_after(
            cache_latency,
            Event::CacheServiced {
                core: self.id,
                cache: level,
                tag,
            },
        );
        tracing::trace!(
            core = self.id,
            thread,
            access = %access.id,
            ?kind,
            tag,
            translation_latency,
            cache_latency,
            "access started"
        );
        self.memory.begin(access, waiter);
    }

    /// Handles the translation half of an access.
    pub(crate) fn on_translation_completed(&mut self, access: AccessId) -> SimResult<()> {
        if let Some(waiters) = self.memory.complete_part(access)? {
            self.notify_waiters(&waiters);
        }
        Ok(())
    }

    /// Handles the cache half of every access registered on `tag`.
    pub(crate) fn on_cache_serviced(&mut self, level: CacheLevel, tag: u64) -> SimResult<()> {
        let cache = match level {
            CacheLevel::Instruction => &mut self.l1i,
            CacheLevel::Data => &mut self.l1d,
        };
        for access in cache.end_access(tag) {
            if let Some(waiters) = self.memory.complete_part(access)? {
                self.notify_waiters(&waiters);
            }
        }
        Ok(())
    }

    fn notify_waiters(&mut self, waiters: &[AccessWaiter]) {
        for waiter in waiters {
            match *waiter {
                AccessWaiter::Fetch { thread } => {
                    if let Some(t) = self.threads.get_mut(thread) {
                        t.fetch_stalled = false;
                    }
                }
                AccessWaiter::Load { entry } => self.signal_completed(entry),
                AccessWaiter::Store { .. } | AccessWaiter::Warmup => {}
            }
        }
    }
}
