//! Deferred completion events.
//!
//! Everything asynchronous in the model (functional unit latencies, translation
//! and cache line service) is an [`Event`] scheduled for a future cycle. The
//! simulation drains due events once per cycle, after every core has executed
//! its stages, and routes each one to the core that scheduled it:
//! 1. **Ordering:** Events fire in cycle order; events due in the same cycle fire
//!    in the order they were scheduled.
//! 2. **Cancellation:** There is none. Handlers look their target up and ignore
//!    events for entries that were squashed or retired in the meantime.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::common::ids::{AccessId, EntryId, IdGenerator};
use crate::core::units::fu::FunctionalUnitType;

/// Which first-level cache an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheLevel {
    /// L1 instruction cache.
    Instruction,
    /// L1 data cache.
    Data,
}

/// A deferred notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// A functional unit may accept a new operation.
    FunctionalUnitReleased {
        /// Owning core.
        core: usize,
        /// Unit type.
        unit: FunctionalUnitType,
        /// Unit index within its type.
        index: usize,
        /// Acquisition generation the release belongs to.
        generation: u64,
    },
    /// An operation finished executing.
    FunctionalUnitCompleted {
        /// Owning core.
        core: usize,
        /// Entry that issued the operation.
        entry: EntryId,
    },
    /// Address translation of an access finished.
    TranslationCompleted {
        /// Owning core.
        core: usize,
        /// The access.
        access: AccessId,
    },
    /// A cache line transaction finished.
    CacheServiced {
        /// Owning core.
        core: usize,
        /// Cache that serviced it.
        cache: CacheLevel,
        /// Line tag.
        tag: u64,
    },
}

impl Event {
    /// Index of the core the event belongs to.
    pub const fn core(&self) -> usize {
        match *self {
            Self::FunctionalUnitReleased { core, .. }
            | Self::FunctionalUnitCompleted { core, .. }
            | Self::TranslationCompleted { core, .. }
            | Self::CacheServiced { core, .. } => core,
        }
    }
}

#[derive(Clone, Debug)]
struct ScheduledEvent {
    cycle: u64,
    sequence: u64,
    event: Event,
}

impl ScheduledEvent {
    const fn key(&self) -> (u64, u64) {
        (self.cycle, self.sequence)
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-heap of scheduled events.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    sequence: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `event` to fire at `cycle`.
    pub fn schedule(&mut self, cycle: u64, event: Event) {
        let sequence = self.sequence;
        self.sequence += 1;
        self.heap.push(Reverse(ScheduledEvent {
            cycle,
            sequence,
            event,
        }));
    }

    /// Removes and returns the earliest event due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<Event> {
        if self.heap.peek()?.0.cycle > now {
            return None;
        }
        self.heap.pop().map(|Reverse(scheduled)| scheduled.event)
    }

    /// Cycle of the earliest pending event.
    pub fn next_cycle(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(scheduled)| scheduled.cycle)
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Per-cycle state threaded through every stage of every core.
#[derive(Debug)]
pub struct CycleContext<'a> {
    /// The cycle being executed.
    pub now: u64,
    /// Where deferred completions are scheduled.
    pub events: &'a mut EventQueue,
    /// Source of fresh entry, instruction and access ids.
    pub ids: &'a mut IdGenerator,
}

impl CycleContext<'_> {
    /// Schedules `event` to fire `delay` cycles from now.
    pub fn schedule_after(&mut self, delay: u64, event: Event) {
        self.events.schedule(self.now + delay, event);
    }
}
