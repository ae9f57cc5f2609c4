//! Bounded in-order pipeline buffer.
//!
//! Backs the per-thread decode buffer, reorder buffer and load/store queue.
//! Producers check [`PipelineBuffer::is_full`] and count a stall instead of
//! pushing into a full buffer.

use std::collections::VecDeque;

/// A FIFO with a fixed capacity.
#[derive(Clone, Debug)]
pub struct PipelineBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> PipelineBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the buffer holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if no more entries fit.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Appends an entry at the tail.
    ///
    /// # Returns
    ///
    /// The entry back in `Err` if the buffer is full.
    pub fn push(&mut self, entry: T) -> Result<(), T> {
        if self.is_full() {
            Err(entry)
        } else {
            self.entries.push_back(entry);
            Ok(())
        }
    }

    /// Oldest entry.
    pub fn front(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Youngest entry.
    pub fn back(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Removes the oldest entry.
    pub fn pop_front(&mut self) -> Option<T> {
        self.entries.pop_front()
    }

    /// Removes the youngest entry.
    pub fn pop_back(&mut self) -> Option<T> {
        self.entries.pop_back()
    }

    /// Iterates from oldest to youngest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        self.entries.iter()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: PartialEq> PipelineBuffer<T> {
    /// Removes the first entry equal to `entry`.
    ///
    /// # Returns
    ///
    /// `true` if an entry was removed.
    pub fn remove(&mut self, entry: &T) -> bool {
        match self.entries.iter().position(|e| e == entry) {
            Some(pos) => self.entries.remove(pos).is_some(),
            None => false,
        }
    }

    /// Returns true if an entry equal to `entry` is buffered.
    pub fn contains(&self, entry: &T) -> bool {
        self.entries.contains(entry)
    }
}
