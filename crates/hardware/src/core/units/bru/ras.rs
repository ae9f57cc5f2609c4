//! Return Address Stack (RAS).
//!
//! A circular stack of return addresses. Calls push and returns pop at fetch
//! time, which is speculative; every prediction records the top-of-stack index
//! so a squash can roll the pointer back. Overflow silently overwrites the
//! oldest entry.

/// Return Address Stack structure.
#[derive(Clone, Debug)]
pub struct Ras {
    stack: Vec<u64>,
    top: usize,
}

impl Ras {
    /// Creates a stack of `capacity` entries; zero disables it.
    pub fn new(capacity: usize) -> Self {
        Self {
            stack: vec![0; capacity],
            top: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.stack.len()
    }

    /// Index of the current top, used as the recovery point.
    pub const fn top_of_stack(&self) -> usize {
        self.top
    }

    /// Pushes a return address.
    pub fn push(&mut self, addr: u64) {
        if self.stack.is_empty() {
            return;
        }
        self.top = (self.top + 1) % self.stack.len();
        self.stack[self.top] = addr;
    }

    /// Pops the top return address.
    ///
    /// The circular stack never runs dry; a disabled stack returns `None`.
    pub fn pop(&mut self) -> Option<u64> {
        if self.stack.is_empty() {
            return None;
        }
        let addr = self.stack[self.top];
        self.top = (self.top + self.stack.len() - 1) % self.stack.len();
        Some(addr)
    }

    /// Restores the top index saved by [`Ras::top_of_stack`].
    pub fn recover(&mut self, index: usize) {
        if !self.stack.is_empty() {
            self.top = index % self.stack.len();
        }
    }
}
