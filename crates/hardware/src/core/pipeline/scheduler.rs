//! Thread selection strategies.
//!
//! Two kinds of strategy decide which hardware threads of a core get pipeline
//! bandwidth each cycle:
//! 1. **Thread schedulers:** Hand out the rename and dispatch width one
//!    instruction at a time, rotating fairly across threads.
//! 2. **Fetch policies:** Choose which running threads fetch this cycle.

use std::fmt;

use crate::common::error::SimResult;
use crate::config::FetchPolicy;

/// Distributes a per-cycle width across threads.
pub trait ThreadScheduler: Send + Sync + fmt::Debug {
    /// Consumes up to `width` units of work.
    ///
    /// `step(thread)` tries to do one unit for `thread` and reports whether it
    /// did; a thread that declines is not offered more work this cycle.
    ///
    /// # Returns
    ///
    /// The number of units consumed.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `step`.
    fn consume(
        &mut self,
        num_threads: usize,
        width: usize,
        step: &mut dyn FnMut(usize) -> SimResult<bool>,
    ) -> SimResult<usize>;
}

/// Round-robin scheduler.
///
/// The starting thread advances by one every cycle; within a cycle threads are
/// offered work in rotation until the width is used up or every thread has
/// declined.
#[derive(Clone, Debug, Default)]
pub struct RoundRobinScheduler {
    next: usize,
}

impl RoundRobinScheduler {
    /// Creates a scheduler whose first cycle starts at thread 0.
    pub const fn new() -> Self {
        Self { next: 0 }
    }
}

impl ThreadScheduler for RoundRobinScheduler {
    fn consume(
        &mut self,
        num_threads: usize,
        width: usize,
        step: &mut dyn FnMut(usize) -> SimResult<bool>,
    ) -> SimResult<usize> {
        if num_threads == 0 {
            return Ok(0);
        }
        let start = self.next % num_threads;
        self.next = (start + 1) % num_threads;

        let mut stalled = vec![false; num_threads];
        let mut num_stalled = 0;
        let mut consumed = 0;
        let mut thread = start;
        while consumed < width && num_stalled < num_threads {
            if !stalled[thread] {
                if step(thread)? {
                    consumed += 1;
                } else {
                    stalled[thread] = true;
                    num_stalled += 1;
                }
            }
            thread = (thread + 1) % num_threads;
        }
        Ok(consumed)
    }
}

/// Chooses the threads that fetch in a cycle.
pub trait FetchStrategy: Send + Sync + fmt::Debug {
    /// Returns the threads to fetch for, given which ones are running.
    fn select(&mut self, running: &[bool]) -> Vec<usize>;
}

/// Every running thread fetches every cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllThreadsFetch;

impl FetchStrategy for AllThreadsFetch {
    fn select(&mut self, running: &[bool]) -> Vec<usize> {
        running
            .iter()
            .enumerate()
            .filter_map(|(t, &r)| r.then_some(t))
            .collect()
    }
}

/// One running thread fetches per cycle, rotating.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundRobinFetch {
    next: usize,
}

impl FetchStrategy for RoundRobinFetch {
    fn select(&mut self, running: &[bool]) -> Vec<usize> {
        let n = running.len();
        if n == 0 {
            return Vec::new();
        }
        let chosen = (0..n)
            .map(|offset| (self.next + offset) % n)
            .find(|&t| running[t]);
        match chosen {
            Some(t) => {
                self.next = (t + 1) % n;
                vec![t]
            }
            None => Vec::new(),
        }
    }
}

/// Builds the fetch strategy selected in the configuration.
pub fn fetch_strategy(policy: FetchPolicy) -> Box<dyn FetchStrategy> {
    match policy {
        FetchPolicy::AllThreads => Box::new(AllThreadsFetch),
        FetchPolicy::RoundRobin => Box::new(RoundRobinFetch::default()),
    }
}
