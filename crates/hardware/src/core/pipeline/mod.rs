//! Out-of-order pipeline structures.
//!
//! This module contains the bookkeeping shared by the stages of a core:
//! 1. **Buffers:** Bounded FIFOs for the decode buffer, ROB and LSQ.
//! 2. **Entries:** Decode buffer, ROB and LSQ records and the table holding them.
//! 3. **Queues:** Waiting, ready and completed issue queues.
//! 4. **Registers:** Physical register files and per-thread rename tables.
//! 5. **Scheduling:** Thread arbitration for rename, dispatch and fetch.
//! 6. **Stages:** The stage functions themselves.

/// Bounded pipeline FIFO.
pub mod buffer;

/// Decode buffer, ROB and LSQ entries.
pub mod entry;

/// Issue and completion queues.
pub mod queues;

/// Physical register files.
pub mod regfile;

/// Architectural-to-physical rename tables.
pub mod rename_table;

/// Thread schedulers and fetch policies.
pub mod scheduler;

/// Stage implementations (fetch, rename, dispatch, issue, writeback, commit).
pub mod stages;
