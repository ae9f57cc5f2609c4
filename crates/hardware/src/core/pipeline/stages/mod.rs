//! Pipeline stage implementations.
//!
//! Each stage is a free function over a [`Core`](crate::core::Core). Stages run
//! in reverse pipeline order within a cycle so that a result produced in one
//! cycle is consumed in the next:
//! 1. **Commit:** Retires ROB heads, trains the predictor and squashes on a
//!    misprediction.
//! 2. **Writeback:** Marks completed entries and wakes their dependents.
//! 3. **Refresh:** Decides which loads may issue past older stores.
//! 4. **Issue:** Sends ready entries to functional units and the data cache.
//! 5. **Dispatch:** Moves renamed entries into the issue queues and the LSQ.
//! 6. **Rename:** Maps decode buffer entries onto physical registers.
//! 7. **Fetch:** Fills the decode buffer from the selected threads' contexts.

/// Commit stage and squash.
pub mod commit;

/// Dispatch stage implementation.
pub mod dispatch;

/// Instruction fetch stage implementation.
pub mod fetch;

/// Issue stage implementation.
pub mod issue;

/// Load/store queue refresh.
pub mod refresh;

/// Register rename stage implementation.
pub mod rename;

/// Writeback stage implementation.
pub mod writeback;

pub use commit::{commit_stage, squash};
pub use dispatch::dispatch_stage;
pub use fetch::fetch_stage;
pub use issue::issue_stage;
pub use refresh::refresh_stage;
pub use rename::rename_stage;
pub use writeback::writeback_stage;
