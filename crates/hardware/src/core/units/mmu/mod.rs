//! Memory Management Unit (MMU).
//!
//! Each hardware thread owns an instruction and a data translation buffer. The
//! timing model only needs their latency: translation itself is done by the
//! thread's context, so the buffers track page tags to tell hits from misses.

/// Translation lookaside buffers.
pub mod tlb;

use crate::config::TlbConfig;

pub use self::tlb::{Tlb, TranslationBuffer};

/// The instruction and data translation buffers of one hardware thread.
#[derive(Debug)]
pub struct Mmu {
    /// Translation buffer consulted by instruction fetch.
    pub itlb: Box<dyn TranslationBuffer>,
    /// Translation buffer consulted by loads and stores.
    pub dtlb: Box<dyn TranslationBuffer>,
}

impl Mmu {
    /// Creates cold ITLB and DTLB instances from one configuration.
    pub fn new(config: &TlbConfig) -> Self {
        Self {
            itlb: Box::new(Tlb::new("itlb", config)),
            dtlb: Box::new(Tlb::new("dtlb", config)),
        }
    }

    /// Builds an MMU from caller-supplied buffers.
    pub fn with_buffers(itlb: Box<dyn TranslationBuffer>, dtlb: Box<dyn TranslationBuffer>) -> Self {
        Self { itlb, dtlb }
    }
}
