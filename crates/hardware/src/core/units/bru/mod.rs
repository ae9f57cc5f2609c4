//! Branch prediction unit (BRU) implementations.
//!
//! Each hardware thread owns one predictor. Fetch asks it for the successor of
//! every control instruction; commit trains it with the resolved outcome and
//! squash rolls back its return address stack.

pub use self::branch_predictor::{
    BranchOutcome, BranchPredictor, BranchPredictorStats, BranchPredictorUpdate, Prediction,
};

/// Branch predictor trait and prediction records.
pub mod branch_predictor;

/// Branch Target Buffer for storing predicted branch targets.
pub mod btb;

/// Oracle predictor.
pub mod perfect;

/// Return Address Stack for predicting return addresses.
pub mod ras;

/// Static taken / not-taken predictors.
pub mod static_bp;

/// BTB and RAS handling shared by the non-oracle predictors.
pub mod targets;

/// Bimodal two-bit saturating counter predictor.
pub mod two_bit;

use self::{perfect::PerfectPredictor, static_bp::StaticPredictor, two_bit::TwoBitPredictor};
use crate::config::{BranchPredictorConfig, BranchPredictorType};
use crate::isa::Mnemonic;

/// Enum wrapper for static dispatch of Branch Predictors.
/// This avoids vtable lookups in the fetch loop.
#[derive(Clone, Debug)]
pub enum BranchPredictorWrapper {
    /// Oracle.
    Perfect(PerfectPredictor),
    /// Always taken or always not taken.
    Static(StaticPredictor),
    /// Bimodal two-bit counters.
    TwoBit(TwoBitPredictor),
}

impl BranchPredictorWrapper {
    /// Creates the predictor selected by `config.kind`.
    pub fn new(config: &BranchPredictorConfig) -> Self {
        match config.kind {
            BranchPredictorType::Perfect => Self::Perfect(PerfectPredictor::default()),
            BranchPredictorType::Taken => Self::Static(StaticPredictor::new(true, config)),
            BranchPredictorType::NotTaken => Self::Static(StaticPredictor::new(false, config)),
            BranchPredictorType::TwoBit => Self::TwoBit(TwoBitPredictor::new(config)),
        }
    }
}

impl BranchPredictor for BranchPredictorWrapper {
    #[inline]
    fn predict(&mut self, pc: u64, mnemonic: Mnemonic, actual_npc: u64) -> Prediction {
        match self {
            Self::Perfect(bp) => bp.predict(pc, mnemonic, actual_npc),
            Self::Static(bp) => bp.predict(pc, mnemonic, actual_npc),
            Self::TwoBit(bp) => bp.predict(pc, mnemonic, actual_npc),
        }
    }

    #[inline]
    fn update(&mut self, outcome: &BranchOutcome, update: &BranchPredictorUpdate) {
        match self {
            Self::Perfect(bp) => bp.update(outcome, update),
            Self::Static(bp) => bp.update(outcome, update),
            Self::TwoBit(bp) => bp.update(outcome, update),
        }
    }

    #[inline]
    fn recover(&mut self, return_address_stack_recover_index: usize) {
        match self {
            Self::Perfect(bp) => bp.recover(return_address_stack_recover_index),
            Self::Static(bp) => bp.recover(return_address_stack_recover_index),
            Self::TwoBit(bp) => bp.recover(return_address_stack_recover_index),
        }
    }

    fn return_address_stack_top(&self) -> usize {
        match self {
            Self::Perfect(bp) => bp.return_address_stack_top(),
            Self::Static(bp) => bp.return_address_stack_top(),
            Self::TwoBit(bp) => bp.return_address_stack_top(),
        }
    }

    fn stats(&self) -> BranchPredictorStats {
        match self {
            Self::Perfect(bp) => bp.stats(),
            Self::Static(bp) => bp.stats(),
            Self::TwoBit(bp) => bp.stats(),
        }
    }
}
