//! Oracle predictor.
//!
//! Always predicts the resolved successor, so the pipeline never runs down a
//! wrong path. Useful as an upper bound.

use super::branch_predictor::{
    BranchOutcome, BranchPredictor, BranchPredictorStats, BranchPredictorUpdate, Prediction,
};
use crate::isa::Mnemonic;

/// Perfect predictor.
#[derive(Clone, Debug, Default)]
pub struct PerfectPredictor {
    stats: BranchPredictorStats,
}

impl BranchPredictor for PerfectPredictor {
    fn predict(&mut self, _pc: u64, _mnemonic: Mnemonic, actual_npc: u64) -> Prediction {
        Prediction {
            next_pc: actual_npc,
            update: BranchPredictorUpdate::default(),
            return_address_stack_recover_index: 0,
        }
    }

    fn update(&mut self, outcome: &BranchOutcome, _update: &BranchPredictorUpdate) {
        if outcome.correct {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
    }

    fn recover(&mut self, _return_address_stack_recover_index: usize) {}

    fn return_address_stack_top(&self) -> usize {
        0
    }

    fn stats(&self) -> BranchPredictorStats {
        self.stats
    }
}
