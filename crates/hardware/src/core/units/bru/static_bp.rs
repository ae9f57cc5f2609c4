//! Static Branch Predictors.
//!
//! Conditional branches are always predicted taken, or always not taken. Jumps
//! and calls still use the BTB and returns the RAS.

use super::branch_predictor::{
    BranchOutcome, BranchPredictor, BranchPredictorStats, BranchPredictorUpdate, Prediction,
};
use super::targets::TargetPredictor;
use crate::config::BranchPredictorConfig;
use crate::isa::Mnemonic;

/// Static Branch Predictor structure.
#[derive(Clone, Debug)]
pub struct StaticPredictor {
    taken: bool,
    targets: TargetPredictor,
}

impl StaticPredictor {
    /// Creates a predictor that always predicts conditionals `taken`.
    pub fn new(taken: bool, config: &BranchPredictorConfig) -> Self {
        Self {
            taken,
            targets: TargetPredictor::new(config),
        }
    }
}

impl BranchPredictor for StaticPredictor {
    fn predict(&mut self, pc: u64, mnemonic: Mnemonic, _actual_npc: u64) -> Prediction {
        let mut update = BranchPredictorUpdate::default();
        let (next_pc, return_address_stack_recover_index) =
            self.targets.predict(pc, mnemonic, self.taken, &mut update);
        Prediction {
            next_pc,
            update,
            return_address_stack_recover_index,
        }
    }

    fn update(&mut self, outcome: &BranchOutcome, update: &BranchPredictorUpdate) {
        let _ = self.targets.update(outcome, update);
    }

    fn recover(&mut self, return_address_stack_recover_index: usize) {
        self.targets.recover(return_address_stack_recover_index);
    }

    fn return_address_stack_top(&self) -> usize {
        self.targets.return_address_stack_top()
    }

    fn stats(&self) -> BranchPredictorStats {
        self.targets.stats()
    }
}
