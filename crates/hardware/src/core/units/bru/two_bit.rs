//! Bimodal predictor of two-bit saturating counters.
//!
//! A branch address hashes to one counter in `0..=3`; values of 2 and above
//! predict taken. Counters start alternating between weakly not-taken and
//! weakly taken so neighbouring branches do not share an initial bias.

use super::branch_predictor::{
    BranchOutcome, BranchPredictor, BranchPredictorStats, BranchPredictorUpdate, Prediction,
};
use super::targets::TargetPredictor;
use crate::config::BranchPredictorConfig;
use crate::isa::{Mnemonic, StaticInstructionType};

const COUNTER_MAX: u8 = 3;
const TAKEN_THRESHOLD: u8 = 2;

/// Two-bit bimodal predictor.
#[derive(Clone, Debug)]
pub struct TwoBitPredictor {
    counters: Vec<u8>,
    targets: TargetPredictor,
}

impl TwoBitPredictor {
    /// Creates a predictor with `config.bimod_size` counters.
    pub fn new(config: &BranchPredictorConfig) -> Self {
        let size = config.bimod_size.max(1);
        Self {
            counters: (0..size).map(|i| if i % 2 == 0 { 1 } else { 2 }).collect(),
            targets: TargetPredictor::new(config),
        }
    }

    fn index(&self, pc: u64) -> usize {
        (((pc >> 19) ^ (pc >> 2)) as usize) & (self.counters.len() - 1)
    }

    /// Current counter value for the branch at `pc`.
    pub fn counter(&self, pc: u64) -> u8 {
        self.counters[self.index(pc)]
    }
}

impl BranchPredictor for TwoBitPredictor {
    fn predict(&mut self, pc: u64, mnemonic: Mnemonic, _actual_npc: u64) -> Prediction {
        let mut update = BranchPredictorUpdate::default();
        let mut taken = true;
        if mnemonic.kind() == StaticInstructionType::Conditional {
            let index = self.index(pc);
            update.counter_index = Some(index);
            taken = self.counters[index] >= TAKEN_THRESHOLD;
        }
        let (next_pc, return_address_stack_recover_index) =
            self.targets.predict(pc, mnemonic, taken, &mut update);
        Prediction {
            next_pc,
            update,
            return_address_stack_recover_index,
        }
    }

    fn update(&mut self, outcome: &BranchOutcome, update: &BranchPredictorUpdate) {
        if !self.targets.update(outcome, update) {
            return;
        }
        if let Some(counter) = update.counter_index.and_then(|i| self.counters.get_mut(i)) {
            *counter = if outcome.taken {
                (*counter + 1).min(COUNTER_MAX)
            } else {
                counter.saturating_sub(1)
            };
        }
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
