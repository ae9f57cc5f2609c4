//! Branch Predictor Interface.
//!
//! Fetch consults the predictor once per control instruction and keeps the
//! returned token with the instruction until commit, where the resolved outcome
//! trains the predictor. The pipeline never looks inside the token.

use std::fmt;

use serde::Serialize;

use crate::isa::Mnemonic;

/// Opaque predictor state carried from prediction to training.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BranchPredictorUpdate {
    /// Direction counter consulted for a conditional branch.
    pub counter_index: Option<usize>,
    /// The target came from the return address stack.
    pub used_return_address_stack: bool,
}

/// Result of one prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    /// Address fetch continues at.
    pub next_pc: u64,
    /// Token handed back at commit.
    pub update: BranchPredictorUpdate,
    /// Return address stack top before this prediction.
    pub return_address_stack_recover_index: usize,
}

/// Resolved outcome of a committed control instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchOutcome {
    /// Address of the control instruction.
    pub pc: u64,
    /// Address actually executed next.
    pub target: u64,
    /// Control left the fall-through path.
    pub taken: bool,
    /// Prediction left the fall-through path.
    pub predicted_taken: bool,
    /// Predicted and actual successors agree.
    pub correct: bool,
    /// Mnemonic of the control instruction.
    pub mnemonic: Mnemonic,
}

/// Prediction accuracy counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BranchPredictorStats {
    /// Committed control instructions predicted correctly.
    pub hits: u64,
    /// Committed control instructions mispredicted.
    pub misses: u64,
}

impl BranchPredictorStats {
    /// Fraction of committed control instructions predicted correctly.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Trait for branch prediction algorithms.
pub trait BranchPredictor: Send + fmt::Debug {
    /// Predicts the successor of a control instruction.
    ///
    /// # Arguments
    ///
    /// * `pc` - Address of the control instruction.
    /// * `mnemonic` - Its mnemonic.
    /// * `actual_npc` - The resolved successor, consulted only by an oracle.
    fn predict(&mut self, pc: u64, mnemonic: Mnemonic, actual_npc: u64) -> Prediction;

    /// Trains the predictor with a committed outcome.
    fn update(&mut self, outcome: &BranchOutcome, update: &BranchPredictorUpdate);

    /// Restores the return address stack top saved by a squashed prediction.
    fn recover(&mut self, return_address_stack_recover_index: usize);

    /// Current return address stack top, recorded for instructions that do not
    /// consult the predictor.
    fn return_address_stack_top(&self) -> usize;

    /// Accuracy counters.
    fn stats(&self) -> BranchPredictorStats;
}
