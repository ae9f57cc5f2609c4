//! Target prediction shared by the direction predictors.
//!
//! Every non-oracle predictor resolves targets the same way:
//! 1. **Returns:** Pop the return address stack.
//! 2. **Calls:** Push the return address, then predict like a jump.
//! 3. **Jumps and taken branches:** Look up the BTB; a miss falls through.
//! 4. **Not-taken branches:** Fall through.

use super::branch_predictor::{BranchOutcome, BranchPredictorStats, BranchPredictorUpdate};
use super::btb::Btb;
use super::ras::Ras;
use crate::common::constants::INSTRUCTION_SIZE;
use crate::config::BranchPredictorConfig;
use crate::isa::{Mnemonic, StaticInstructionType};

/// BTB, RAS and accuracy counters of one predictor.
#[derive(Clone, Debug)]
pub struct TargetPredictor {
    btb: Btb,
    ras: Ras,
    stats: BranchPredictorStats,
}

impl TargetPredictor {
    /// Creates cold structures sized from `config`.
    pub fn new(config: &BranchPredictorConfig) -> Self {
        Self {
            btb: Btb::new(config.btb_sets, config.btb_associativity),
            ras: Ras::new(config.ras_size),
            stats: BranchPredictorStats::default(),
        }
    }

    /// Predicts a successor given the direction decision for conditionals.
    ///
    /// # Returns
    ///
    /// `(next_pc, return_address_stack_recover_index)`.
    pub fn predict(
        &mut self,
        pc: u64,
        mnemonic: Mnemonic,
        conditional_taken: bool,
        update: &mut BranchPredictorUpdate,
    ) -> (u64, usize) {
        let recover_index = self.ras.top_of_stack();
        let fall_through = pc + INSTRUCTION_SIZE;
        let kind = mnemonic.kind();

        if kind == StaticInstructionType::FunctionReturn {
            if let Some(addr) = self.ras.pop() {
                update.used_return_address_stack = true;
                return (addr, recover_index);
            }
        }
        if kind == StaticInstructionType::FunctionCall {
            self.ras.push(fall_through);
        }

        let next_pc = if kind != StaticInstructionType::Conditional || conditional_taken {
            self.btb.lookup(pc).unwrap_or(fall_through)
        } else {
            fall_through
        };
        (next_pc, recover_index)
    }

    /// Counts the outcome and trains the BTB.
    ///
    /// # Returns
    ///
    /// `false` if the outcome must not train the direction predictor either
    /// (a return whose target did not come from the stack).
    pub fn update(&mut self, outcome: &BranchOutcome, update: &BranchPredictorUpdate) -> bool {
        if outcome.correct {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        if outcome.mnemonic.kind() == StaticInstructionType::FunctionReturn
            && !update.used_return_address_stack
        {
            return false;
        }
        self.btb.update(outcome.pc, outcome.target, outcome.taken);
        true
    }

    /// Rolls the return address stack back.
    pub fn recover(&mut self, index: usize) {
        self.ras.recover(index);
    }

    /// Current return address stack top.
    pub const fn return_address_stack_top(&self) -> usize {
        self.ras.top_of_stack()
    }

    /// Accuracy counters.
    pub const fn stats(&self) -> BranchPredictorStats {
        self.stats
    }
}
