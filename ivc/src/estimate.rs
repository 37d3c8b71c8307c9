//! Rate estimation for mode decision.
//!
//! [`BitEstimator`] implements [`BinEncoder`] by summing the ideal cost of
//! each bin instead of producing bytes. [`estimate_block`] runs the regular
//! block writer against a snapshot of the context bank, so the estimate
//! follows the exact bin sequence and adaptation the real coder would see
//! while the live bank stays untouched.

use crate::coef;
use crate::context::{BIT_COST_SCALE, ContextBank, ContextModel};
use crate::engine::BinEncoder;
use crate::predict::PredictionMode;

#[derive(Debug, Default, Clone)]
pub struct BitEstimator {
    cost: u64,
}

impl BitEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated cost in 1/256 bit units.
    pub fn cost(&self) -> u64 {
        self.cost
    }

    pub fn bits(&self) -> f64 {
        self.cost as f64 / BIT_COST_SCALE as f64
    }
}

impl BinEncoder for BitEstimator {
    fn encode_bin(&mut self, bit: bool, ctx: &mut ContextModel) {
        self.cost += ctx.estimated_bits(bit) as u64;
        ctx.update(bit);
    }

    fn encode_bin_ep(&mut self, _bit: bool) {
        self.cost += BIT_COST_SCALE as u64;
    }
}

/// Cost in 1/256 bits of coding one block from the state in `bank`.
pub fn estimate_block(bank: &ContextBank, mode: PredictionMode, levels: &[i32]) -> u64 {
    let mut snapshot = bank.clone();
    let mut estimator = BitEstimator::new();
    coef::write_block(&mut estimator, &mut snapshot, mode, levels);
    estimator.cost()
}
