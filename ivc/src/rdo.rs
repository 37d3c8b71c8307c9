use log::trace;

use crate::block::{BlockPipeline, CodedBlock, quantization_step};
use crate::context::{BIT_COST_SCALE, ContextBank};
use crate::estimate;
use crate::plane::Plane;
use crate::predict::PredictionMode;

/// Scale applied to the squared quantizer step to form lambda.
pub const LAMBDA_SCALE: f64 = 0.125;

/// Lagrange multiplier for a QP, in squared-error units per bit.
#[inline]
pub fn default_lambda(qp: u8) -> f64 {
    let step = quantization_step(qp);
    LAMBDA_SCALE * step * step
}

/// J = D + lambda * R, with the rate in 1/256 bits.
#[inline]
pub fn calculate_rd_cost(distortion: u64, rate: u64, lambda: f64) -> f64 {
    distortion as f64 + lambda * (rate as f64 / BIT_COST_SCALE as f64)
}

#[derive(Debug, Clone)]
pub struct ModeCandidate {
    pub block: CodedBlock,
    /// Estimated rate in 1/256 bits.
    pub rate: u64,
    pub cost: f64,
}

/// Codes the block with one mode and prices it against the current contexts.
pub fn evaluate_mode(
    pipeline: &BlockPipeline,
    recon: &Plane,
    bank: &ContextBank,
    (x, y): (usize, usize),
    source: &[u8],
    mode: PredictionMode,
    lambda: f64,
) -> ModeCandidate {
    let block = pipeline.encode_block(recon, x, y, source, mode);
    let rate = estimate::estimate_block(bank, mode, &block.levels);
    let cost = calculate_rd_cost(block.distortion, rate, lambda);
    ModeCandidate { block, rate, cost }
}

/// Tries every mode in enumeration order and keeps the first one with the
/// lowest cost.
pub fn select_mode(
    pipeline: &BlockPipeline,
    recon: &Plane,
    bank: &ContextBank,
    pos: (usize, usize),
    source: &[u8],
    lambda: f64,
) -> ModeCandidate {
    let [first, rest @ ..] = PredictionMode::ALL;
    let mut best = evaluate_mode(pipeline, recon, bank, pos, source, first, lambda);
    trace!(
        "  {:?} {}: D={} R={:.2} J={:.2}",
        pos,
        first.name(),
        best.block.distortion,
        best.rate as f64 / BIT_COST_SCALE as f64,
        best.cost
    );

    for mode in rest {
        let candidate = evaluate_mode(pipeline, recon, bank, pos, source, mode, lambda);
        trace!(
            "  {:?} {}: D={} R={:.2} J={:.2}",
            pos,
            mode.name(),
            candidate.block.distortion,
            candidate.rate as f64 / BIT_COST_SCALE as f64,
            candidate.cost
        );
        if candidate.cost < best.cost {
            best = candidate;
        }
    }
    best
}
