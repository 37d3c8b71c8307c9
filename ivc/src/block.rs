//! Per-block transform, quantization and reconstruction. Encoder and decoder
//! both reconstruct through [`BlockPipeline::reconstruct`], which keeps the
//! two sides sample-exact.

use crate::dct::Dct;
use crate::plane::Plane;
use crate::predict::{self, PredictionMode};
use crate::scan;

/// Added before flooring the scaled magnitude; pulls the dead zone in a bit.
pub const QUANT_ROUNDING_BIAS: f64 = 0.4;

/// Quantizer step size `2^(qp / 4)`.
pub fn quantization_step(qp: u8) -> f64 {
    2f64.powf(qp as f64 / 4.0)
}

pub fn sum_squared_error(a: &[u8], b: &[u8]) -> u64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as i64 - y as i64;
            (d * d) as u64
        })
        .sum()
}

/// Result of running one prediction mode over a block.
#[derive(Debug, Clone)]
pub struct CodedBlock {
    pub mode: PredictionMode,
    /// Quantization indices in scan order.
    pub levels: Vec<i32>,
    pub reconstruction: Vec<u8>,
    /// SSD between the source block and `reconstruction`.
    pub distortion: u64,
}

#[derive(Debug, Clone)]
pub struct BlockPipeline {
    size: usize,
    step: f64,
    dct: Dct,
    scan: Vec<u16>,
}

impl BlockPipeline {
    pub fn new(block_size: usize, qp: u8) -> Self {
        Self {
            size: block_size,
            step: quantization_step(qp),
            dct: Dct::new(block_size),
            scan: scan::diagonal_scan(block_size),
        }
    }

    pub fn block_size(&self) -> usize {
        self.size
    }

    pub fn quantize(&self, coeffs: &[f64]) -> Vec<i32> {
        coeffs
            .iter()
            .map(|&c| {
                let index = (c.abs() / self.step + QUANT_ROUNDING_BIAS).floor() as i32;
                if c < 0.0 { -index } else { index }
            })
            .collect()
    }

    pub fn dequantize(&self, levels: &[i32]) -> Vec<f64> {
        levels.iter().map(|&l| l as f64 * self.step).collect()
    }

    /// Transforms and quantizes `source - prediction`. Levels are row-major.
    pub fn quantize_residual(&self, source: &[u8], prediction: &[u8]) -> Vec<i32> {
        let residual: Vec<i32> = source
            .iter()
            .zip(prediction)
            .map(|(&s, &p)| s as i32 - p as i32)
            .collect();
        self.quantize(&self.dct.forward(&residual))
    }

    /// Rebuilds samples from row-major levels on top of `prediction`.
    pub fn reconstruct(&self, levels: &[i32], prediction: &[u8]) -> Vec<u8> {
        let residual = self.dct.inverse(&self.dequantize(levels));
        residual
            .iter()
            .zip(prediction)
            .map(|(&r, &p)| (r + p as f64).round().clamp(0.0, 255.0) as u8)
            .collect()
    }

    /// Predicts, codes and reconstructs the block at `(x, y)` with `mode`.
    pub fn encode_block(
        &self,
        recon: &Plane,
        x: usize,
        y: usize,
        source: &[u8],
        mode: PredictionMode,
    ) -> CodedBlock {
        let prediction = predict::predict(recon, x, y, self.size, mode);
        let raster = self.quantize_residual(source, &prediction);
        let reconstruction = self.reconstruct(&raster, &prediction);
        let distortion = sum_squared_error(source, &reconstruction);
        CodedBlock {
            mode,
            levels: scan::to_scan_order(&raster, &self.scan),
            reconstruction,
            distortion,
        }
    }

    /// Decoder side of [`encode_block`](Self::encode_block); `levels` are in
    /// scan order.
    pub fn decode_block(
        &self,
        recon: &Plane,
        x: usize,
        y: usize,
        mode: PredictionMode,
        levels: &[i32],
    ) -> Vec<u8> {
        let prediction = predict::predict(recon, x, y, self.size, mode);
        self.reconstruct(&scan::from_scan_order(levels, &self.scan), &prediction)
    }
}
