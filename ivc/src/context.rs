//! Adaptive probability contexts for every syntax element of a coded block.
//!
//! A [`ContextModel`] holds the 15-bit probability of a `1` bin together with
//! an adaptation counter, the same two-entry layout the arithmetic coder
//! updates after each adaptive bin. [`ContextBank`] owns one model per
//! syntax role; the significance flag is split into position buckets that
//! [`ContextBank::switch_context`] selects from.

use std::sync::Arc;

use crate::scan;

/// Bit costs are expressed in 1/256 bit units.
pub const BIT_COST_SHIFT: u32 = 8;
pub const BIT_COST_SCALE: u32 = 1 << BIT_COST_SHIFT;

pub const PROB_ONE: u32 = 32768;
const PROB_HALF: u16 = 16384;

pub const SIG_CTX_COUNT: usize = 6;
pub const MODE_CTX_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextModel {
    cdf: [u16; 2],
}

impl Default for ContextModel {
    fn default() -> Self {
        Self {
            cdf: [PROB_HALF, 0],
        }
    }
}

impl ContextModel {
    /// Probability of a `1` bin, scaled to `1 << 15`.
    pub fn probability(&self) -> u16 {
        self.cdf[0]
    }

    /// Cost of coding `bit` in this state, without adapting.
    pub fn estimated_bits(&self, bit: bool) -> u32 {
        let p1 = self.cdf[0] as u32;
        bit_cost(if bit { p1 } else { PROB_ONE - p1 })
    }

    pub fn update(&mut self, bit: bool) {
        let count = self.cdf[1];
        let rate = 4 + (count >> 4);
        if bit {
            self.cdf[0] += (PROB_ONE as u16 - self.cdf[0]) >> rate;
        } else {
            self.cdf[0] -= self.cdf[0] >> rate;
        }
        self.cdf[1] = count + if count < 32 { 1 } else { 0 };
    }
}

/// `-log2(prob / 2^15)` in 1/256 bit units.
pub fn bit_cost(prob: u32) -> u32 {
    let p = prob.clamp(1, PROB_ONE) as f64 / PROB_ONE as f64;
    (-p.log2() * BIT_COST_SCALE as f64).round() as u32
}

fn sig_bucket(diagonal: usize) -> u8 {
    match diagonal {
        0 => 0,
        1 => 1,
        2 => 2,
        3..=4 => 3,
        5..=8 => 4,
        _ => 5,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBank {
    sig_flag: [ContextModel; SIG_CTX_COUNT],
    gt1_flag: ContextModel,
    level_prefix: ContextModel,
    last_prefix: ContextModel,
    coded_block_flag: ContextModel,
    mode: [ContextModel; MODE_CTX_COUNT],
    sig_buckets: Arc<[u8]>,
    current_sig: usize,
}

impl ContextBank {
    pub fn new(block_size: usize) -> Self {
        let sig_buckets: Arc<[u8]> = scan::diagonal_scan(block_size)
            .iter()
            .map(|&raster| {
                let raster = raster as usize;
                sig_bucket(raster / block_size + raster % block_size)
            })
            .collect();

        Self {
            sig_flag: [ContextModel::default(); SIG_CTX_COUNT],
            gt1_flag: ContextModel::default(),
            level_prefix: ContextModel::default(),
            last_prefix: ContextModel::default(),
            coded_block_flag: ContextModel::default(),
            mode: [ContextModel::default(); MODE_CTX_COUNT],
            sig_buckets,
            current_sig: 0,
        }
    }

    pub fn positions(&self) -> usize {
        self.sig_buckets.len()
    }

    /// Selects the significance context for `scan_pos`.
    ///
    /// Panics if `scan_pos` is outside the block.
    pub fn switch_context(&mut self, scan_pos: usize) {
        assert!(
            scan_pos < self.sig_buckets.len(),
            "scan position {scan_pos} outside a {}-coefficient block",
            self.sig_buckets.len()
        );
        self.current_sig = self.sig_buckets[scan_pos] as usize;
    }

    pub fn sig_flag(&mut self) -> &mut ContextModel {
        &mut self.sig_flag[self.current_sig]
    }

    pub fn gt1_flag(&mut self) -> &mut ContextModel {
        &mut self.gt1_flag
    }

    pub fn level_prefix(&mut self) -> &mut ContextModel {
        &mut self.level_prefix
    }

    pub fn last_prefix(&mut self) -> &mut ContextModel {
        &mut self.last_prefix
    }

    pub fn coded_block_flag(&mut self) -> &mut ContextModel {
        &mut self.coded_block_flag
    }

    pub fn mode_bin(&mut self, depth: usize) -> &mut ContextModel {
        &mut self.mode[depth]
    }
}
