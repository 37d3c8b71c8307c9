//! Block syntax: prediction mode, coded-block flag, last significant scan
//! position and the coefficient levels from there back to DC.
//!
//! Every writer here is generic over [`BinEncoder`], so the same code drives
//! both the arithmetic coder and the rate estimator.

use crate::context::{ContextBank, ContextModel, MODE_CTX_COUNT};
use crate::engine::{BinDecoder, BinEncoder};
use crate::error::{CodecError, Result};
use crate::predict::PredictionMode;

/// Longest unary prefix a conforming stream can carry.
const MAX_EXP_GOLOMB_PREFIX: u32 = 31;

/// Order-0 exp-Golomb: `k = floor(log2(value + 1))` adaptive one-bins and a
/// terminating zero-bin under `ctx`, then the low `k` bits of `value + 1` as
/// bypass bins.
pub fn write_exp_golomb<E: BinEncoder>(enc: &mut E, ctx: &mut ContextModel, value: u32) {
    let x = value as u64 + 1;
    let k = 63 - x.leading_zeros();
    enc.encode_bins(((1u64 << k) - 1) << 1, k + 1, ctx);
    enc.encode_bins_ep(x, k);
}

pub fn read_exp_golomb<D: BinDecoder>(dec: &mut D, ctx: &mut ContextModel) -> Result<u32> {
    let mut k = 0u32;
    while dec.decode_bin(ctx)? {
        k += 1;
        if k > MAX_EXP_GOLOMB_PREFIX {
            return Err(CodecError::CorruptStream(format!(
                "exp-Golomb prefix longer than {MAX_EXP_GOLOMB_PREFIX} bins"
            )));
        }
    }
    let suffix = dec.decode_bins_ep(k)?;
    Ok((((1u64 << k) | suffix) - 1) as u32)
}

pub fn write_mode<E: BinEncoder>(enc: &mut E, bank: &mut ContextBank, mode: PredictionMode) {
    for (depth, &bin) in mode.bins().iter().enumerate() {
        enc.encode_bin(bin, bank.mode_bin(depth));
    }
}

pub fn read_mode<D: BinDecoder>(dec: &mut D, bank: &mut ContextBank) -> Result<PredictionMode> {
    let mut ones = 0;
    while ones < MODE_CTX_COUNT && dec.decode_bin(bank.mode_bin(ones))? {
        ones += 1;
    }
    Ok(PredictionMode::ALL[ones])
}

/// Codes one quantization index at `scan_pos`. The last significant level is
/// known to be nonzero, so it skips the significance flag.
///
/// Panics if `is_last` is set for a zero level.
pub fn write_level<E: BinEncoder>(
    enc: &mut E,
    bank: &mut ContextBank,
    level: i32,
    scan_pos: usize,
    is_last: bool,
) {
    bank.switch_context(scan_pos);
    if level == 0 {
        assert!(!is_last, "zero level coded as the last significant coefficient");
        enc.encode_bin(false, bank.sig_flag());
        return;
    }
    if !is_last {
        enc.encode_bin(true, bank.sig_flag());
    }

    let magnitude = level.unsigned_abs();
    enc.encode_bin(magnitude > 1, bank.gt1_flag());
    if magnitude > 1 {
        write_exp_golomb(enc, bank.level_prefix(), magnitude - 2);
    }
    enc.encode_bin_ep(level > 0);
}

pub fn read_level<D: BinDecoder>(
    dec: &mut D,
    bank: &mut ContextBank,
    scan_pos: usize,
    is_last: bool,
) -> Result<i32> {
    bank.switch_context(scan_pos);
    if !is_last && !dec.decode_bin(bank.sig_flag())? {
        return Ok(0);
    }

    let magnitude = if dec.decode_bin(bank.gt1_flag())? {
        read_exp_golomb(dec, bank.level_prefix())? as i64 + 2
    } else {
        1
    };
    let magnitude = i32::try_from(magnitude).map_err(|_| {
        CodecError::CorruptStream(format!("coefficient level {magnitude} out of range"))
    })?;
    Ok(if dec.decode_bin_ep()? { magnitude } else { -magnitude })
}

/// Writes a whole block. `levels` are in scan order and must hold exactly
/// `bank.positions()` entries.
pub fn write_block<E: BinEncoder>(
    enc: &mut E,
    bank: &mut ContextBank,
    mode: PredictionMode,
    levels: &[i32],
) {
    assert_eq!(levels.len(), bank.positions(), "level count does not match block size");

    write_mode(enc, bank, mode);

    let last = levels.iter().rposition(|&l| l != 0);
    enc.encode_bin(last.is_some(), bank.coded_block_flag());
    let Some(last) = last else {
        return;
    };

    write_exp_golomb(enc, bank.last_prefix(), last as u32);
    write_level(enc, bank, levels[last], last, true);
    for pos in (0..last).rev() {
        write_level(enc, bank, levels[pos], pos, false);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlock {
    pub mode: PredictionMode,
    /// Quantization indices in scan order.
    pub levels: Vec<i32>,
}

pub fn read_block<D: BinDecoder>(dec: &mut D, bank: &mut ContextBank) -> Result<DecodedBlock> {
    let mode = read_mode(dec, bank)?;
    let positions = bank.positions();
    let mut levels = vec![0i32; positions];

    if !dec.decode_bin(bank.coded_block_flag())? {
        return Ok(DecodedBlock { mode, levels });
    }

    let last = read_exp_golomb(dec, bank.last_prefix())? as usize;
    if last >= positions {
        return Err(CodecError::CorruptStream(format!(
            "last significant position {last} outside a {positions}-coefficient block"
        )));
    }

    levels[last] = read_level(dec, bank, last, true)?;
    for pos in (0..last).rev() {
        levels[pos] = read_level(dec, bank, pos, false)?;
    }
    Ok(DecodedBlock { mode, levels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msac::{MsacDecoder, MsacEncoder};

    /// Records bins as `(adaptive, bit)` pairs.
    #[derive(Default)]
    struct BinLog {
        bins: Vec<(bool, bool)>,
    }

    impl BinEncoder for BinLog {
        fn encode_bin(&mut self, bit: bool, ctx: &mut ContextModel) {
            ctx.update(bit);
            self.bins.push((true, bit));
        }

        fn encode_bin_ep(&mut self, bit: bool) {
            self.bins.push((false, bit));
        }
    }

    fn exp_golomb_bins(value: u32) -> Vec<(bool, bool)> {
        let mut log = BinLog::default();
        write_exp_golomb(&mut log, &mut ContextModel::default(), value);
        log.bins
    }

    fn lcg(seed: &mut u64) -> u32 {
        *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (*seed >> 33) as u32
    }

    #[test]
    fn exp_golomb_binarization() {
        let a = |b| (true, b);
        let e = |b| (false, b);
        assert_eq!(exp_golomb_bins(0), vec![a(false)]);
        assert_eq!(exp_golomb_bins(1), vec![a(true), a(false), e(false)]);
        assert_eq!(exp_golomb_bins(2), vec![a(true), a(false), e(true)]);
        assert_eq!(
            exp_golomb_bins(4),
            vec![a(true), a(true), a(false), e(false), e(true)]
        );
    }

    #[test]
    fn exp_golomb_is_a_bijection() {
        let mut seed = 7u64;
        let mut values: Vec<u32> = (0..64).collect();
        values.extend((0..400).map(|_| lcg(&mut seed) % (1 << 20)));
        values.push((1 << 20) - 1);

        let mut enc = MsacEncoder::new();
        let mut ctx = ContextModel::default();
        for &v in &values {
            write_exp_golomb(&mut enc, &mut ctx, v);
        }
        let bytes = enc.finalize();

        let mut dec = MsacDecoder::new(&bytes);
        let mut ctx = ContextModel::default();
        for &v in &values {
            assert_eq!(read_exp_golomb(&mut dec, &mut ctx).unwrap(), v);
        }
    }

    #[test]
    fn overlong_prefix_is_corrupt() {
        let mut enc = MsacEncoder::new();
        let mut ctx = ContextModel::default();
        for _ in 0..40 {
            enc.encode_bin(true, &mut ctx);
        }
        let bytes = enc.finalize();

        let mut dec = MsacDecoder::new(&bytes);
        let result = read_exp_golomb(&mut dec, &mut ContextModel::default());
        assert!(matches!(result, Err(CodecError::CorruptStream(_))));
    }

    #[test]
    fn mode_roundtrip() {
        let modes = [
            PredictionMode::Vertical,
            PredictionMode::Planar,
            PredictionMode::Horizontal,
            PredictionMode::Dc,
            PredictionMode::Vertical,
        ];
        let mut enc = MsacEncoder::new();
        let mut bank = ContextBank::new(4);
        for &m in &modes {
            write_mode(&mut enc, &mut bank, m);
        }
        let bytes = enc.finalize();

        let mut dec = MsacDecoder::new(&bytes);
        let mut dec_bank = ContextBank::new(4);
        for &m in &modes {
            assert_eq!(read_mode(&mut dec, &mut dec_bank).unwrap(), m);
        }
        assert_eq!(bank, dec_bank);
    }

    #[test]
    fn empty_block_is_mode_plus_flag() {
        let mut log = BinLog::default();
        let mut bank = ContextBank::new(4);
        write_block(&mut log, &mut bank, PredictionMode::Dc, &[0; 16]);
        assert_eq!(log.bins, vec![(true, true), (true, false), (true, false)]);
    }

    #[test]
    fn last_level_skips_significance_flag() {
        let mut log = BinLog::default();
        let mut bank = ContextBank::new(2);
        write_block(&mut log, &mut bank, PredictionMode::Planar, &[1, 0, 0, 0]);
        // mode, cbf, last = 0, gt1 = 0, sign
        assert_eq!(
            log.bins,
            vec![(true, false), (true, true), (true, false), (true, false), (false, true)]
        );
    }

    #[test]
    #[should_panic(expected = "last significant")]
    fn zero_last_level_panics() {
        let mut log = BinLog::default();
        let mut bank = ContextBank::new(2);
        write_level(&mut log, &mut bank, 0, 3, true);
    }

    #[test]
    fn block_roundtrip() {
        let mut seed = 99u64;
        let blocks: Vec<(PredictionMode, Vec<i32>)> = (0..30)
            .map(|i| {
                let mode = PredictionMode::ALL[i % 4];
                let levels = (0..64)
                    .map(|pos| {
                        let r = lcg(&mut seed);
                        if pos > 20 || r % 3 != 0 {
                            0
                        } else {
                            (r % 41) as i32 - 20
                        }
                    })
                    .collect();
                (mode, levels)
            })
            .collect();

        let mut enc = MsacEncoder::new();
        let mut bank = ContextBank::new(8);
        for (mode, levels) in &blocks {
            write_block(&mut enc, &mut bank, *mode, levels);
        }
        let bytes = enc.finalize();

        let mut dec = MsacDecoder::new(&bytes);
        let mut dec_bank = ContextBank::new(8);
        for (i, (mode, levels)) in blocks.iter().enumerate() {
            let block = read_block(&mut dec, &mut dec_bank).unwrap();
            assert_eq!(block.mode, *mode, "mode mismatch in block {i}");
            assert_eq!(&block.levels, levels, "levels mismatch in block {i}");
        }
        assert_eq!(bank, dec_bank);
    }

    #[test]
    fn large_levels_roundtrip() {
        let mut levels = vec![0i32; 16];
        levels[0] = 16320;
        levels[5] = -4000;
        levels[15] = 2;

        let mut enc = MsacEncoder::new();
        write_block(&mut enc, &mut ContextBank::new(4), PredictionMode::Dc, &levels);
        let bytes = enc.finalize();

        let block = read_block(&mut MsacDecoder::new(&bytes), &mut ContextBank::new(4)).unwrap();
        assert_eq!(block.levels, levels);
    }

    #[test]
    fn last_position_past_block_is_corrupt() {
        let mut enc = MsacEncoder::new();
        let mut bank = ContextBank::new(2);
        write_mode(&mut enc, &mut bank, PredictionMode::Planar);
        enc.encode_bin(true, bank.coded_block_flag());
        write_exp_golomb(&mut enc, bank.last_prefix(), 9);
        let bytes = enc.finalize();

        let result = read_block(&mut MsacDecoder::new(&bytes), &mut ContextBank::new(2));
        assert!(matches!(result, Err(CodecError::CorruptStream(_))));
    }
}
