//! Bin-level coding interface shared by the arithmetic coder and the cost
//! estimator. The coefficient syntax is written once against these traits.

use crate::context::ContextModel;
use crate::error::Result;

pub trait BinEncoder {
    /// Codes one adaptive bin and adapts `ctx`.
    fn encode_bin(&mut self, bit: bool, ctx: &mut ContextModel);

    /// Codes one equiprobable bin.
    fn encode_bin_ep(&mut self, bit: bool);

    /// Codes the low `count` bits of `value`, MSB first, all under `ctx`.
    fn encode_bins(&mut self, value: u64, count: u32, ctx: &mut ContextModel) {
        for i in (0..count).rev() {
            self.encode_bin((value >> i) & 1 == 1, ctx);
        }
    }

    /// Codes the low `count` bits of `value`, MSB first, as bypass bins.
    fn encode_bins_ep(&mut self, value: u64, count: u32) {
        for i in (0..count).rev() {
            self.encode_bin_ep((value >> i) & 1 == 1);
        }
    }
}

pub trait BinDecoder {
    fn decode_bin(&mut self, ctx: &mut ContextModel) -> Result<bool>;

    fn decode_bin_ep(&mut self) -> Result<bool>;

    fn decode_bins_ep(&mut self, count: u32) -> Result<u64> {
        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | self.decode_bin_ep()? as u64;
        }
        Ok(value)
    }
}
