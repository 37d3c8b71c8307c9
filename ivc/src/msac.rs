use crate::context::ContextModel;
use crate::engine::{BinDecoder, BinEncoder};
use crate::error::{CodecError, Result};

const EC_PROB_SHIFT: u32 = 6;
const EC_MIN_PROB: u32 = 4;

/// Padding the decoder may read past the payload end while finishing the
/// last symbols. Anything beyond means the payload was cut short.
const MAX_PAD_BYTES: usize = 16;

type EcWindow = u32;

pub struct MsacEncoder {
    low: EcWindow,
    rng: u16,
    cnt: i16,
    precarry: Vec<u16>,
}

impl MsacEncoder {
    pub fn new() -> Self {
        Self {
            low: 0,
            rng: 0x8000,
            cnt: -9,
            precarry: Vec::new(),
        }
    }

    fn compute_bounds(&self, fl: u16, fh: u16, nms: u16) -> (EcWindow, u16) {
        let r = self.rng as u32;
        let mut u = (((r >> 8) * ((fl as u32) >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT))
            + EC_MIN_PROB * nms as u32;
        if fl >= 32768 {
            u = r;
        }
        let v = (((r >> 8) * ((fh as u32) >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT))
            + EC_MIN_PROB * (nms as u32 - 1);
        ((r - u) as EcWindow, (u - v) as u16)
    }

    fn renormalize(&mut self, l: EcWindow, r: u16) {
        let mut low = l + self.low;
        let mut c = self.cnt;
        let d = r.leading_zeros() as i16;
        let mut s = c + d;

        if s >= 0 {
            c += 16;
            let mut m = ((1u32 << c) - 1) as EcWindow;
            if s >= 8 {
                self.precarry.push((low >> c) as u16);
                low &= m;
                c -= 8;
                m >>= 8;
            }
            self.precarry.push((low >> c) as u16);
            s = c + d - 24;
            low &= m;
        }
        self.low = low << d;
        self.rng = r << d;
        self.cnt = s;
    }

    fn encode_bool_prob(&mut self, val: bool, prob: u16) {
        let nms = if val { 1u16 } else { 2u16 };
        let fl = if val { prob } else { 32768 };
        let fh = if val { 0 } else { prob };
        let (l, r) = self.compute_bounds(fl, fh, nms);
        self.renormalize(l, r);
    }

    fn encode_bool_equi(&mut self, val: bool) {
        let r = self.rng as u32;
        let v = (((r >> 8) << 7) + EC_MIN_PROB) as u16;

        let (l, new_rng): (EcWindow, u16) = if val {
            ((r - v as u32) as EcWindow, v)
        } else {
            (0, r as u16 - v)
        };
        self.renormalize(l, new_rng);
    }

    /// Flushes the coder state and resolves carries into the final payload.
    pub fn finalize(mut self) -> Vec<u8> {
        let l = self.low;
        let mut c = self.cnt;
        let mut s: i16 = 10;
        let m: EcWindow = 0x3FFF;
        let mut e = ((l + m) & !m) | (m + 1);

        s += c;

        if s > 0 {
            let mut n = ((1u32 << (c + 16)) - 1) as EcWindow;

            loop {
                self.precarry.push((e >> (c + 16)) as u16);
                e &= n;
                s -= 8;
                c -= 8;
                n >>= 8;

                if s <= 0 {
                    break;
                }
            }
        }

        let mut carry: u32 = 0;
        let mut offs = self.precarry.len();
        let mut out = vec![0u8; offs];
        while offs > 0 {
            offs -= 1;
            carry += self.precarry[offs] as u32;
            out[offs] = carry as u8;
            carry >>= 8;
        }

        out
    }
}

impl Default for MsacEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BinEncoder for MsacEncoder {
    fn encode_bin(&mut self, bit: bool, ctx: &mut ContextModel) {
        self.encode_bool_prob(bit, ctx.probability());
        ctx.update(bit);
    }

    fn encode_bin_ep(&mut self, bit: bool) {
        self.encode_bool_equi(bit);
    }
}

pub struct MsacDecoder<'a> {
    dif: u64,
    rng: u32,
    cnt: i32,
    buf: &'a [u8],
    pos: usize,
    pad_bytes: usize,
}

impl<'a> MsacDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut dec = Self {
            dif: 0,
            rng: 0x8000,
            cnt: -15,
            buf: data,
            pos: 0,
            pad_bytes: 0,
        };
        dec.refill();
        dec
    }

    fn refill(&mut self) {
        let mut c = 48 - self.cnt - 24;
        let mut dif = self.dif;
        while c >= 0 {
            let byte = if self.pos < self.buf.len() {
                let b = self.buf[self.pos];
                self.pos += 1;
                b ^ 0xFF
            } else {
                self.pad_bytes += 1;
                0xFF
            };
            dif |= (byte as u64) << c;
            c -= 8;
        }
        self.dif = dif;
        self.cnt = 48 - c - 24;
    }

    fn norm(&mut self, dif: u64, rng: u32) {
        let d = rng.leading_zeros() as i32 - 16;
        let cnt = self.cnt;
        self.dif = dif << d;
        self.rng = rng << d;
        self.cnt = cnt - d;
        if (cnt as u32) < (d as u32) {
            self.refill();
        }
    }

    fn split(&mut self, v: u32) -> bool {
        let r = self.rng;
        let dif = self.dif;
        let mut v = v;
        let vw = (v as u64) << 32;
        let ret = dif >= vw;
        let new_dif = if ret { dif - vw } else { dif };
        if ret {
            v = v.wrapping_add(r.wrapping_sub(2u32.wrapping_mul(v)));
        }
        self.norm(new_dif, v);
        !ret
    }

    fn decode_bool(&mut self, f: u32) -> bool {
        let r = self.rng;
        self.split((((r >> 8) * (f >> EC_PROB_SHIFT)) >> (7 - EC_PROB_SHIFT)) + EC_MIN_PROB)
    }

    fn decode_bool_equi(&mut self) -> bool {
        let r = self.rng;
        self.split(((r >> 8) << 7) + EC_MIN_PROB)
    }

    fn check_overrun(&self) -> Result<()> {
        if self.pad_bytes > MAX_PAD_BYTES {
            return Err(CodecError::TruncatedStream(format!(
                "arithmetic decoder ran {} bytes past the {}-byte payload",
                self.pad_bytes,
                self.buf.len()
            )));
        }
        Ok(())
    }
}

impl BinDecoder for MsacDecoder<'_> {
    fn decode_bin(&mut self, ctx: &mut ContextModel) -> Result<bool> {
        let bit = self.decode_bool(ctx.probability() as u32);
        ctx.update(bit);
        self.check_overrun()?;
        Ok(bit)
    }

    fn decode_bin_ep(&mut self) -> Result<bool> {
        let bit = self.decode_bool_equi();
        self.check_overrun()?;
        Ok(bit)
    }
}
