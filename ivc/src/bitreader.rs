use crate::error::{CodecError, Result};

/// MSB-first bit source, the read side of [`crate::bitwriter::BitWriter`].
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub fn bits_left(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        if self.bit_pos >= self.data.len() * 8 {
            return Err(CodecError::TruncatedStream(format!(
                "bit channel exhausted after {} bits",
                self.bit_pos
            )));
        }
        let byte = self.data[self.bit_pos >> 3];
        let bit = (byte >> (7 - (self.bit_pos & 7))) & 1 == 1;
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn read_bits(&mut self, n: u8) -> Result<u64> {
        debug_assert!(n <= 64);
        if (n as usize) > self.bits_left() {
            return Err(CodecError::TruncatedStream(format!(
                "needed {n} bits, {} left",
                self.bits_left()
            )));
        }
        let mut value = 0u64;
        for _ in 0..n {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        (0..n).map(|_| self.read_bits(8).map(|b| b as u8)).collect()
    }

    /// Unread bytes, starting at the next byte boundary.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.bit_pos.div_ceil(8).min(self.data.len())..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitwriter::BitWriter;

    #[test]
    fn reads_back_mixed_widths() {
        let mut w = BitWriter::new();
        w.write_bits(0b101, 3);
        w.write_bits(0xCAFE, 16);
        w.write_bit(true);
        let bytes = w.finalize();

        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_bits(3).unwrap(), 0b101);
        assert_eq!(r.read_bits(16).unwrap(), 0xCAFE);
        assert!(r.read_bit().unwrap());
    }

    #[test]
    fn exhaustion_is_truncation() {
        let mut r = BitReader::new(&[0xFF]);
        assert_eq!(r.read_bits(8).unwrap(), 0xFF);
        assert!(matches!(r.read_bit(), Err(CodecError::TruncatedStream(_))));
    }

    #[test]
    fn oversized_read_fails_without_consuming() {
        let mut r = BitReader::new(&[0x12]);
        assert!(r.read_bits(9).is_err());
        assert_eq!(r.bits_left(), 8);
    }

    #[test]
    fn remaining_starts_at_next_byte() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut r = BitReader::new(&data);
        r.read_bits(4).unwrap();
        assert_eq!(r.remaining(), &[0xBB, 0xCC]);
        r.read_bits(4).unwrap();
        assert_eq!(r.remaining(), &[0xBB, 0xCC]);
    }
}
