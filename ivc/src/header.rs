//! Fixed 25-byte stream header, all fields big-endian:
//!
//! | bytes | field        |
//! |-------|--------------|
//! | 8     | magic `IVC_SS21` |
//! | 2     | version      |
//! | 2     | block size   |
//! | 2     | blocks_x     |
//! | 2     | blocks_y     |
//! | 1     | qp           |
//! | 2     | width        |
//! | 2     | height       |
//! | 4     | payload length |

use crate::bitreader::BitReader;
use crate::bitwriter::BitWriter;
use crate::error::{CodecError, Result};
use crate::plane;

pub const MAGIC: &[u8; 8] = b"IVC_SS21";
pub const HEADER_LEN: usize = 25;

pub const MIN_BLOCK_SIZE: u16 = 2;
pub const MAX_BLOCK_SIZE: u16 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamVersion {
    /// Independent blocks, flat mid-grey prediction, one byte per level.
    Raw = 1,
    /// Intra prediction with context-adaptive arithmetic coding.
    Coded = 2,
}

impl StreamVersion {
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            1 => Ok(StreamVersion::Raw),
            2 => Ok(StreamVersion::Coded),
            other => Err(CodecError::UnsupportedVersion(other)),
        }
    }
}

pub fn is_valid_block_size(block_size: u16) -> bool {
    block_size.is_power_of_two() && (MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    pub version: StreamVersion,
    pub block_size: u16,
    pub blocks_x: u16,
    pub blocks_y: u16,
    pub qp: u8,
    pub width: u16,
    pub height: u16,
    pub payload_len: u32,
}

impl StreamHeader {
    /// Header for an image of `width x height`, with the block grid derived
    /// from the dimensions. `payload_len` starts at zero.
    pub fn new(version: StreamVersion, width: u32, height: u32, block_size: u16, qp: u8) -> Result<Self> {
        plane::check_dimensions(width, height)?;
        if !is_valid_block_size(block_size) {
            return Err(CodecError::InvalidConfig(format!(
                "block size {block_size} is not a power of two in {MIN_BLOCK_SIZE}..={MAX_BLOCK_SIZE}"
            )));
        }
        let bs = block_size as u32;
        Ok(Self {
            version,
            block_size,
            blocks_x: width.div_ceil(bs) as u16,
            blocks_y: height.div_ceil(bs) as u16,
            qp,
            width: width as u16,
            height: height as u16,
            payload_len: 0,
        })
    }

    pub fn padded_width(&self) -> usize {
        self.blocks_x as usize * self.block_size as usize
    }

    pub fn padded_height(&self) -> usize {
        self.blocks_y as usize * self.block_size as usize
    }

    pub fn block_count(&self) -> usize {
        self.blocks_x as usize * self.blocks_y as usize
    }

    pub fn write(&self, w: &mut BitWriter) {
        w.write_bytes(MAGIC);
        w.write_bits(self.version as u64, 16);
        w.write_bits(self.block_size as u64, 16);
        w.write_bits(self.blocks_x as u64, 16);
        w.write_bits(self.blocks_y as u64, 16);
        w.write_bits(self.qp as u64, 8);
        w.write_bits(self.width as u64, 16);
        w.write_bits(self.height as u64, 16);
        w.write_bits(self.payload_len as u64, 32);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = BitWriter::new();
        self.write(&mut w);
        w.finalize()
    }

    /// Parses and validates a header, returning it with exactly its payload.
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8])> {
        let tag_len = data.len().min(MAGIC.len());
        if data[..tag_len] != MAGIC[..tag_len] {
            return Err(CodecError::BadMagic);
        }

        let mut r = BitReader::new(data);
        r.read_bytes(MAGIC.len())?;
        let version = StreamVersion::from_u16(r.read_bits(16)? as u16)?;
        let header = Self {
            version,
            block_size: r.read_bits(16)? as u16,
            blocks_x: r.read_bits(16)? as u16,
            blocks_y: r.read_bits(16)? as u16,
            qp: r.read_bits(8)? as u8,
            width: r.read_bits(16)? as u16,
            height: r.read_bits(16)? as u16,
            payload_len: r.read_bits(32)? as u32,
        };
        header.validate()?;

        let rest = r.remaining();
        let len = header.payload_len as usize;
        if rest.len() < len {
            return Err(CodecError::TruncatedStream(format!(
                "header announces {len} payload bytes, {} present",
                rest.len()
            )));
        }
        Ok((header, &rest[..len]))
    }

    fn validate(&self) -> Result<()> {
        if !is_valid_block_size(self.block_size) {
            return Err(CodecError::InvalidHeader(format!(
                "block size {} is not a power of two in {MIN_BLOCK_SIZE}..={MAX_BLOCK_SIZE}",
                self.block_size
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CodecError::InvalidHeader(format!(
                "empty image {}x{}",
                self.width, self.height
            )));
        }
        let bs = self.block_size as u32;
        let expected = (
            (self.width as u32).div_ceil(bs),
            (self.height as u32).div_ceil(bs),
        );
        if expected != (self.blocks_x as u32, self.blocks_y as u32) {
            return Err(CodecError::InvalidHeader(format!(
                "{}x{} block grid does not cover {}x{} with {}-sample blocks",
                self.blocks_x, self.blocks_y, self.width, self.height, self.block_size
            )));
        }
        Ok(())
    }
}
