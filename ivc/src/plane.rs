use crate::error::{CodecError, Result};

pub const MAX_DIMENSION: u32 = u16::MAX as u32;

/// A single 8-bit sample plane, row-major with `stride == width`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<u8>,
}

impl Plane {
    pub fn new(width: u32, height: u32) -> Self {
        Self::solid(width, height, 0)
    }

    pub fn solid(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            samples: vec![value; width as usize * height as usize],
        }
    }

    pub fn from_samples(width: u32, height: u32, samples: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        if samples.len() != (width as usize) * (height as usize) {
            return Err(CodecError::InvalidConfig(format!(
                "{} samples do not fill a {width}x{height} plane",
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    #[inline]
    pub fn sample(&self, x: usize, y: usize) -> u8 {
        self.samples[y * self.width as usize + x]
    }

    /// Extends the plane to a multiple of `block_size` in both directions by
    /// replicating the last column and row.
    pub fn padded(&self, block_size: usize) -> Plane {
        let width = (self.width as usize).next_multiple_of(block_size);
        let height = (self.height as usize).next_multiple_of(block_size);
        if width == self.width as usize && height == self.height as usize {
            return self.clone();
        }

        let src_w = self.width as usize;
        let src_h = self.height as usize;
        let mut samples = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &self.samples[y.min(src_h - 1) * src_w..][..src_w];
            samples.extend_from_slice(row);
            samples.resize(samples.len() + (width - src_w), row[src_w - 1]);
        }
        Plane {
            width: width as u32,
            height: height as u32,
            samples,
        }
    }

    pub fn cropped(&self, width: u32, height: u32) -> Plane {
        debug_assert!(width <= self.width && height <= self.height);
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut samples = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height as usize {
            let start = y * self.width as usize;
            samples.extend_from_slice(&self.samples[start..start + width as usize]);
        }
        Plane {
            width,
            height,
            samples,
        }
    }

    pub fn block(&self, x: usize, y: usize, n: usize) -> Vec<u8> {
        let stride = self.width as usize;
        let mut out = Vec::with_capacity(n * n);
        for r in 0..n {
            let start = (y + r) * stride + x;
            out.extend_from_slice(&self.samples[start..start + n]);
        }
        out
    }

    pub fn put_block(&mut self, x: usize, y: usize, n: usize, block: &[u8]) {
        let stride = self.width as usize;
        for r in 0..n {
            let start = (y + r) * stride + x;
            self.samples[start..start + n].copy_from_slice(&block[r * n..(r + 1) * n]);
        }
    }
}

pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if !(1..=MAX_DIMENSION).contains(&width) || !(1..=MAX_DIMENSION).contains(&height) {
        return Err(CodecError::InvalidDimensions { width, height });
    }
    Ok(())
}
