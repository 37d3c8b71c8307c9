//! Greyscale PGM I/O. Reads binary `P5` and ASCII `P2` with comments and a
//! maxval of 255; always writes `P5`.

use std::path::Path;

use crate::error::{CodecError, Result};
use crate::plane::Plane;

struct Tokens<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn skip_space_and_comments(&mut self) {
        while self.pos < self.data.len() {
            match self.data[self.pos] {
                b'#' => {
                    while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b if b.is_ascii_whitespace() => self.pos += 1,
                _ => break,
            }
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str> {
        self.skip_space_and_comments();
        let start = self.pos;
        while self.pos < self.data.len() && !self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(CodecError::Pgm(format!("missing {what}")));
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| CodecError::Pgm(format!("{what} is not ASCII")))
    }

    fn number(&mut self, what: &str) -> Result<u32> {
        let token = self.next(what)?;
        token
            .parse()
            .map_err(|_| CodecError::Pgm(format!("invalid {what} '{token}'")))
    }
}

impl Plane {
    pub fn from_pgm(data: &[u8]) -> Result<Self> {
        let mut tokens = Tokens::new(data);
        let magic = tokens.next("magic")?;
        let binary = match magic {
            "P5" => true,
            "P2" => false,
            other => return Err(CodecError::Pgm(format!("unsupported magic '{other}'"))),
        };
        let width = tokens.number("width")?;
        let height = tokens.number("height")?;
        let maxval = tokens.number("maxval")?;
        if maxval != 255 {
            return Err(CodecError::Pgm(format!("maxval {maxval} is not 255")));
        }
        let count = width as usize * height as usize;

        let samples = if binary {
            // Exactly one whitespace byte separates the header from the raster.
            let start = tokens.pos + 1;
            let end = start + count;
            if end > data.len() {
                return Err(CodecError::Pgm(format!(
                    "raster holds {} bytes, expected {count}",
                    data.len().saturating_sub(start)
                )));
            }
            data[start..end].to_vec()
        } else {
            (0..count)
                .map(|_| {
                    let v = tokens.number("sample")?;
                    u8::try_from(v).map_err(|_| CodecError::Pgm(format!("sample {v} exceeds maxval")))
                })
                .collect::<Result<Vec<u8>>>()?
        };

        Plane::from_samples(width, height, samples)
    }

    pub fn to_pgm(&self) -> Vec<u8> {
        let mut out = format!("P5\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.samples);
        out
    }

    pub fn read_pgm(path: &Path) -> Result<Self> {
        Self::from_pgm(&std::fs::read(path)?)
    }

    pub fn write_pgm(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_pgm())?;
        Ok(())
    }
}
