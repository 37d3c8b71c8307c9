#![forbid(unsafe_code)]

pub mod bitreader;
pub mod bitwriter;
pub mod block;
pub mod coef;
pub mod context;
pub mod dct;
pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod estimate;
pub mod header;
pub mod msac;
pub mod pgm;
pub mod plane;
pub mod predict;
pub mod raw;
pub mod rdo;
pub mod scan;

pub use decoder::{DecodeConfig, Decoder};
pub use encoder::{EncodeStats, Encoded, Encoder};
pub use error::{CodecError, Result};
pub use header::{StreamHeader, StreamVersion};
pub use plane::Plane;
pub use predict::PredictionMode;

pub const DEFAULT_BLOCK_SIZE: u16 = 8;
pub const DEFAULT_QP: u8 = 24;

/// How the encoder picks a prediction mode per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeDecision {
    /// Lagrangian search over every mode.
    RateDistortion,
    Fixed(PredictionMode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeConfig {
    pub block_size: u16,
    pub qp: u8,
    /// Overrides the QP-derived Lagrange multiplier.
    pub lambda: Option<f64>,
    pub mode_decision: ModeDecision,
    pub version: StreamVersion,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            qp: DEFAULT_QP,
            lambda: None,
            mode_decision: ModeDecision::RateDistortion,
            version: StreamVersion::Coded,
        }
    }
}

pub fn encode(image: &Plane, config: &EncodeConfig) -> Result<Vec<u8>> {
    Ok(Encoder::new(config.clone())?.encode(image)?.bitstream)
}

pub fn decode(data: &[u8]) -> Result<Plane> {
    Decoder::default().decode(data)
}
