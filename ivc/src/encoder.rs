use log::{debug, info, trace};

use crate::bitwriter::BitWriter;
use crate::block::BlockPipeline;
use crate::coef;
use crate::context::{BIT_COST_SCALE, ContextBank};
use crate::error::{CodecError, Result};
use crate::header::{self, HEADER_LEN, StreamHeader, StreamVersion};
use crate::msac::MsacEncoder;
use crate::plane::{self, Plane};
use crate::raw;
use crate::rdo::{self, ModeCandidate};
use crate::{EncodeConfig, ModeDecision};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeStats {
    /// Ideal cost of every committed bin, in bits. Zero for raw streams.
    pub estimated_bits: f64,
    pub payload_bits: u64,
    /// Blocks coded with each mode, indexed by [`PredictionMode::index`](crate::PredictionMode::index).
    pub mode_counts: [u32; 4],
}

#[derive(Debug, Clone)]
pub struct Encoded {
    pub bitstream: Vec<u8>,
    /// What a decoder will reconstruct, cropped to the source dimensions.
    pub reconstruction: Plane,
    pub stats: EncodeStats,
}

#[derive(Debug)]
pub struct Encoder {
    config: EncodeConfig,
    lambda: f64,
}

impl Encoder {
    pub fn new(config: EncodeConfig) -> Result<Self> {
        if !header::is_valid_block_size(config.block_size) {
            return Err(CodecError::InvalidConfig(format!(
                "block size {} is not a power of two in {}..={}",
                config.block_size,
                header::MIN_BLOCK_SIZE,
                header::MAX_BLOCK_SIZE
            )));
        }
        let lambda = config.lambda.unwrap_or_else(|| rdo::default_lambda(config.qp));
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(CodecError::InvalidConfig(format!(
                "lambda must be finite and non-negative, got {lambda}"
            )));
        }

        debug!(
            "encoder: {:?} format, block {}, qp {}, lambda {:.3}, {:?}",
            config.version, config.block_size, config.qp, lambda, config.mode_decision
        );
        Ok(Self { config, lambda })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn encode(&self, image: &Plane) -> Result<Encoded> {
        plane::check_dimensions(image.width, image.height)?;
        let mut header = StreamHeader::new(
            self.config.version,
            image.width,
            image.height,
            self.config.block_size,
            self.config.qp,
        )?;
        let n = self.config.block_size as usize;
        let pipeline = BlockPipeline::new(n, self.config.qp);
        let source = image.padded(n);
        debug!(
            "{}x{} image, padded to {}x{}, {}x{} blocks",
            image.width, image.height, source.width, source.height, header.blocks_x, header.blocks_y
        );

        let (payload, recon, mut stats) = match self.config.version {
            StreamVersion::Coded => self.encode_coded(&source, &header, &pipeline),
            StreamVersion::Raw => {
                let (payload, recon) = raw::encode(&source, &header, &pipeline);
                (payload, recon, EncodeStats::default())
            }
        };

        header.payload_len = u32::try_from(payload.len()).map_err(|_| {
            CodecError::InvalidConfig(format!("payload of {} bytes exceeds the header limit", payload.len()))
        })?;
        stats.payload_bits = payload.len() as u64 * 8;

        let mut w = BitWriter::new();
        header.write(&mut w);
        debug_assert_eq!(w.bits_written(), HEADER_LEN as u64 * 8);
        w.write_bytes(&payload);
        let bitstream = w.finalize();

        if self.config.version == StreamVersion::Coded {
            info!(
                "estimated {:.1} bits, wrote {} payload bits ({} bytes total)",
                stats.estimated_bits,
                stats.payload_bits,
                bitstream.len()
            );
        } else {
            info!("wrote {} payload bits ({} bytes total)", stats.payload_bits, bitstream.len());
        }

        Ok(Encoded {
            bitstream,
            reconstruction: recon.cropped(image.width, image.height),
            stats,
        })
    }

    fn choose(
        &self,
        pipeline: &BlockPipeline,
        recon: &Plane,
        bank: &ContextBank,
        pos: (usize, usize),
        block: &[u8],
    ) -> ModeCandidate {
        match self.config.mode_decision {
            ModeDecision::RateDistortion => rdo::select_mode(pipeline, recon, bank, pos, block, self.lambda),
            ModeDecision::Fixed(mode) => {
                rdo::evaluate_mode(pipeline, recon, bank, pos, block, mode, self.lambda)
            }
        }
    }

    fn encode_coded(
        &self,
        source: &Plane,
        header: &StreamHeader,
        pipeline: &BlockPipeline,
    ) -> (Vec<u8>, Plane, EncodeStats) {
        let n = pipeline.block_size();
        let mut recon = Plane::new(source.width, source.height);
        let mut bank = ContextBank::new(n);
        let mut msac = MsacEncoder::new();
        let mut stats = EncodeStats::default();
        let mut estimated = 0u64;

        for by in 0..header.blocks_y as usize {
            for bx in 0..header.blocks_x as usize {
                let pos = (bx * n, by * n);
                let block = source.block(pos.0, pos.1, n);
                let best = self.choose(pipeline, &recon, &bank, pos, &block);
                trace!(
                    "block ({bx}, {by}): {} D={} R={:.2} J={:.2}",
                    best.block.mode.name(),
                    best.block.distortion,
                    best.rate as f64 / BIT_COST_SCALE as f64,
                    best.cost
                );

                // The candidate was priced on this exact context state, so its
                // rate is the ideal cost of what gets committed below.
                estimated += best.rate;
                stats.mode_counts[best.block.mode.index()] += 1;
                coef::write_block(&mut msac, &mut bank, best.block.mode, &best.block.levels);
                recon.put_block(pos.0, pos.1, n, &best.block.reconstruction);
            }
        }

        stats.estimated_bits = estimated as f64 / BIT_COST_SCALE as f64;
        (msac.finalize(), recon, stats)
    }
}
