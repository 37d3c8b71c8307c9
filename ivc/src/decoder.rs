use log::{debug, trace};

use crate::block::BlockPipeline;
use crate::coef;
use crate::context::ContextBank;
use crate::error::{CodecError, Result};
use crate::header::{StreamHeader, StreamVersion};
use crate::msac::{MsacDecoder, MsacEncoder};
use crate::plane::Plane;
use crate::raw;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Reconstruct raw-format block columns on the rayon pool. Coded streams
    /// always decode sequentially.
    pub parallel: bool,
}

#[derive(Debug, Default)]
pub struct Decoder {
    config: DecodeConfig,
}

impl Decoder {
    pub fn new(config: DecodeConfig) -> Self {
        Self { config }
    }

    pub fn decode(&self, data: &[u8]) -> Result<Plane> {
        let (header, payload) = StreamHeader::parse(data)?;
        debug!(
            "{:?} stream: {}x{}, block {}, {}x{} blocks, qp {}, {} payload bytes",
            header.version,
            header.width,
            header.height,
            header.block_size,
            header.blocks_x,
            header.blocks_y,
            header.qp,
            header.payload_len
        );

        let padded = match header.version {
            StreamVersion::Coded => decode_coded(&header, payload)?,
            StreamVersion::Raw => raw::decode(&header, payload, self.config.parallel)?,
        };
        Ok(padded.cropped(header.width as u32, header.height as u32))
    }
}

/// Upper bound on coded blocks per payload byte. Every block spends at least
/// two adaptive bins, and an adaptive bin narrows the 16-bit coder range by
/// at least 4, so a block costs more than 1/6000 bit.
const MAX_BLOCKS_PER_PAYLOAD_BYTE: usize = 1 << 16;

/// Payload bytes a legitimate stream may be short of that bound, covering the
/// coder's flush.
const PAYLOAD_SLACK_BYTES: usize = 4;

fn decode_coded(header: &StreamHeader, payload: &[u8]) -> Result<Plane> {
    let max_blocks = (payload.len() + PAYLOAD_SLACK_BYTES).saturating_mul(MAX_BLOCKS_PER_PAYLOAD_BYTE);
    if header.block_count() > max_blocks {
        return Err(CodecError::CorruptStream(format!(
            "{} payload bytes cannot hold {} coded blocks",
            payload.len(),
            header.block_count()
        )));
    }

    let n = header.block_size as usize;
    let pipeline = BlockPipeline::new(n, header.qp);
    let mut recon = Plane::new(header.padded_width() as u32, header.padded_height() as u32);
    let mut bank = ContextBank::new(n);
    let mut dec = MsacDecoder::new(payload);

    // Re-coding the decoded syntax must give back the payload byte for byte.
    // Symbols resolved from read-ahead past a cut payload re-code longer.
    let mut replay_bank = ContextBank::new(n);
    let mut replay = MsacEncoder::new();

    for by in 0..header.blocks_y as usize {
        for bx in 0..header.blocks_x as usize {
            let block = coef::read_block(&mut dec, &mut bank)?;
            trace!("block ({bx}, {by}): {}", block.mode.name());
            coef::write_block(&mut replay, &mut replay_bank, block.mode, &block.levels);
            let samples = pipeline.decode_block(&recon, bx * n, by * n, block.mode, &block.levels);
            recon.put_block(bx * n, by * n, n, &samples);
        }
    }

    check_payload_consumed(payload, &replay.finalize())?;
    Ok(recon)
}

fn check_payload_consumed(payload: &[u8], recoded: &[u8]) -> Result<()> {
    if recoded.len() > payload.len() {
        return Err(CodecError::TruncatedStream(format!(
            "decoded blocks need {} payload bytes, {} present",
            recoded.len(),
            payload.len()
        )));
    }
    if recoded != payload {
        return Err(CodecError::CorruptStream(format!(
            "{}-byte payload does not match the {} bytes its blocks code to",
            payload.len(),
            recoded.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_LEN;
    use crate::{EncodeConfig, Encoder};

    fn checker(width: u32, height: u32) -> Plane {
        let samples = (0..width * height)
            .map(|i| if ((i % width) / 3 + (i / width) / 3) % 2 == 0 { 40 } else { 210 })
            .collect();
        Plane::from_samples(width, height, samples).unwrap()
    }

    #[test]
    fn decode_matches_encoder_reconstruction() {
        let image = checker(30, 18);
        let out = Encoder::new(EncodeConfig::default()).unwrap().encode(&image).unwrap();
        let decoded = Decoder::default().decode(&out.bitstream).unwrap();
        assert_eq!(decoded, out.reconstruction);
    }

    #[test]
    fn parallel_flag_does_not_change_coded_output() {
        let image = checker(16, 16);
        let out = Encoder::new(EncodeConfig::default()).unwrap().encode(&image).unwrap();
        let seq = Decoder::new(DecodeConfig { parallel: false }).decode(&out.bitstream).unwrap();
        let par = Decoder::new(DecodeConfig { parallel: true }).decode(&out.bitstream).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn truncated_payload_is_reported() {
        let image = checker(32, 32);
        let out = Encoder::new(EncodeConfig::default()).unwrap().encode(&image).unwrap();
        let cut = &out.bitstream[..out.bitstream.len() - 1];
        assert!(matches!(
            Decoder::default().decode(cut),
            Err(CodecError::TruncatedStream(_))
        ));
    }

    #[test]
    fn payload_cut_by_a_few_bytes_is_reported() {
        let image = checker(64, 64);
        let out = Encoder::new(EncodeConfig::default()).unwrap().encode(&image).unwrap();
        let (header, payload) = StreamHeader::parse(&out.bitstream).unwrap();
        for cut in 1..=12 {
            let mut short = header.clone();
            short.payload_len -= cut as u32;
            let mut stream = short.to_bytes();
            stream.extend_from_slice(&payload[..payload.len() - cut]);
            let result = Decoder::default().decode(&stream);
            assert!(
                matches!(
                    result,
                    Err(CodecError::TruncatedStream(_) | CodecError::CorruptStream(_))
                ),
                "cut {cut}: {result:?}"
            );
        }
    }

    #[test]
    fn trailing_payload_bytes_are_corrupt() {
        let image = checker(16, 16);
        let out = Encoder::new(EncodeConfig::default()).unwrap().encode(&image).unwrap();
        let (mut header, payload) = StreamHeader::parse(&out.bitstream).unwrap();
        header.payload_len += 3;
        let mut stream = header.to_bytes();
        stream.extend_from_slice(payload);
        stream.extend_from_slice(&[0x5A, 0xA5, 0x5A]);
        assert!(matches!(
            Decoder::default().decode(&stream),
            Err(CodecError::CorruptStream(_))
        ));
    }

    #[test]
    fn huge_grid_with_empty_payload_is_rejected() {
        let header = StreamHeader::new(StreamVersion::Coded, 65535, 65535, 64, 24).unwrap();
        assert!(matches!(
            Decoder::default().decode(&header.to_bytes()),
            Err(CodecError::CorruptStream(_))
        ));
    }

    #[test]
    fn recoded_payload_mismatch_is_classified() {
        assert!(check_payload_consumed(&[1, 2, 3], &[1, 2, 3]).is_ok());
        assert!(matches!(
            check_payload_consumed(&[1, 2], &[1, 2, 3]),
            Err(CodecError::TruncatedStream(_))
        ));
        assert!(matches!(
            check_payload_consumed(&[1, 2, 4], &[1, 2, 3]),
            Err(CodecError::CorruptStream(_))
        ));
    }

    #[test]
    fn header_only_stream_with_missing_payload_fails() {
        let image = checker(8, 8);
        let out = Encoder::new(EncodeConfig::default()).unwrap().encode(&image).unwrap();
        assert!(Decoder::default().decode(&out.bitstream[..HEADER_LEN]).is_err());
    }
}
