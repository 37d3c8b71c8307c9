//! Version 1 streams: every block is coded against a flat mid-grey
//! prediction and stores its row-major quantization indices as one signed
//! byte each. Blocks are laid out column by column, so the payload splits
//! into independent block columns that decode in parallel.

use rayon::prelude::*;

use crate::block::BlockPipeline;
use crate::error::{CodecError, Result};
use crate::header::StreamHeader;
use crate::plane::Plane;

const FLAT_PREDICTION: u8 = 128;

/// Codes a padded plane. Returns the payload and the padded reconstruction.
pub fn encode(source: &Plane, header: &StreamHeader, pipeline: &BlockPipeline) -> (Vec<u8>, Plane) {
    let n = pipeline.block_size();
    let flat = vec![FLAT_PREDICTION; n * n];
    let mut payload = Vec::with_capacity(header.block_count() * n * n);
    let mut recon = Plane::new(source.width, source.height);

    for bx in 0..header.blocks_x as usize {
        for by in 0..header.blocks_y as usize {
            let (x, y) = (bx * n, by * n);
            let levels: Vec<i32> = pipeline
                .quantize_residual(&source.block(x, y, n), &flat)
                .into_iter()
                .map(|l| l.clamp(i8::MIN as i32, i8::MAX as i32))
                .collect();
            payload.extend(levels.iter().map(|&l| l as i8 as u8));
            recon.put_block(x, y, n, &pipeline.reconstruct(&levels, &flat));
        }
    }
    (payload, recon)
}

fn decode_column(pipeline: &BlockPipeline, column: &[u8]) -> Vec<Vec<u8>> {
    let n = pipeline.block_size();
    let flat = vec![FLAT_PREDICTION; n * n];
    column
        .chunks(n * n)
        .map(|block| {
            let levels: Vec<i32> = block.iter().map(|&b| b as i8 as i32).collect();
            pipeline.reconstruct(&levels, &flat)
        })
        .collect()
}

/// Rebuilds the padded plane. With `parallel` set, block columns are
/// reconstructed on the rayon pool; the output is identical either way.
pub fn decode(header: &StreamHeader, payload: &[u8], parallel: bool) -> Result<Plane> {
    let n = header.block_size as usize;
    let column_len = header.blocks_y as usize * n * n;
    let expected = header.blocks_x as usize * column_len;
    if payload.len() != expected {
        return Err(CodecError::CorruptStream(format!(
            "raw payload holds {} bytes, a {}x{} grid of {n}x{n} blocks needs {expected}",
            payload.len(),
            header.blocks_x,
            header.blocks_y
        )));
    }

    let pipeline = BlockPipeline::new(n, header.qp);
    let columns: Vec<Vec<Vec<u8>>> = if parallel {
        payload
            .par_chunks(column_len)
            .map(|column| decode_column(&pipeline, column))
            .collect()
    } else {
        payload
            .chunks(column_len)
            .map(|column| decode_column(&pipeline, column))
            .collect()
    };

    let mut plane = Plane::new(header.padded_width() as u32, header.padded_height() as u32);
    for (bx, column) in columns.iter().enumerate() {
        for (by, block) in column.iter().enumerate() {
            plane.put_block(bx * n, by * n, n, block);
        }
    }
    Ok(plane)
}
