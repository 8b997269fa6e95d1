//! Decoding of raster chunks into sample values
//!
//! Strips and tiles share the same pipeline: decompress, split into samples
//! in the file's byte order, then undo horizontal differencing.

use std::collections::BTreeMap;
use std::io::Cursor;

use log::warn;

use crate::compression::CompressionHandler;
use crate::errors::{QaError, QaResult};
use crate::io::byte_order::ByteOrderHandler;
use crate::qa::schema::RasterValue;
use crate::tiff::constants::predictor;

/// Largest decompressed to stored size ratio accepted for compressed chunks
const MAX_COMPRESSION_RATIO: u64 = 1 << 16;

/// Row-major grid of raw sample values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGrid {
    pub width: usize,
    pub height: usize,
    pub values: Vec<RasterValue>,
}

impl SampleGrid {
    /// Creates a zero-filled grid
    ///
    /// Fails instead of aborting when the grid cannot be allocated.
    pub fn new(width: usize, height: usize) -> QaResult<Self> {
        let invalid = |reason: String| QaError::InvalidDimensions {
            width: width as u64,
            height: height as u64,
            reason,
        };

        let len = width.checked_mul(height)
            .filter(|len| len.checked_mul(std::mem::size_of::<RasterValue>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize))
            .ok_or_else(|| invalid("sample count overflows".to_string()))?;

        let mut values = Vec::new();
        values.try_reserve_exact(len)
            .map_err(|e| invalid(format!("cannot allocate {} samples: {}", len, e)))?;
        values.resize(len, 0);

        Ok(SampleGrid { width, height, values })
    }

    /// Wraps existing row-major values
    pub fn from_values(width: usize, values: Vec<RasterValue>) -> Self {
        let height = if width == 0 { 0 } else { values.len() / width };
        SampleGrid { width, height, values }
    }

    /// Copies a decoded chunk into the grid, clipping at the image edges
    ///
    /// # Arguments
    /// * `chunk` - Decoded samples, `chunk_width` per row
    /// * `chunk_width` - Row length of the chunk
    /// * `x0` - Grid column of the chunk's first sample
    /// * `y0` - Grid row of the chunk's first row
    pub fn place(&mut self, chunk: &[RasterValue], chunk_width: usize, x0: usize, y0: usize) {
        if chunk_width == 0 {
            return;
        }

        for (row_index, row) in chunk.chunks(chunk_width).enumerate() {
            let y = y0 + row_index;
            if y >= self.height {
                break;
            }
            let columns = chunk_width.min(self.width.saturating_sub(x0)).min(row.len());
            let start = y * self.width + x0;
            self.values[start..start + columns].copy_from_slice(&row[..columns]);
        }
    }

    /// Pixel count per distinct value
    pub fn value_counts(&self) -> BTreeMap<RasterValue, u64> {
        let mut counts = BTreeMap::new();
        for value in &self.values {
            *counts.entry(*value).or_insert(0) += 1;
        }
        counts
    }
}

/// Number of bytes per sample
pub fn bytes_per_sample(bits_per_sample: u16) -> usize {
    (bits_per_sample as usize).div_ceil(8)
}

/// Rejects dimensions the stored chunks cannot hold
///
/// Uncompressed chunks must cover every sample. Compressed chunks may expand
/// up to `MAX_COMPRESSION_RATIO` times their stored size.
///
/// # Arguments
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `bits_per_sample` - Sample width
/// * `compressed` - Whether the chunks are compressed
/// * `byte_counts` - Stored size of every chunk of the image
pub fn check_chunk_bytes(
    width: usize,
    height: usize,
    bits_per_sample: u16,
    compressed: bool,
    byte_counts: &[u64]
) -> QaResult<()> {
    let needed = (width as u64).checked_mul(height as u64)
        .and_then(|samples| samples.checked_mul(bytes_per_sample(bits_per_sample) as u64));
    let stored = byte_counts.iter().fold(0u64, |total, count| total.saturating_add(*count));
    let capacity = if compressed { stored.saturating_mul(MAX_COMPRESSION_RATIO) } else { stored };

    match needed {
        Some(needed) if needed <= capacity => Ok(()),
        _ => Err(QaError::InvalidDimensions {
            width: width as u64,
            height: height as u64,
            reason: format!("{} stored bytes cannot hold the image", stored),
        }),
    }
}

/// Rejects a chunk reaching past the end of the file
pub fn check_chunk_range(offset: u64, byte_count: u64, file_size: u64) -> QaResult<()> {
    match offset.checked_add(byte_count) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(QaError::GenericError(format!(
            "Chunk at offset {} with {} bytes exceeds file size {}", offset, byte_count, file_size))),
    }
}

/// Splits decompressed bytes into samples
///
/// At most `expected` samples are decoded; a short chunk yields fewer.
pub fn decode_samples(
    data: &[u8],
    handler: &dyn ByteOrderHandler,
    bits_per_sample: u16,
    expected: usize
) -> QaResult<Vec<RasterValue>> {
    let available = data.len() / bytes_per_sample(bits_per_sample).max(1);
    if available < expected {
        warn!("Chunk holds {} samples, expected {}", available, expected);
    }

    let count = available.min(expected);
    let mut cursor = Cursor::new(data);
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(handler.read_sample(&mut cursor, bits_per_sample)?);
    }
    Ok(values)
}

/// Undoes TIFF horizontal differencing (Predictor 2) row by row
///
/// Sums wrap at the sample width.
pub fn apply_horizontal_predictor(values: &mut [RasterValue], row_width: usize, bits_per_sample: u16) {
    if row_width == 0 {
        return;
    }

    let mask = if bits_per_sample >= 32 { u32::MAX } else { (1u32 << bits_per_sample) - 1 };
    for row in values.chunks_mut(row_width) {
        for i in 1..row.len() {
            row[i] = row[i].wrapping_add(row[i - 1]) & mask;
        }
    }
}

/// Decompresses and decodes one strip or tile
///
/// # Arguments
/// * `raw` - Chunk bytes as stored in the file
/// * `compression` - Handler for the raster's Compression tag
/// * `predictor_code` - Value of the Predictor tag
/// * `handler` - Byte order of the file
/// * `bits_per_sample` - Sample width
/// * `chunk_width` - Samples per chunk row
/// * `rows` - Rows in the chunk
pub fn decode_chunk(
    raw: &[u8],
    compression: &dyn CompressionHandler,
    predictor_code: u16,
    handler: &dyn ByteOrderHandler,
    bits_per_sample: u16,
    chunk_width: usize,
    rows: usize
) -> QaResult<Vec<RasterValue>> {
    let data = compression.decompress(raw)?;
    let mut values = decode_samples(&data, handler, bits_per_sample, chunk_width * rows)?;

    match predictor_code {
        predictor::NONE => {},
        predictor::HORIZONTAL_DIFFERENCING => apply_horizontal_predictor(&mut values, chunk_width, bits_per_sample),
        other => return Err(QaError::GenericError(format!("Unsupported predictor: {}", other))),
    }

    Ok(values)
}
