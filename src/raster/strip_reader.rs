//! Strip-based sample reading
//!
//! Stripped TIFFs store the image as horizontal bands spanning the full
//! width. Every strip is decoded and copied into the sample grid in order.

use log::{debug, info};
use std::io::{Read, Seek, SeekFrom};

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::errors::{QaError, QaResult};
use crate::io::seekable::SeekableReader;
use crate::raster::samples::{self, SampleGrid};
use crate::tiff::constants::{compression, predictor, tags};
use crate::tiff::ifd::IFD;
use crate::tiff::validation;
use crate::tiff::TiffReader;
use crate::utils::progress::ProgressTracker;

/// Reads sample values from stripped TIFF files
pub struct StripReader<'a, R: SeekableReader> {
    /// Reader for accessing the TIFF file
    reader: R,
    /// IFD containing the image metadata
    ifd: &'a IFD,
    /// TIFF reader for accessing tag values
    tiff_reader: &'a TiffReader<'a>,
}

impl<'a, R: SeekableReader> StripReader<'a, R> {
    /// Create a new strip reader
    ///
    /// # Arguments
    /// * `reader` - Seekable reader for the TIFF file
    /// * `ifd` - IFD containing the image metadata
    /// * `tiff_reader` - TIFF reader for accessing tag values
    pub fn new(reader: R, ifd: &'a IFD, tiff_reader: &'a TiffReader<'a>) -> Self {
        StripReader {
            reader,
            ifd,
            tiff_reader
        }
    }

    /// Rows per strip and image width
    ///
    /// RowsPerStrip defaults to the image height when absent.
    fn get_strip_parameters(&self) -> QaResult<(usize, usize, usize)> {
        let (width, height) = self.ifd.get_dimensions()
            .ok_or(QaError::MissingDimensions)?;

        let rows_per_strip = self.ifd.get_tag_value(tags::ROWS_PER_STRIP)
            .unwrap_or(height)
            .clamp(1, height.max(1));

        Ok((rows_per_strip as usize, width as usize, height as usize))
    }

    fn read_strip(
        &mut self,
        offset: u64,
        byte_count: u64,
        file_size: u64,
        compression_handler: &dyn CompressionHandler,
        predictor_code: u16,
        bits_per_sample: u16,
        width: usize,
        rows: usize
    ) -> QaResult<Vec<u32>> {
        samples::check_chunk_range(offset, byte_count, file_size)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut compressed_data = vec![0u8; byte_count as usize];
        self.reader.read_exact(&mut compressed_data)?;

        let handler = self.tiff_reader.get_byte_order_handler()
            .ok_or_else(|| QaError::GenericError("Byte order not yet determined".to_string()))?;

        samples::decode_chunk(&compressed_data, compression_handler, predictor_code, handler, bits_per_sample, width, rows)
    }

    /// Reads every strip into a grid sized to the image
    ///
    /// The grid is allocated only once the strip byte counts are known to back
    /// the image dimensions.
    ///
    /// # Arguments
    /// * `bits_per_sample` - Sample width
    /// * `show_progress` - Draw a progress bar
    pub fn read(&mut self, bits_per_sample: u16, show_progress: bool) -> QaResult<SampleGrid> {
        let (rows_per_strip, width, height) = self.get_strip_parameters()?;

        let compression_code = self.ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);
        let compression_handler = CompressionFactory::create_handler(compression_code)?;
        info!("Using compression: {}", compression_handler.name());

        let predictor_code = self.ifd.get_tag_value(tags::PREDICTOR)
            .unwrap_or(predictor::NONE as u64) as u16;

        let strip_offsets = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, tags::STRIP_OFFSETS)?;
        let strip_byte_counts = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, tags::STRIP_BYTE_COUNTS)?;

        let strip_count = height.div_ceil(rows_per_strip);
        if strip_offsets.len() < strip_count || strip_byte_counts.len() < strip_count {
            return Err(QaError::GenericError(format!(
                "Expected {} strips, found {} offsets and {} byte counts",
                strip_count, strip_offsets.len(), strip_byte_counts.len())));
        }

        samples::check_chunk_bytes(
            width, height, bits_per_sample,
            compression_code != compression::NONE as u64,
            &strip_byte_counts[..strip_count]
        )?;
        let file_size = validation::get_file_size(&mut self.reader)?;
        let mut grid = SampleGrid::new(width, height)?;

        info!("Reading {} strips of {} rows", strip_count, rows_per_strip);
        let progress = ProgressTracker::maybe(show_progress, strip_count as u64, "Reading strips");

        for strip_idx in 0..strip_count {
            let start_y = strip_idx * rows_per_strip;
            let rows = rows_per_strip.min(height - start_y);
            debug!("Reading strip {} at offset {} with {} bytes",
                   strip_idx, strip_offsets[strip_idx], strip_byte_counts[strip_idx]);

            let values = self.read_strip(
                strip_offsets[strip_idx],
                strip_byte_counts[strip_idx],
                file_size,
                &*compression_handler,
                predictor_code,
                bits_per_sample,
                width,
                rows
            )?;

            grid.place(&values, width, 0, start_y);
            progress.increment(1);
        }

        progress.finish();
        Ok(grid)
    }
}
