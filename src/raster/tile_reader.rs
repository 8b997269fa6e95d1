//! Tile-based sample reading
//!
//! Tiled TIFFs store the image as a grid of equally sized rectangles. Tiles
//! on the right and bottom edges are padded in the file and clipped here.

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

/// Reads sample values from tiled TIFF files
pub struct TileReader<'a, R: SeekableReader> {
    /// Reader for accessing the TIFF file
    reader: R,
    /// IFD containing the image metadata
    ifd: &'a IFD,
    /// TIFF reader for accessing tag values
    tiff_reader: &'a TiffReader<'a>,
}

impl<'a, R: SeekableReader> TileReader<'a, R> {
    /// Create a new tile reader
    pub fn new(reader: R, ifd: &'a IFD, tiff_reader: &'a TiffReader<'a>) -> Self {
        TileReader {
            reader,
            ifd,
            tiff_reader
        }
    }

    /// Tile width and length in pixels
    fn get_tile_dimensions(&self) -> QaResult<(usize, usize)> {
        let tile_width = self.ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(0) as usize;
        let tile_length = self.ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(0) as usize;

        if tile_width == 0 || tile_length == 0 {
            return Err(QaError::GenericError(format!(
                "Invalid tile size {}x{}", tile_width, tile_length)));
        }

        Ok((tile_width, tile_length))
    }

    fn read_tile(
        &mut self,
        offset: u64,
        byte_count: u64,
        file_size: u64,
        compression_handler: &dyn CompressionHandler,
        predictor_code: u16,
        bits_per_sample: u16,
        tile_width: usize,
        tile_length: usize
    ) -> QaResult<Vec<u32>> {
        samples::check_chunk_range(offset, byte_count, file_size)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut compressed_data = vec![0u8; byte_count as usize];
        self.reader.read_exact(&mut compressed_data)?;

        let handler = self.tiff_reader.get_byte_order_handler()
            .ok_or_else(|| QaError::GenericError("Byte order not yet determined".to_string()))?;

        samples::decode_chunk(&compressed_data, compression_handler, predictor_code, handler, bits_per_sample, tile_width, tile_length)
    }

    /// Reads every tile into a grid sized to the image
    ///
    /// The grid is allocated only once the tile byte counts are known to back
    /// the image dimensions.
    ///
    /// # Arguments
    /// * `bits_per_sample` - Sample width
    /// * `show_progress` - Draw a progress bar
    pub fn read(&mut self, bits_per_sample: u16, show_progress: bool) -> QaResult<SampleGrid> {
        let (tile_width, tile_length) = self.get_tile_dimensions()?;
        let (width, height) = self.ifd.get_dimensions()
            .ok_or(QaError::MissingDimensions)?;

        let tiles_across = (width as usize).div_ceil(tile_width);
        let tiles_down = (height as usize).div_ceil(tile_length);
        let tile_count = tiles_across.checked_mul(tiles_down)
            .ok_or_else(|| QaError::InvalidDimensions {
                width,
                height,
                reason: format!("{}x{} tiles overflow", tiles_across, tiles_down),
            })?;

        let compression_code = self.ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);
        let compression_handler = CompressionFactory::create_handler(compression_code)?;
        info!("Using compression: {}", compression_handler.name());

        let predictor_code = self.ifd.get_tag_value(tags::PREDICTOR)
            .unwrap_or(predictor::NONE as u64) as u16;

        let tile_offsets = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, tags::TILE_OFFSETS)?;
        let tile_byte_counts = self.tiff_reader.read_tag_values(&mut self.reader, self.ifd, tags::TILE_BYTE_COUNTS)?;

        if tile_offsets.len() < tile_count || tile_byte_counts.len() < tile_count {
            return Err(QaError::GenericError(format!(
                "Expected {} tiles, found {} offsets and {} byte counts",
                tile_count, tile_offsets.len(), tile_byte_counts.len())));
        }

        samples::check_chunk_bytes(
            width as usize, height as usize, bits_per_sample,
            compression_code != compression::NONE as u64,
            &tile_byte_counts[..tile_count]
        )?;
        let file_size = validation::get_file_size(&mut self.reader)?;
        let mut grid = SampleGrid::new(width as usize, height as usize)?;

        info!("Reading {}x{} tiles of {}x{}", tiles_across, tiles_down, tile_width, tile_length);
        let progress = ProgressTracker::maybe(show_progress, tile_count as u64, "Reading tiles");

        for tile_idx in 0..tile_count {
            let x0 = (tile_idx % tiles_across) * tile_width;
            let y0 = (tile_idx / tiles_across) * tile_length;
            debug!("Reading tile {} at ({}, {})", tile_idx, x0, y0);

            let values = self.read_tile(
                tile_offsets[tile_idx],
                tile_byte_counts[tile_idx],
                file_size,
                &*compression_handler,
                predictor_code,
                bits_per_sample,
                tile_width,
                tile_length
            )?;

            grid.place(&values, tile_width, x0, y0);
            progress.increment(1);
        }

        progress.finish();
        Ok(grid)
    }
}
