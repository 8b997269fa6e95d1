//! Basic TIFF tag strategies
//!
//! Dimensions, sample layout and the strip/tile tables of single-band
//! grayscale rasters.

use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::constants::{tags, field_types, photometric, planar_config};
use crate::utils::tiff_utils;
use log::{debug, info};
use std::collections::HashMap;

/// How pixel data is split into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
    /// Horizontal bands of `rows_per_strip` rows
    Strips { rows_per_strip: u32 },
    /// Rectangular tiles
    Tiles { width: u32, length: u32 },
}

/// Adds basic TIFF tags to an IFD
pub struct BasicTagsBuilder;

impl BasicTagsBuilder {
    /// Add common tags for a single-band grayscale image
    ///
    /// MinSampleValue/MaxSampleValue are added only for 8 and 16 bit samples,
    /// where the range fits a SHORT.
    pub fn add_basic_gray_tags(
        ifd: &mut IFD,
        width: u32,
        height: u32,
        bits_per_sample: u16,
        compression: u16
    ) {
        info!("Adding basic grayscale tags for {}x{} image, {} bits", width, height, bits_per_sample);

        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, width as u64));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, height as u64));
        ifd.add_entry(IFDEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 1, bits_per_sample as u64));
        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, compression as u64));

        // 0 is black
        ifd.add_entry(IFDEntry::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            field_types::SHORT,
            1,
            photometric::BLACK_IS_ZERO as u64)
        );

        ifd.add_entry(IFDEntry::new(tags::SAMPLES_PER_PIXEL, field_types::SHORT, 1, 1));
        ifd.add_entry(IFDEntry::new(
            tags::PLANAR_CONFIGURATION,
            field_types::SHORT,
            1,
            planar_config::CHUNKY as u64)
        );

        if bits_per_sample <= 16 {
            if !ifd.has_tag(tags::MIN_SAMPLE_VALUE) {
                ifd.add_entry(IFDEntry::new(tags::MIN_SAMPLE_VALUE, field_types::SHORT, 1, 0));
            }
            if !ifd.has_tag(tags::MAX_SAMPLE_VALUE) {
                let max_value = (1u64 << bits_per_sample) - 1;
                ifd.add_entry(IFDEntry::new(tags::MAX_SAMPLE_VALUE, field_types::SHORT, 1, max_value));
            }
        }
    }

    /// Set the SampleFormat tag
    pub fn add_sample_format(ifd: &mut IFD, sample_format: u16) {
        tiff_utils::update_ifd_tag(
            ifd,
            tags::SAMPLE_FORMAT,
            IFDEntry::new(tags::SAMPLE_FORMAT, field_types::SHORT, 1, sample_format as u64)
        );
    }

    /// Set the Compression tag
    pub fn set_compression(ifd: &mut IFD, compression: u16) {
        tiff_utils::update_ifd_tag(
            ifd,
            tags::COMPRESSION,
            IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, compression as u64)
        );
    }

    /// Register encoded chunks and their offset/byte-count tables
    ///
    /// Offsets are placeholders here; the writer fills them in once the
    /// file layout is known.
    pub fn setup_chunks(
        ifd: &mut IFD,
        image_data: &mut HashMap<usize, Vec<Vec<u8>>>,
        external_data: &mut HashMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        chunks: Vec<Vec<u8>>,
        layout: ChunkLayout
    ) {
        let count = chunks.len() as u64;
        info!("Setting up {} chunk(s) with layout {:?}", count, layout);

        let (offsets_tag, byte_counts_tag) = match layout {
            ChunkLayout::Strips { rows_per_strip } => {
                tiff_utils::update_ifd_tag(
                    ifd,
                    tags::ROWS_PER_STRIP,
                    IFDEntry::new(tags::ROWS_PER_STRIP, field_types::LONG, 1, rows_per_strip as u64)
                );
                (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
            },
            ChunkLayout::Tiles { width, length } => {
                tiff_utils::update_ifd_tag(
                    ifd,
                    tags::TILE_WIDTH,
                    IFDEntry::new(tags::TILE_WIDTH, field_types::LONG, 1, width as u64)
                );
                tiff_utils::update_ifd_tag(
                    ifd,
                    tags::TILE_LENGTH,
                    IFDEntry::new(tags::TILE_LENGTH, field_types::LONG, 1, length as u64)
                );
                (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
            },
        };

        if count == 1 {
            tiff_utils::update_ifd_tag(ifd, offsets_tag, IFDEntry::new(offsets_tag, field_types::LONG, 1, 0));
            tiff_utils::update_ifd_tag(
                ifd,
                byte_counts_tag,
                IFDEntry::new(byte_counts_tag, field_types::LONG, 1, chunks[0].len() as u64)
            );
        } else {
            let byte_counts: Vec<u8> = chunks.iter()
                .flat_map(|chunk| (chunk.len() as u32).to_le_bytes())
                .collect();
            debug!("Chunk byte counts stored externally ({} bytes)", byte_counts.len());

            tiff_utils::create_external_tag(
                ifd, external_data, ifd_index, offsets_tag, field_types::LONG, count, vec![0u8; 4 * chunks.len()]
            );
            tiff_utils::create_external_tag(
                ifd, external_data, ifd_index, byte_counts_tag, field_types::LONG, count, byte_counts
            );
        }

        image_data.insert(ifd_index, chunks);
    }

    /// Setup single strip covering the whole image
    pub fn setup_single_strip(
        ifd: &mut IFD,
        image_data: &mut HashMap<usize, Vec<Vec<u8>>>,
        external_data: &mut HashMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        strip_data: Vec<u8>
    ) {
        let rows = ifd.get_dimensions().map(|(_, height)| height as u32).unwrap_or(1);
        Self::setup_chunks(
            ifd,
            image_data,
            external_data,
            ifd_index,
            vec![strip_data],
            ChunkLayout::Strips { rows_per_strip: rows }
        );
    }
}
