//! TIFF writing strategies
//!
//! Lays out and writes little-endian classic TIFF or BigTIFF files: header,
//! IFDs, external tag payloads and then the image chunks. Offsets are
//! computed in passes before anything is written.

use crate::tiff::ifd::IFD;
use crate::errors::QaResult;
use crate::tiff::constants::{header, tags};
use crate::utils::write_utils;
use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};

/// Tags whose values point at image chunks
const CHUNK_OFFSET_TAGS: [u16; 2] = [tags::STRIP_OFFSETS, tags::TILE_OFFSETS];

/// File positions computed before writing
struct Layout {
    ifd_offsets: Vec<u64>,
    tag_data_offsets: HashMap<(usize, u16), u64>,
    chunk_offsets: HashMap<usize, Vec<u64>>,
}

/// Handles writing TIFF files to disk
pub struct WriterBuilder;

impl WriterBuilder {
    /// Write a complete TIFF file to disk
    pub fn write(
        is_big_tiff: bool,
        ifds: &[IFD],
        image_data: &HashMap<usize, Vec<Vec<u8>>>,
        external_data: &HashMap<(usize, u16), Vec<u8>>,
        output_path: &str
    ) -> QaResult<()> {
        info!("Writing TIFF to {}", output_path);

        let file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);

        let sorted_ifds = Self::prepare_sorted_ifds(ifds);

        Self::write_header(&mut writer, is_big_tiff)?;

        let header_size = if is_big_tiff { 16 } else { 8 };
        let layout = Self::calculate_offsets(&sorted_ifds, external_data, image_data, header_size, is_big_tiff);

        let first_ifd_offset = layout.ifd_offsets.first().copied().unwrap_or(0);
        Self::write_first_ifd_offset(&mut writer, first_ifd_offset, is_big_tiff)?;

        Self::write_ifds(&mut writer, &sorted_ifds, &layout, is_big_tiff)?;
        Self::write_external_data(&mut writer, external_data, &layout)?;
        Self::write_image_data(&mut writer, image_data, &layout)?;

        writer.flush()?;
        Ok(())
    }

    /// Prepare sorted IFDs with unique tags
    fn prepare_sorted_ifds(ifds: &[IFD]) -> Vec<IFD> {
        ifds.iter().map(|ifd| {
            let mut sorted_ifd = ifd.clone();
            sorted_ifd.entries = write_utils::get_unique_sorted_entries(&ifd.entries);
            sorted_ifd
        }).collect()
    }

    /// Calculate offsets for IFDs, external data and image chunks
    ///
    /// Keys are visited in sorted order so identical input writes identical
    /// files.
    fn calculate_offsets(
        sorted_ifds: &[IFD],
        external_data: &HashMap<(usize, u16), Vec<u8>>,
        image_data: &HashMap<usize, Vec<Vec<u8>>>,
        header_size: u64,
        is_big_tiff: bool
    ) -> Layout {
        let mut current_offset = header_size;
        let mut ifd_offsets = Vec::with_capacity(sorted_ifds.len());
        let mut tag_data_offsets = HashMap::new();
        let mut chunk_offsets = HashMap::new();

        for ifd in sorted_ifds {
            ifd_offsets.push(current_offset);
            current_offset += Self::calculate_ifd_size(ifd, is_big_tiff);
        }

        let mut external_keys: Vec<_> = external_data.keys().copied().collect();
        external_keys.sort_unstable();
        for key in external_keys {
            tag_data_offsets.insert(key, current_offset);
            current_offset += external_data[&key].len() as u64;
            current_offset = write_utils::align_to_4_bytes(current_offset);
        }

        let mut image_keys: Vec<_> = image_data.keys().copied().collect();
        image_keys.sort_unstable();
        for ifd_index in image_keys {
            let offsets: Vec<u64> = image_data[&ifd_index].iter()
                .map(|chunk| {
                    let offset = current_offset;
                    current_offset = write_utils::align_to_4_bytes(current_offset + chunk.len() as u64);
                    offset
                })
                .collect();
            chunk_offsets.insert(ifd_index, offsets);
        }

        Layout { ifd_offsets, tag_data_offsets, chunk_offsets }
    }

    /// Write the TIFF header with a placeholder first-IFD offset
    fn write_header(writer: &mut impl Write, is_big_tiff: bool) -> QaResult<()> {
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;

        if is_big_tiff {
            writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            writer.write_all(&[0u8, 0])?;  // Reserved
            writer.write_all(&[0u8; 8])?;
        } else {
            writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&[0u8; 4])?;
        }

        Ok(())
    }

    fn calculate_ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
        let entries_count = ifd.entries.len() as u64;

        if is_big_tiff {
            8 + (20 * entries_count) + 8
        } else {
            2 + (12 * entries_count) + 4
        }
    }

    fn write_first_ifd_offset(writer: &mut (impl Write + Seek), offset: u64, is_big_tiff: bool) -> QaResult<()> {
        let position = if is_big_tiff { 8 } else { 4 };
        writer.seek(SeekFrom::Start(position))?;

        if is_big_tiff {
            writer.write_all(&offset.to_le_bytes())?;
        } else {
            writer.write_all(&(offset as u32).to_le_bytes())?;
        }

        Ok(())
    }

    fn write_ifds(
        writer: &mut (impl Write + Seek),
        sorted_ifds: &[IFD],
        layout: &Layout,
        is_big_tiff: bool
    ) -> QaResult<()> {
        for (i, ifd) in sorted_ifds.iter().enumerate() {
            let next_ifd_offset = layout.ifd_offsets.get(i + 1).copied().unwrap_or(0);
            writer.seek(SeekFrom::Start(layout.ifd_offsets[i]))?;
            Self::write_ifd(writer, ifd, next_ifd_offset, layout, i, is_big_tiff)?;
        }

        Ok(())
    }

    /// Write external tag payloads
    ///
    /// Chunk offset tables are generated from the layout rather than taken
    /// from the stored placeholder.
    fn write_external_data(
        writer: &mut (impl Write + Seek),
        external_data: &HashMap<(usize, u16), Vec<u8>>,
        layout: &Layout
    ) -> QaResult<()> {
        for (&(ifd_index, tag), data) in external_data {
            let offset = match layout.tag_data_offsets.get(&(ifd_index, tag)) {
                Some(offset) => *offset,
                None => continue,
            };

            let payload: Vec<u8> = match layout.chunk_offsets.get(&ifd_index) {
                Some(chunks) if CHUNK_OFFSET_TAGS.contains(&tag) => {
                    chunks.iter().flat_map(|o| (*o as u32).to_le_bytes()).collect()
                },
                _ => data.clone(),
            };

            writer.seek(SeekFrom::Start(offset))?;
            writer.write_all(&payload)?;
            write_utils::write_padding(writer, payload.len())?;
        }

        Ok(())
    }

    fn write_image_data(
        writer: &mut (impl Write + Seek),
        image_data: &HashMap<usize, Vec<Vec<u8>>>,
        layout: &Layout
    ) -> QaResult<()> {
        for (ifd_index, chunks) in image_data {
            let offsets = match layout.chunk_offsets.get(ifd_index) {
                Some(offsets) => offsets,
                None => continue,
            };

            for (chunk, offset) in chunks.iter().zip(offsets) {
                debug!("Writing {} byte chunk at {}", chunk.len(), offset);
                writer.seek(SeekFrom::Start(*offset))?;
                writer.write_all(chunk)?;
                write_utils::write_padding(writer, chunk.len())?;
            }
        }

        Ok(())
    }

    /// Write one IFD
    ///
    /// Entries with external payloads get the payload offset; a single chunk
    /// offset is written inline; every other entry writes its raw value field.
    fn write_ifd(
        writer: &mut (impl Write + Seek),
        ifd: &IFD,
        next_offset: u64,
        layout: &Layout,
        ifd_index: usize,
        is_big_tiff: bool
    ) -> QaResult<()> {
        if is_big_tiff {
            writer.write_all(&(ifd.entries.len() as u64).to_le_bytes())?;
        } else {
            writer.write_all(&(ifd.entries.len() as u16).to_le_bytes())?;
        }

        for entry in &ifd.entries {
            writer.write_all(&entry.tag.to_le_bytes())?;
            writer.write_all(&entry.field_type.to_le_bytes())?;

            if is_big_tiff {
                writer.write_all(&entry.count.to_le_bytes())?;
            } else {
                writer.write_all(&(entry.count as u32).to_le_bytes())?;
            }

            let external = layout.tag_data_offsets.get(&(ifd_index, entry.tag)).copied();
            let single_chunk = if CHUNK_OFFSET_TAGS.contains(&entry.tag) && entry.count == 1 {
                layout.chunk_offsets.get(&ifd_index).and_then(|o| o.first().copied())
            } else {
                None
            };

            let field_size = if is_big_tiff { 8 } else { 4 };
            match external.or(single_chunk) {
                Some(offset) if is_big_tiff => writer.write_all(&offset.to_le_bytes())?,
                Some(offset) => writer.write_all(&(offset as u32).to_le_bytes())?,
                None => writer.write_all(&entry.raw_value[..field_size])?,
            }
        }

        if is_big_tiff {
            writer.write_all(&next_offset.to_le_bytes())?;
        } else {
            writer.write_all(&(next_offset as u32).to_le_bytes())?;
        }

        Ok(())
    }
}
