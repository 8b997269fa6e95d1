//! TIFF file construction utilities
//!
//! Assembles IFDs, tag payloads and image chunks, then hands them to the
//! writer. Used for the binary rasters produced by extraction and for the
//! fixture rasters in tests.

use std::collections::HashMap;
use log::{info, error};

use crate::errors::{QaError, QaResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::reader::TiffReader;
use crate::utils::logger::Logger;
use crate::utils::tiff_utils;

use crate::tiff::builders::basic_tags::{BasicTagsBuilder, ChunkLayout};
use crate::tiff::builders::geo_tags::GeoTagsBuilder;
use crate::tiff::builders::metadata_tags::MetadataBuilder;
use crate::tiff::builders::writer::WriterBuilder;

/// Builder for creating TIFF files
pub struct TiffBuilder<'a> {
    logger: &'a Logger,
    is_big_tiff: bool,
    pub ifds: Vec<IFD>,
    image_data: HashMap<usize, Vec<Vec<u8>>>,
    external_data: HashMap<(usize, u16), Vec<u8>>,
}

impl<'a> TiffBuilder<'a> {
    /// Create a new TIFF builder
    pub fn new(logger: &'a Logger, is_big_tiff: bool) -> Self {
        info!("Creating new TiffBuilder (is_big_tiff: {})", is_big_tiff);
        TiffBuilder {
            logger,
            is_big_tiff,
            ifds: Vec::new(),
            image_data: HashMap::new(),
            external_data: HashMap::new(),
        }
    }

    /// Add an IFD to the TIFF
    pub fn add_ifd(&mut self, ifd: IFD) -> usize {
        let ifd_index = self.ifds.len();
        info!("Adding IFD #{} to TiffBuilder", ifd_index);
        self.ifds.push(ifd);
        ifd_index
    }

    fn ifd_mut(&mut self, ifd_index: usize) -> Option<&mut IFD> {
        if ifd_index >= self.ifds.len() {
            error!("Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len());
        }
        self.ifds.get_mut(ifd_index)
    }

    /// Add common tags for a single-band grayscale image
    pub fn add_basic_gray_tags(&mut self, ifd_index: usize, width: u32, height: u32, bits_per_sample: u16, compression: u16) {
        if let Some(ifd) = self.ifd_mut(ifd_index) {
            BasicTagsBuilder::add_basic_gray_tags(ifd, width, height, bits_per_sample, compression);
        }
    }

    /// Set the SampleFormat tag
    pub fn add_sample_format(&mut self, ifd_index: usize, sample_format: u16) {
        if let Some(ifd) = self.ifd_mut(ifd_index) {
            BasicTagsBuilder::add_sample_format(ifd, sample_format);
        }
    }

    /// Set the Compression tag
    pub fn set_compression(&mut self, ifd_index: usize, compression: u16) {
        if let Some(ifd) = self.ifd_mut(ifd_index) {
            BasicTagsBuilder::set_compression(ifd, compression);
        }
    }

    /// Add or replace a tag whose value fits the entry
    pub fn set_tag(&mut self, ifd_index: usize, entry: IFDEntry) {
        if let Some(ifd) = self.ifd_mut(ifd_index) {
            tiff_utils::update_ifd_tag(ifd, entry.tag, entry);
        }
    }

    /// Add or replace a tag with an external little-endian payload
    pub fn set_external_tag(&mut self, ifd_index: usize, tag: u16, field_type: u16, count: u64, data: Vec<u8>) {
        if ifd_index >= self.ifds.len() {
            error!("Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len());
            return;
        }

        tiff_utils::create_external_tag(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            tag,
            field_type,
            count,
            data
        );
    }

    /// Set up a single strip for image data
    pub fn setup_single_strip(&mut self, ifd_index: usize, strip_data: Vec<u8>) {
        if ifd_index >= self.ifds.len() {
            error!("Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len());
            return;
        }

        BasicTagsBuilder::setup_single_strip(
            &mut self.ifds[ifd_index],
            &mut self.image_data,
            &mut self.external_data,
            ifd_index,
            strip_data
        );
    }

    /// Set up already-encoded strips or tiles
    pub fn setup_chunks(&mut self, ifd_index: usize, chunks: Vec<Vec<u8>>, layout: ChunkLayout) {
        if ifd_index >= self.ifds.len() {
            error!("Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len());
            return;
        }

        BasicTagsBuilder::setup_chunks(
            &mut self.ifds[ifd_index],
            &mut self.image_data,
            &mut self.external_data,
            ifd_index,
            chunks,
            layout
        );
    }

    /// Copy GeoTIFF tags from source IFD
    pub fn copy_geotiff_tags(&mut self, ifd_index: usize, source_ifd: &IFD, reader: &TiffReader) -> QaResult<()> {
        if ifd_index >= self.ifds.len() {
            return Err(QaError::GenericError(format!(
                "Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len())));
        }

        GeoTagsBuilder::copy_geotiff_tags(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            source_ifd,
            reader
        )
    }

    /// Add a Software tag
    pub fn add_software_tag(&mut self, ifd_index: usize, software: &str) {
        if ifd_index >= self.ifds.len() {
            error!("Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len());
            return;
        }

        MetadataBuilder::add_software_tag(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            software
        );
    }

    /// Add a GDAL NoData tag
    pub fn add_nodata_tag(&mut self, ifd_index: usize, nodata: &str) {
        if ifd_index >= self.ifds.len() {
            error!("Invalid IFD index {}, only have {} IFDs", ifd_index, self.ifds.len());
            return;
        }

        MetadataBuilder::add_nodata_tag(
            &mut self.ifds[ifd_index],
            &mut self.external_data,
            ifd_index,
            nodata
        );
    }

    /// Write the TIFF file to disk
    pub fn write(&self, output_path: &str) -> QaResult<()> {
        info!("Writing TIFF to {}", output_path);
        self.logger.log(&format!("Writing TIFF to {}", output_path))?;

        WriterBuilder::write(
            self.is_big_tiff,
            &self.ifds,
            &self.image_data,
            &self.external_data,
            output_path
        )
    }
}
