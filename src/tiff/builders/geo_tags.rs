//! GeoTIFF tag strategies
//!
//! Carries the georeferencing tags of a QA raster over to the binary rasters
//! extracted from it. Values are copied, never transformed.

use crate::tiff::ifd::IFD;
use crate::errors::QaResult;
use crate::tiff::constants::tags;
use crate::tiff::reader::TiffReader;
use crate::utils::tiff_utils;
use log::{debug, info, warn};
use std::collections::HashMap;

/// GeoTIFF tags copied to derived rasters
pub const GEOTIFF_TAGS: [u16; 6] = [
    tags::MODEL_PIXEL_SCALE_TAG,
    tags::MODEL_TIEPOINT_TAG,
    tags::MODEL_TRANSFORMATION_TAG,
    tags::GEO_KEY_DIRECTORY_TAG,
    tags::GEO_DOUBLE_PARAMS_TAG,
    tags::GEO_ASCII_PARAMS_TAG,
];

/// Handles GeoTIFF tags
pub struct GeoTagsBuilder;

impl GeoTagsBuilder {
    /// Copy GeoTIFF tags from source IFD to destination IFD
    ///
    /// Payloads are re-encoded little-endian to match the writer. Small
    /// payloads stay inline; the rest become external tag data.
    pub fn copy_geotiff_tags(
        dest_ifd: &mut IFD,
        external_data: &mut HashMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        source_ifd: &IFD,
        reader: &TiffReader
    ) -> QaResult<()> {
        info!("Copying GeoTIFF tags");

        let mut file = reader.create_reader().map_err(|e| {
            warn!("Failed to create reader for GeoTIFF tag data: {}", e);
            e
        })?;

        for &tag in &GEOTIFF_TAGS {
            let entry = match source_ifd.get_entry(tag) {
                Some(e) => e,
                None => continue,
            };

            debug!("Copying GeoTIFF tag {} (count: {})", tag, entry.count);
            let data = reader.read_tag_payload_le(&mut file, entry)?;

            if data.len() <= 4 {
                tiff_utils::create_inline_tag(dest_ifd, tag, entry.field_type, entry.count, &data);
            } else {
                tiff_utils::create_external_tag(
                    dest_ifd,
                    external_data,
                    ifd_index,
                    tag,
                    entry.field_type,
                    entry.count,
                    data
                );
            }
        }

        Ok(())
    }
}
