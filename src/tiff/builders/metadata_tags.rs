//! Metadata tag strategies

use crate::tiff::ifd::IFD;
use crate::tiff::constants::{tags, field_types};
use crate::utils::tiff_utils;
use std::collections::HashMap;

/// Handles descriptive metadata tags
pub struct MetadataBuilder;

impl MetadataBuilder {
    /// Add a NUL-terminated ASCII tag
    pub fn add_ascii_tag(
        ifd: &mut IFD,
        external_data: &mut HashMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        tag: u16,
        text: &str
    ) {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);

        if bytes.len() <= 4 {
            tiff_utils::create_inline_tag(ifd, tag, field_types::ASCII, bytes.len() as u64, &bytes);
        } else {
            tiff_utils::create_external_tag(
                ifd,
                external_data,
                ifd_index,
                tag,
                field_types::ASCII,
                bytes.len() as u64,
                bytes
            );
        }
    }

    /// Add the Software tag
    pub fn add_software_tag(
        ifd: &mut IFD,
        external_data: &mut HashMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        software: &str
    ) {
        Self::add_ascii_tag(ifd, external_data, ifd_index, tags::SOFTWARE, software);
    }

    /// Add the GDAL NoData tag
    pub fn add_nodata_tag(
        ifd: &mut IFD,
        external_data: &mut HashMap<(usize, u16), Vec<u8>>,
        ifd_index: usize,
        nodata: &str
    ) {
        Self::add_ascii_tag(ifd, external_data, ifd_index, tags::GDAL_NODATA, nodata);
    }
}
