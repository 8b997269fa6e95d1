//! TIFF utility functions
//!
//! Tag manipulation shared by the tag builders.

use crate::tiff::ifd::{IFD, IFDEntry};
use std::collections::HashMap;

/// Update an IFD tag, replacing it if it already exists
pub fn update_ifd_tag(ifd: &mut IFD, tag: u16, entry: IFDEntry) {
    ifd.remove_tag(tag);
    ifd.add_entry(entry);
}

/// Create a tag whose payload is written outside the IFD
///
/// # Parameters
/// * `ifd` - The IFD where the tag will be added
/// * `external_data` - External payloads keyed by (IFD index, tag ID)
/// * `ifd_index` - The index of the current IFD
/// * `tag` - The tag ID
/// * `field_type` - The data type code
/// * `count` - The number of values
/// * `data` - Little-endian payload bytes
pub fn create_external_tag(
    ifd: &mut IFD,
    external_data: &mut HashMap<(usize, u16), Vec<u8>>,
    ifd_index: usize,
    tag: u16,
    field_type: u16,
    count: u64,
    data: Vec<u8>
) {
    update_ifd_tag(ifd, tag, IFDEntry::new(tag, field_type, count, 0));
    external_data.insert((ifd_index, tag), data);
}

/// Store a small little-endian payload inline in the entry's value field
pub fn create_inline_tag(ifd: &mut IFD, tag: u16, field_type: u16, count: u64, data: &[u8]) {
    let mut raw_value = [0u8; 8];
    let len = data.len().min(raw_value.len());
    raw_value[..len].copy_from_slice(&data[..len]);
    let value = u32::from_le_bytes([raw_value[0], raw_value[1], raw_value[2], raw_value[3]]) as u64;

    update_ifd_tag(ifd, tag, IFDEntry::with_raw(tag, field_type, count, value, raw_value));
}
