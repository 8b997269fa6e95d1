//! IFD utilities
//!
//! Offsets and sizes of Image File Directories.

use log::debug;
use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::errors::QaResult;
use crate::tiff::ifd::IFD;

/// Reads an IFD offset (the header's first offset or an IFD's next pointer)
///
/// # Arguments
/// * `reader` - The seekable reader to use
/// * `is_big_tiff` - Whether the file is in BigTIFF format
/// * `byte_order_handler` - Handler for the file's byte order
///
/// # Returns
/// The offset, or 0 when the chain ends
pub fn read_ifd_offset(
    reader: &mut dyn SeekableReader,
    is_big_tiff: bool,
    byte_order_handler: &dyn ByteOrderHandler
) -> QaResult<u64> {
    let offset = if is_big_tiff {
        byte_order_handler.read_u64(reader)?
    } else {
        byte_order_handler.read_u32(reader)? as u64
    };
    debug!("Read IFD offset {}", offset);
    Ok(offset)
}

/// Calculates the size of an IFD in bytes, including the next-IFD pointer
pub fn calculate_ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
    if is_big_tiff {
        // 8 (entry count) + 20 (each entry) + 8 (next IFD offset)
        8 + (20 * ifd.entries.len() as u64) + 8
    } else {
        // 2 (entry count) + 12 (each entry) + 4 (next IFD offset)
        2 + (12 * ifd.entries.len() as u64) + 4
    }
}

/// Position of the pointer to the next IFD, just after the last entry
pub fn next_ifd_pointer_position(ifd: &IFD, is_big_tiff: bool) -> u64 {
    let pointer_size = if is_big_tiff { 8 } else { 4 };
    ifd.offset + calculate_ifd_size(ifd, is_big_tiff) - pointer_size
}
