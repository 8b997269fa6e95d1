//! TIFF format utilities
//!
//! Byte order and TIFF/BigTIFF detection from the file header.

use log::debug;
use crate::io::seekable::SeekableReader;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::errors::{QaError, QaResult};
use crate::tiff::constants::header;
use crate::tiff::validation;

/// Detects the byte order of a TIFF file and returns it with its handler
pub fn detect_byte_order(reader: &mut dyn SeekableReader) -> QaResult<(ByteOrder, Box<dyn ByteOrderHandler>)> {
    let byte_order = ByteOrder::detect(reader)?;
    debug!("Detected byte order: {}", byte_order.name());

    Ok((byte_order, byte_order.create_handler()))
}

/// Detects whether a file is TIFF or BigTIFF based on its version number
///
/// # Arguments
/// * `reader` - Reader positioned just after the byte order marker
/// * `byte_order_handler` - Handler for the file's byte order
///
/// # Returns
/// A tuple with (is_big_tiff, version_number)
pub fn detect_tiff_format(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler
) -> QaResult<(bool, u16)> {
    let version = byte_order_handler.read_u16(reader)?;
    debug!("TIFF version: {}", version);

    let is_big_tiff = match version {
        header::BIG_TIFF_VERSION => {
            debug!("Detected BigTIFF format");
            validation::validate_bigtiff_header(reader, byte_order_handler)?;
            true
        },
        header::TIFF_VERSION => {
            debug!("Detected standard TIFF format");
            false
        },
        _ => return Err(QaError::UnsupportedVersion(version)),
    };

    Ok((is_big_tiff, version))
}
