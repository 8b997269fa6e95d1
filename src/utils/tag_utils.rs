//! TIFF tag utilities
//!
//! Utilities for decoding tag payloads and naming tags in log output.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::errors::{QaError, QaResult};
use crate::tiff::ifd::IFDEntry;
use crate::tiff::constants::{field_types, tags, compression};

/// Size in bytes of one value of a field type
pub fn get_field_type_size(field_type: u16) -> usize {
    match field_type {
        field_types::BYTE | field_types::ASCII | field_types::SBYTE | field_types::UNDEFINED => 1,
        field_types::SHORT | field_types::SSHORT => 2,
        field_types::LONG | field_types::SLONG | field_types::FLOAT => 4,
        field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE => 8,
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
        _ => 1,
    }
}

/// Reads `count` tag values, widening each to u64
///
/// Rationals are packed as numerator << 32 | denominator and floating point
/// values keep their IEEE bit pattern.
///
/// # Arguments
/// * `reader` - Reader positioned at the first value
/// * `entry` - The IFD entry with tag information
/// * `handler` - The byte order handler
/// * `values` - The vector to store values in
pub fn read_tag_value_array(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
    values: &mut Vec<u64>
) -> QaResult<()> {
    for _ in 0..entry.count {
        let value = match entry.field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => {
                reader.read_u8()? as u64
            },
            field_types::SHORT | field_types::SSHORT => handler.read_u16(reader)? as u64,
            field_types::LONG | field_types::SLONG => handler.read_u32(reader)? as u64,
            field_types::FLOAT => handler.read_f32(reader)?.to_bits() as u64,
            field_types::RATIONAL | field_types::SRATIONAL => {
                let (num, den) = handler.read_rational(reader)?;
                ((num as u64) << 32) | (den as u64)
            },
            field_types::DOUBLE => handler.read_f64(reader)?.to_bits(),
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(reader)?,
            _ => return Err(QaError::UnsupportedFieldType(entry.field_type)),
        };

        values.push(value);
    }

    Ok(())
}

/// Re-encodes a tag payload read in the source byte order as little-endian
///
/// The writer always emits little-endian files, so payloads copied from a
/// big-endian raster are rewritten value by value.
pub fn reencode_little_endian(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
) -> QaResult<Vec<u8>> {
    let mut out = Vec::with_capacity(get_field_type_size(entry.field_type) * entry.count as usize);

    for _ in 0..entry.count {
        match entry.field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => {
                out.write_u8(reader.read_u8()?)?
            },
            field_types::SHORT | field_types::SSHORT => out.write_u16::<LittleEndian>(handler.read_u16(reader)?)?,
            field_types::LONG | field_types::SLONG => out.write_u32::<LittleEndian>(handler.read_u32(reader)?)?,
            field_types::FLOAT => out.write_f32::<LittleEndian>(handler.read_f32(reader)?)?,
            field_types::RATIONAL | field_types::SRATIONAL => {
                let (num, den) = handler.read_rational(reader)?;
                out.write_u32::<LittleEndian>(num)?;
                out.write_u32::<LittleEndian>(den)?;
            },
            field_types::DOUBLE => out.write_f64::<LittleEndian>(handler.read_f64(reader)?)?,
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => {
                out.write_u64::<LittleEndian>(handler.read_u64(reader)?)?
            },
            _ => return Err(QaError::UnsupportedFieldType(entry.field_type)),
        }
    }

    Ok(out)
}

/// Get the name of a TIFF tag, or "Unknown"
pub fn get_tag_name(tag: u16) -> &'static str {
    match tag {
        tags::IMAGE_WIDTH => "ImageWidth",
        tags::IMAGE_LENGTH => "ImageLength",
        tags::BITS_PER_SAMPLE => "BitsPerSample",
        tags::COMPRESSION => "Compression",
        tags::PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation",
        tags::SAMPLES_PER_PIXEL => "SamplesPerPixel",
        tags::ROWS_PER_STRIP => "RowsPerStrip",
        tags::STRIP_OFFSETS => "StripOffsets",
        tags::STRIP_BYTE_COUNTS => "StripByteCounts",
        tags::MIN_SAMPLE_VALUE => "MinSampleValue",
        tags::MAX_SAMPLE_VALUE => "MaxSampleValue",
        tags::PLANAR_CONFIGURATION => "PlanarConfiguration",
        tags::SAMPLE_FORMAT => "SampleFormat",
        tags::PREDICTOR => "Predictor",
        tags::SOFTWARE => "Software",

        tags::TILE_OFFSETS => "TileOffsets",
        tags::TILE_BYTE_COUNTS => "TileByteCounts",
        tags::TILE_WIDTH => "TileWidth",
        tags::TILE_LENGTH => "TileLength",

        tags::MODEL_PIXEL_SCALE_TAG => "ModelPixelScale",
        tags::MODEL_TIEPOINT_TAG => "ModelTiepoint",
        tags::GEO_KEY_DIRECTORY_TAG => "GeoKeyDirectory",
        tags::GEO_DOUBLE_PARAMS_TAG => "GeoDoubleParams",
        tags::GEO_ASCII_PARAMS_TAG => "GeoAsciiParams",
        tags::MODEL_TRANSFORMATION_TAG => "ModelTransformation",

        tags::GDAL_NODATA => "GDALNoData",

        _ => "Unknown",
    }
}

/// Get the name of a TIFF field type
pub fn get_field_type_name(field_type: u16) -> &'static str {
    match field_type {
        field_types::BYTE => "BYTE",
        field_types::ASCII => "ASCII",
        field_types::SHORT => "SHORT",
        field_types::LONG => "LONG",
        field_types::RATIONAL => "RATIONAL",
        field_types::SBYTE => "SBYTE",
        field_types::UNDEFINED => "UNDEFINED",
        field_types::SSHORT => "SSHORT",
        field_types::SLONG => "SLONG",
        field_types::SRATIONAL => "SRATIONAL",
        field_types::FLOAT => "FLOAT",
        field_types::DOUBLE => "DOUBLE",
        field_types::LONG8 => "LONG8",
        field_types::SLONG8 => "SLONG8",
        field_types::IFD8 => "IFD8",
        _ => "Unknown",
    }
}

/// Get the name of a compression method
pub fn get_compression_name(compression_code: u64) -> &'static str {
    match compression_code as u16 {
        compression::NONE => "None",
        compression::LZW => "LZW",
        compression::JPEG => "JPEG",
        compression::DEFLATE | compression::DEFLATE_OLD => "Adobe Deflate",
        compression::PACKBITS => "PackBits",
        compression::ZSTD => "Zstandard",
        _ => "Unknown",
    }
}
