//! Tests for the TIFF reader

extern crate std;

use std::io::Cursor;
use byteorder::{LittleEndian, ReadBytesExt};

use crate::errors::QaError;
use crate::io::byte_order::ByteOrder;
use crate::tiff::reader::TiffReader;
use crate::utils::logger::Logger;
use super::test_utils::{create_test_tiff_buffer, create_test_bigtiff_buffer, create_big_endian_tiff_buffer};

#[test]
fn test_read_classic_tiff() {
    let logger = Logger::null();
    let mut reader = TiffReader::new(&logger);
    let mut buffer = create_test_tiff_buffer();

    let tiff = reader.read(&mut buffer).unwrap();
    std::assert!(!tiff.is_big_tiff);
    std::assert_eq!(tiff.byte_order, ByteOrder::LittleEndian);
    std::assert_eq!(tiff.ifd_count(), 1);
    std::assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((800, 600)));
}

#[test]
fn test_read_bigtiff() {
    let logger = Logger::null();
    let mut reader = TiffReader::new(&logger);
    let mut buffer = create_test_bigtiff_buffer();

    let tiff = reader.read(&mut buffer).unwrap();
    std::assert!(tiff.is_big_tiff);
    std::assert!(reader.is_big_tiff());
    std::assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((1024, 768)));
}

#[test]
fn test_big_endian_inline_shorts() {
    let logger = Logger::null();
    let mut reader = TiffReader::new(&logger);
    let mut buffer = create_big_endian_tiff_buffer();

    let tiff = reader.read(&mut buffer).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    std::assert_eq!(tiff.byte_order, ByteOrder::BigEndian);
    std::assert_eq!(reader.byte_order(), Some(ByteOrder::BigEndian));
    std::assert_eq!(ifd.get_dimensions(), Some((7, 5)));
    std::assert_eq!(reader.read_tag_values(&mut buffer, ifd, 280).unwrap(), vec![16, 32]);
}

#[test]
fn test_external_doubles_reencoded_little_endian() {
    let logger = Logger::null();
    let mut reader = TiffReader::new(&logger);
    let mut buffer = create_big_endian_tiff_buffer();

    let tiff = reader.read(&mut buffer).unwrap();
    let entry = tiff.main_ifd().unwrap().get_entry(33550).unwrap().clone();

    let payload = reader.read_tag_payload_le(&mut buffer, &entry).unwrap();
    std::assert_eq!(payload.len(), 24);

    let mut cursor = Cursor::new(payload);
    std::assert_eq!(cursor.read_f64::<LittleEndian>().unwrap(), 30.0);
    std::assert_eq!(cursor.read_f64::<LittleEndian>().unwrap(), 30.0);
    std::assert_eq!(cursor.read_f64::<LittleEndian>().unwrap(), 0.0);
}

#[test]
fn test_missing_tag() {
    let logger = Logger::null();
    let mut reader = TiffReader::new(&logger);
    let mut buffer = create_test_tiff_buffer();

    let tiff = reader.read(&mut buffer).unwrap();
    let result = reader.read_tag_values(&mut buffer, tiff.main_ifd().unwrap(), 339);
    std::assert!(matches!(result, Err(QaError::TagNotFound(339))));
}

#[test]
fn test_reject_bad_version() {
    let logger = Logger::null();
    let mut reader = TiffReader::new(&logger);
    let mut buffer = Cursor::new(vec![0x49, 0x49, 0x2B, 0x01, 0, 0, 0, 0]);

    std::assert!(matches!(reader.read(&mut buffer), Err(QaError::UnsupportedVersion(299))));
}
