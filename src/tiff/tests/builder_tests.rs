//! Tests for the TIFF builder and writer

extern crate std;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::tiff::builder::TiffBuilder;
use crate::tiff::builders::basic_tags::ChunkLayout;
use crate::tiff::constants::{compression, field_types, tags};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::reader::TiffReader;
use crate::utils::logger::Logger;

fn read_chunk(path: &std::path::Path, offset: u64, len: u64) -> Vec<u8> {
    let mut file = File::open(path).unwrap();
    file.seek(SeekFrom::Start(offset)).unwrap();
    let mut data = vec![0u8; len as usize];
    file.read_exact(&mut data).unwrap();
    data
}

#[test]
fn test_single_strip_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strip.tif");
    let logger = Logger::null();

    let mut builder = TiffBuilder::new(&logger, false);
    let ifd = builder.add_ifd(IFD::new(0, 0));
    builder.add_basic_gray_tags(ifd, 3, 2, 8, compression::NONE);
    builder.setup_single_strip(ifd, vec![1, 2, 3, 4, 5, 6]);
    builder.add_software_tag(ifd, "qakit");
    builder.write(path.to_str().unwrap()).unwrap();

    let mut reader = TiffReader::new(&logger);
    let tiff = reader.load(path.to_str().unwrap()).unwrap();
    let main = tiff.main_ifd().unwrap();

    std::assert_eq!(main.get_dimensions(), Some((3, 2)));
    std::assert_eq!(main.get_tag_value(tags::BITS_PER_SAMPLE), Some(8));
    std::assert_eq!(main.get_tag_value(tags::ROWS_PER_STRIP), Some(2));
    std::assert_eq!(main.get_tag_value(tags::STRIP_BYTE_COUNTS), Some(6));

    let offset = main.get_tag_value(tags::STRIP_OFFSETS).unwrap();
    std::assert_eq!(read_chunk(&path, offset, 6), vec![1, 2, 3, 4, 5, 6]);

    let mut file = reader.create_reader().unwrap();
    let software = reader.read_ascii(&mut file, main.get_entry(tags::SOFTWARE).unwrap()).unwrap();
    std::assert_eq!(software, "qakit");
}

#[test]
fn test_multiple_strips_get_offset_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strips.tif");
    let logger = Logger::null();

    let mut builder = TiffBuilder::new(&logger, false);
    let ifd = builder.add_ifd(IFD::new(0, 0));
    builder.add_basic_gray_tags(ifd, 2, 3, 8, compression::NONE);
    builder.setup_chunks(ifd, vec![vec![10, 11], vec![12, 13], vec![14, 15]], ChunkLayout::Strips { rows_per_strip: 1 });
    builder.write(path.to_str().unwrap()).unwrap();

    let mut reader = TiffReader::new(&logger);
    let tiff = reader.load(path.to_str().unwrap()).unwrap();
    let main = tiff.main_ifd().unwrap();
    let mut file = reader.create_reader().unwrap();

    let offsets = reader.read_tag_values(&mut file, main, tags::STRIP_OFFSETS).unwrap();
    let counts = reader.read_tag_values(&mut file, main, tags::STRIP_BYTE_COUNTS).unwrap();
    std::assert_eq!(counts, vec![2, 2, 2]);

    let strips: Vec<Vec<u8>> = offsets.iter().zip(&counts)
        .map(|(o, c)| read_chunk(&path, *o, *c))
        .collect();
    std::assert_eq!(strips, vec![vec![10, 11], vec![12, 13], vec![14, 15]]);
}

#[test]
fn test_inline_raw_values_survive_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inline.tif");
    let logger = Logger::null();

    let mut builder = TiffBuilder::new(&logger, false);
    let ifd = builder.add_ifd(IFD::new(0, 0));
    builder.add_basic_gray_tags(ifd, 1, 1, 8, compression::NONE);
    let mut raw = [0u8; 8];
    raw[..4].copy_from_slice(&[1, 0, 2, 0]);
    builder.set_tag(ifd, IFDEntry::with_raw(tags::MIN_SAMPLE_VALUE, field_types::SHORT, 2, 1, raw));
    builder.setup_single_strip(ifd, vec![0]);
    builder.write(path.to_str().unwrap()).unwrap();

    let mut reader = TiffReader::new(&logger);
    let tiff = reader.load(path.to_str().unwrap()).unwrap();
    let mut file = reader.create_reader().unwrap();
    let values = reader.read_tag_values(&mut file, tiff.main_ifd().unwrap(), tags::MIN_SAMPLE_VALUE).unwrap();
    std::assert_eq!(values, vec![1, 2]);
}
