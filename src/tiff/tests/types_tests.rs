//! Tests for the TIFF types module

extern crate std;

use crate::io::byte_order::ByteOrder;
use crate::tiff::types::TIFF;
use crate::tiff::ifd::{IFD, IFDEntry};

#[test]
fn test_tiff_creation() {
    let tiff = TIFF::new(false, ByteOrder::LittleEndian);
    std::assert!(!tiff.is_big_tiff);
    std::assert_eq!(tiff.ifd_count(), 0);
    std::assert!(tiff.main_ifd().is_none());
}

#[test]
fn test_tiff_with_ifds() {
    let mut tiff = TIFF::new(true, ByteOrder::BigEndian);

    let mut main_ifd = IFD::new(0, 16);
    main_ifd.add_entry(IFDEntry::new(256, 4, 1, 1024));
    main_ifd.add_entry(IFDEntry::new(257, 4, 1, 768));
    tiff.ifds.push(main_ifd);

    let mut mask_ifd = IFD::new(1, 100);
    mask_ifd.add_entry(IFDEntry::new(256, 4, 1, 512));
    tiff.ifds.push(mask_ifd);

    std::assert!(tiff.is_big_tiff);
    std::assert_eq!(tiff.ifd_count(), 2);
    std::assert_eq!(tiff.main_ifd().and_then(|ifd| ifd.get_dimensions()), Some((1024, 768)));
    std::assert!(tiff.to_string().contains("Big Endian"));
}

#[test]
fn test_ifd_tag_replacement() {
    let mut ifd = IFD::new(0, 8);
    ifd.add_entry(IFDEntry::new(259, 3, 1, 1));
    ifd.remove_tag(259);
    ifd.add_entry(IFDEntry::new(259, 3, 1, 8));

    std::assert_eq!(ifd.entries.len(), 1);
    std::assert_eq!(ifd.get_tag_value(259), Some(8));
    std::assert_eq!(ifd.get_samples_per_pixel(), 1);
    std::assert!(!ifd.is_tiled());
}

#[test]
fn test_inline_detection() {
    let short_pair = IFDEntry::new(258, 3, 2, 0);
    let double = IFDEntry::new(33550, 12, 1, 0);

    std::assert!(short_pair.is_value_inline(false));
    std::assert!(!double.is_value_inline(false));
    std::assert!(double.is_value_inline(true));
}
