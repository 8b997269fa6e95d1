//! TIFF builder strategy modules
//!
//! Strategy implementations for the TiffBuilder, organized by tag category.

pub mod basic_tags;
pub mod geo_tags;
pub mod metadata_tags;
pub mod writer;
