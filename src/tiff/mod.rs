//! TIFF file format module
//!
//! Reading of TIFF and BigTIFF headers and IFDs, and building of the
//! little-endian GeoTIFFs written by extraction.

pub mod ifd;
pub(crate) mod types;
pub mod reader;
pub mod builder;
pub mod builders;
pub mod constants;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::TIFF;
pub use builder::TiffBuilder;
pub use builders::basic_tags::ChunkLayout;
