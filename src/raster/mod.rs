//! Raster access for the QA workflows
//!
//! The `RasterStore` trait and its GeoTIFF and in-memory implementations,
//! the strip and tile sample readers, and the attribute table codec.

pub mod attribute_table;
pub mod memory;
pub mod pixel_type;
pub mod samples;
pub mod store;
pub mod strip_reader;
pub mod tile_reader;
pub mod tiff_store;

pub use attribute_table::{AttributeRow, AttributeTable};
pub use memory::MemoryRasterStore;
pub use pixel_type::PixelType;
pub use samples::SampleGrid;
pub use store::RasterStore;
pub use tiff_store::TiffRasterStore;
