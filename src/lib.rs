pub mod errors;
pub mod config;
pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod qa;
pub mod raster;
pub mod commands;
pub mod api;

pub use crate::api::QaKit;
pub use crate::config::QaConfig;
pub use crate::errors::{QaError, QaResult};

pub use qa::{Band, Decoder, Label, Sensor};
pub use raster::{AttributeTable, MemoryRasterStore, RasterStore, TiffRasterStore};
pub use tiff::TiffReader;
