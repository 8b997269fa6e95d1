//! Utility modules shared by the TIFF layer, raster stores and CLI

pub mod logger;
pub mod progress;
pub(crate) mod tiff_utils;
pub(crate) mod write_utils;
pub(crate) mod ifd_utils;
pub(crate) mod format_utils;
pub(crate) mod tag_utils;
