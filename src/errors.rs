//! Custom error types for QA decoding and raster processing

use std::fmt;
use std::io;

use crate::qa::schema::{self, Band, Sensor};

/// Errors raised while resolving QA parameters or touching rasters
#[derive(Debug)]
pub enum QaError {
    /// I/O error
    IoError(io::Error),
    /// Invalid TIFF header
    InvalidHeader,
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    UnsupportedCompression(u64),
    /// Image dimensions not found
    MissingDimensions,
    /// Image dimensions the stored data cannot back
    InvalidDimensions { width: u64, height: u64, reason: String },
    /// Sensor string is not one of the known families
    InvalidSensor(String),
    /// Band string is not one of the known QA bands
    UnknownBand(String),
    /// The band is not produced for the sensor
    UnsupportedCombination { band: Band, sensor: Sensor },
    /// Flag name is not defined for the band and sensor
    UnknownFlag { flag: String, band: Band, sensor: Sensor },
    /// Raster pixels are not integers
    InvalidRasterType { raster: String, pixel_type: String },
    /// A raster or sidecar could not be written
    RasterWrite { path: String, reason: String },
    /// Configuration file problem
    Config(String),
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for QaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QaError::IoError(e) => write!(f, "I/O error: {}", e),
            QaError::InvalidHeader => write!(f, "Invalid TIFF header"),
            QaError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            QaError::InvalidBigTIFFHeader => write!(f, "Invalid BigTIFF header"),
            QaError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            QaError::TagNotFound(tag) => write!(f, "Tag not found: {}", tag),
            QaError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            QaError::UnsupportedCompression(c) => write!(f, "Unsupported compression method: {}", c),
            QaError::MissingDimensions => write!(f, "Image dimensions not found"),
            QaError::InvalidDimensions { width, height, reason } => write!(
                f, "Invalid image dimensions {}x{}: {}", width, height, reason
            ),
            QaError::InvalidSensor(input) => write!(
                f,
                "Incorrect sensor provided. Input: {}; potential options: {}",
                input,
                Sensor::all().iter().map(|s| s.display_name()).collect::<Vec<_>>().join(" | ")
            ),
            QaError::UnknownBand(input) => write!(
                f,
                "Unknown QA band: {}; potential options: {}",
                input,
                Band::all().iter().map(|b| b.name()).collect::<Vec<_>>().join(" | ")
            ),
            QaError::UnsupportedCombination { band, sensor } => write!(
                f,
                "Band {} is not available for {}; bands for this sensor: {}",
                band,
                sensor,
                sensor.bands().iter().map(|b| b.name()).collect::<Vec<_>>().join(" | ")
            ),
            QaError::UnknownFlag { flag, band, sensor } => {
                let known = schema::sorted_flags(*band, *sensor)
                    .map(|flags| flags.iter().map(|f| f.name).collect::<Vec<_>>().join(" | "))
                    .unwrap_or_default();
                write!(f, "Unknown flag '{}' for {} / {}; known flags: {}", flag, band, sensor, known)
            },
            QaError::InvalidRasterType { raster, pixel_type } => write!(
                f,
                "Raster {} has {} pixels; QA bands must be of integer type",
                raster, pixel_type
            ),
            QaError::RasterWrite { path, reason } => write!(f, "Failed to write {}: {}", path, reason),
            QaError::Config(msg) => write!(f, "Configuration error: {}", msg),
            QaError::GenericError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for QaError {}

impl From<io::Error> for QaError {
    fn from(error: io::Error) -> Self {
        QaError::IoError(error)
    }
}

/// Result type for QA operations
pub type QaResult<T> = Result<T, QaError>;

impl From<String> for QaError {
    fn from(msg: String) -> Self {
        QaError::GenericError(msg)
    }
}
