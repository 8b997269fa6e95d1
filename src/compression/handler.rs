//! Compression handler trait definition

use crate::errors::QaResult;

/// Strategy trait for handling different compression methods
pub trait CompressionHandler: Send + Sync {
    /// Decompress the data
    fn decompress(&self, data: &[u8]) -> QaResult<Vec<u8>>;

    /// Compress the data
    fn compress(&self, data: &[u8]) -> QaResult<Vec<u8>>;

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// Get the compression code written to the Compression tag
    fn code(&self) -> u16;
}
