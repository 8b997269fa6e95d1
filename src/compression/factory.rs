//! Factory for creating compression handlers

use crate::errors::{QaError, QaResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compression handler for the given Compression tag value
    pub fn create_handler(code: u64) -> QaResult<Box<dyn CompressionHandler>> {
        match u16::try_from(code) {
            Ok(compression::NONE) => Ok(Box::new(UncompressedHandler)),
            Ok(compression::DEFLATE) | Ok(compression::DEFLATE_OLD) => Ok(Box::new(AdobeDeflateHandler)),
            Ok(compression::ZSTD) => Ok(Box::new(ZstdHandler::new())),
            _ => Err(QaError::UnsupportedCompression(code))
        }
    }

    /// Get a handler by its configuration name
    pub fn get_handler_by_name(name: &str) -> QaResult<Box<dyn CompressionHandler>> {
        match name.to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Box::new(UncompressedHandler)),
            "deflate" | "zip" | "adobe deflate" => Ok(Box::new(AdobeDeflateHandler)),
            "zstd" => Ok(Box::new(ZstdHandler::new())),
            _ => Err(QaError::Config(format!(
                "Unknown compression type: {}; potential options: none | deflate | zstd", name
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handlers_by_code() {
        assert_eq!(CompressionFactory::create_handler(1).unwrap().name(), "Uncompressed");
        assert_eq!(CompressionFactory::create_handler(8).unwrap().code(), compression::DEFLATE);
        assert_eq!(CompressionFactory::create_handler(32946).unwrap().code(), compression::DEFLATE);
        assert_eq!(CompressionFactory::create_handler(50000).unwrap().code(), compression::ZSTD);
        assert!(matches!(CompressionFactory::create_handler(5), Err(QaError::UnsupportedCompression(5))));
        assert!(matches!(CompressionFactory::create_handler(70000), Err(QaError::UnsupportedCompression(70000))));
    }

    #[test]
    fn handlers_by_name() {
        assert_eq!(CompressionFactory::get_handler_by_name("ZSTD").unwrap().code(), compression::ZSTD);
        assert_eq!(CompressionFactory::get_handler_by_name("none").unwrap().code(), compression::NONE);
        assert!(matches!(CompressionFactory::get_handler_by_name("lzw"), Err(QaError::Config(_))));
    }

    #[test]
    fn compressed_strips_come_back_unchanged() {
        let strip: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        for name in ["none", "deflate", "zstd"] {
            let handler = CompressionFactory::get_handler_by_name(name).unwrap();
            let packed = handler.compress(&strip).unwrap();
            assert_eq!(handler.decompress(&packed).unwrap(), strip, "{}", name);
        }
    }
}
