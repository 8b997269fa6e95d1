//! Compression handling for raster strips and tiles
//!
//! Each supported TIFF compression code maps to a `CompressionHandler`
//! strategy; the factory picks one from a tag value or a config name.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod zstd;

pub use self::handler::CompressionHandler;
pub use self::uncompressed::UncompressedHandler;
pub use self::deflate::AdobeDeflateHandler;
pub use self::factory::CompressionFactory;
pub use self::zstd::ZstdHandler;
