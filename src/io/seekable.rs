//! Seekable reader trait
//!
//! Raster files, in-memory buffers in tests and decompressed chunks are all
//! read through the same trait object.

use std::io::{Read, Seek};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

// Blanket implementation for any type that implements the required traits
impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
