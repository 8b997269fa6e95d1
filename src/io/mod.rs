//! Low-level I/O shared by the TIFF reader and the sample decoders

pub mod seekable;
pub mod byte_order;
