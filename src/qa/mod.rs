//! Landsat QA decoding and extraction
//!
//! `schema` and `policy` are static tables, `decoder` and `extractor` are
//! pure functions over raster values, and `workflow` drives a raster store
//! for one invocation.

pub mod schema;
pub mod policy;
pub mod decoder;
pub mod extractor;
pub mod workflow;

pub use decoder::{Decoder, Label, MatchResult};
pub use extractor::{Extraction, ExtractionRequest, FlagMatch};
pub use schema::{Band, Flag, RasterValue, Sensor};
pub use workflow::DecodeSummary;
