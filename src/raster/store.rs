//! Raster store abstraction
//!
//! The QA workflows never touch files directly; they read sample values and
//! write results through this trait.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::errors::QaResult;
use crate::qa::schema::RasterValue;
use crate::raster::attribute_table::AttributeTable;
use crate::raster::pixel_type::PixelType;

/// Reads QA rasters and writes decode/extract results
pub trait RasterStore {
    /// Sample type of the raster's single band
    fn pixel_type(&mut self, raster: &Path) -> QaResult<PixelType>;

    /// Pixel count per distinct value, leaving out the raster's NoData value
    fn read_value_counts(&mut self, raster: &Path) -> QaResult<BTreeMap<RasterValue, u64>>;

    /// Distinct values present in the raster
    fn read_unique_values(&mut self, raster: &Path) -> QaResult<BTreeSet<RasterValue>> {
        Ok(self.read_value_counts(raster)?.into_keys().collect())
    }

    /// Attaches a value-keyed text attribute, replacing an existing one
    fn write_attribute_table(&mut self, raster: &Path, table: &AttributeTable) -> QaResult<()>;

    /// Writes an 8-bit raster holding 1 where `predicate` holds and 0 elsewhere
    ///
    /// Source pixels equal to the raster's NoData value stay NoData.
    ///
    /// # Arguments
    /// * `source` - Raster whose values are tested; its georeferencing is kept
    /// * `output` - Path of the new raster
    /// * `predicate` - Test applied to every source value
    fn write_binary_raster(
        &mut self,
        source: &Path,
        output: &Path,
        predicate: &dyn Fn(RasterValue) -> bool
    ) -> QaResult<()>;
}
