//! In-memory raster store

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::QaResult;
use crate::qa::schema::RasterValue;
use crate::raster::attribute_table::AttributeTable;
use crate::raster::pixel_type::PixelType;
use crate::raster::samples::SampleGrid;
use crate::raster::store::RasterStore;

/// Raster store keeping rasters and results in memory
///
/// Every successful write is recorded and counted.
#[derive(Debug, Default)]
pub struct MemoryRasterStore {
    rasters: HashMap<PathBuf, (PixelType, SampleGrid)>,
    tables: HashMap<PathBuf, AttributeTable>,
    binaries: HashMap<PathBuf, SampleGrid>,
    writes: usize,
}

impl MemoryRasterStore {
    pub fn new() -> Self {
        MemoryRasterStore::default()
    }

    /// Registers a raster
    ///
    /// # Arguments
    /// * `path` - Key the raster is looked up by
    /// * `pixel_type` - Reported sample type
    /// * `width` - Row length; `values` holds whole rows
    /// * `values` - Row-major samples
    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, pixel_type: PixelType, width: usize, values: Vec<RasterValue>) {
        self.rasters.insert(path.into(), (pixel_type, SampleGrid::from_values(width, values)));
    }

    /// Attribute table last written for a raster
    pub fn attribute_table(&self, raster: &Path) -> Option<&AttributeTable> {
        self.tables.get(raster)
    }

    /// Binary raster written to `output`
    pub fn binary_raster(&self, output: &Path) -> Option<&SampleGrid> {
        self.binaries.get(output)
    }

    /// Number of tables and rasters written
    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn raster(&self, path: &Path) -> io::Result<&(PixelType, SampleGrid)> {
        self.rasters.get(path).ok_or_else(|| io::Error::new(
            io::ErrorKind::NotFound,
            format!("No raster registered at {}", path.display())
        ))
    }
}

impl RasterStore for MemoryRasterStore {
    fn pixel_type(&mut self, raster: &Path) -> QaResult<PixelType> {
        Ok(self.raster(raster)?.0)
    }

    fn read_value_counts(&mut self, raster: &Path) -> QaResult<BTreeMap<RasterValue, u64>> {
        Ok(self.raster(raster)?.1.value_counts())
    }

    fn write_attribute_table(&mut self, raster: &Path, table: &AttributeTable) -> QaResult<()> {
        self.raster(raster)?;
        self.tables.insert(raster.to_path_buf(), table.clone());
        self.writes += 1;
        Ok(())
    }

    fn write_binary_raster(
        &mut self,
        source: &Path,
        output: &Path,
        predicate: &dyn Fn(RasterValue) -> bool
    ) -> QaResult<()> {
        let grid = &self.raster(source)?.1;
        let values = grid.values.iter().map(|v| predicate(*v) as RasterValue).collect();
        let binary = SampleGrid::from_values(grid.width, values);

        self.binaries.insert(output.to_path_buf(), binary);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QaError;

    #[test]
    fn records_writes() {
        let mut store = MemoryRasterStore::new();
        store.insert("qa.tif", PixelType::Unsigned(16), 2, vec![2, 66, 2, 1]);

        let counts = store.read_value_counts(Path::new("qa.tif")).unwrap();
        assert_eq!(counts.get(&2), Some(&2));

        store.write_binary_raster(Path::new("qa.tif"), Path::new("out.tif"), &|v| v == 2).unwrap();
        assert_eq!(store.binary_raster(Path::new("out.tif")).unwrap().values, vec![1, 0, 1, 0]);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn unknown_raster_is_not_found() {
        let mut store = MemoryRasterStore::new();
        match store.pixel_type(Path::new("missing.tif")) {
            Err(QaError::IoError(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected {:?}", other),
        }
    }
}
