use std::path::{Path, PathBuf};
use log::info;

use crate::config::QaConfig;
use crate::errors::QaResult;
use crate::qa::extractor::ExtractionRequest;
use crate::qa::schema::{Band, Flag};
use crate::qa::workflow::{self, DecodeSummary};
use crate::raster::TiffRasterStore;
use crate::utils::logger::Logger;

/// Main interface to the qakit library
pub struct QaKit {
    logger: Logger,
    config: QaConfig,
}

impl QaKit {
    /// Create a new QaKit instance
    ///
    /// # Arguments
    /// * `config` - Settings; `log_file` receives direct log messages
    ///
    /// # Returns
    /// A QaKit instance or an error if the configuration is invalid or the
    /// log file cannot be opened
    pub fn new(config: QaConfig) -> QaResult<Self> {
        config.validate()?;
        let logger = match &config.log_file {
            Some(path) => Logger::new(path)?,
            None => Logger::null(),
        };
        Ok(QaKit { logger, config })
    }

    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Decode a QA raster and write its attribute table
    ///
    /// # Arguments
    /// * `input_path` - QA GeoTIFF
    /// * `sensor` - Sensor name, or `None` to infer it from the file name
    /// * `band` - Band name, or `None` to infer it from the file name
    /// * `remove_low` - Leave low-confidence flags out of the labels
    pub fn decode<P: AsRef<Path>>(
        &self,
        input_path: P,
        sensor: Option<&str>,
        band: Option<&str>,
        remove_low: bool,
    ) -> QaResult<DecodeSummary> {
        let input = input_path.as_ref();
        info!("Decoding {}", input.display());

        let mut store = TiffRasterStore::new(&self.logger, &self.config);
        workflow::decode_raster(&mut store, input, sensor, band, remove_low, &self.config)
    }

    /// Extract flags into binary rasters
    ///
    /// # Arguments
    /// * `input_path` - QA GeoTIFF
    /// * `sensor` - Sensor name, or `None` to infer it from the file name
    /// * `band` - Band name, or `None` to infer it from the file name
    /// * `flags` - Flag names or `;`-separated flag lists
    /// * `combine` - Write a single raster for all flags
    /// * `basename` - Output path prefix
    ///
    /// # Returns
    /// Paths of the rasters written
    pub fn extract<P: AsRef<Path>, S: AsRef<str>>(
        &self,
        input_path: P,
        sensor: Option<&str>,
        band: Option<&str>,
        flags: &[S],
        combine: bool,
        basename: &str,
    ) -> QaResult<Vec<PathBuf>> {
        let input = input_path.as_ref();
        let (sensor, band) = workflow::resolve_target(input, sensor, band)?;

        let request = ExtractionRequest {
            sensor,
            band,
            flags: flags.iter().map(|f| f.as_ref().to_string()).collect(),
            combine,
            basename: basename.to_string(),
        };

        let mut store = TiffRasterStore::new(&self.logger, &self.config);
        workflow::extract_raster(&mut store, input, &request)
    }

    /// Flags of a sensor's bands, or of one band
    pub fn flags(&self, sensor: &str, band: Option<&str>) -> QaResult<Vec<(Band, Vec<&'static Flag>)>> {
        workflow::list_flags(None, Some(sensor), band)
    }
}
