//! QA flag extraction command
//!
//! Writes one binary raster per requested flag, or a single combined
//! raster, next to the given output basename.

use clap::ArgMatches;
use log::info;
use std::path::Path;

use crate::commands::command_traits::Command;
use crate::config::QaConfig;
use crate::errors::{QaError, QaResult};
use crate::qa::extractor::ExtractionRequest;
use crate::qa::workflow;
use crate::raster::TiffRasterStore;
use crate::utils::logger::Logger;

/// Command for extracting QA flags into binary rasters
pub struct ExtractCommand<'a> {
    /// Path to the input raster
    input_file: String,
    /// Output path prefix
    output: String,
    sensor: Option<String>,
    band: Option<String>,
    /// Flag names or `;`-separated flag lists
    flags: Vec<String>,
    combine: bool,
    config: QaConfig,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> ExtractCommand<'a> {
    /// Create a new extract command
    ///
    /// # Arguments
    /// * `args` - Matches of the `extract` subcommand
    /// * `config` - Loaded configuration
    /// * `logger` - Logger for recording operations
    pub fn new(args: &ArgMatches, config: QaConfig, logger: &'a Logger) -> QaResult<Self> {
        let input_file = args.get_one::<String>("input")
            .ok_or_else(|| QaError::GenericError("Missing input file".to_string()))?
            .clone();

        let output = args.get_one::<String>("output")
            .ok_or_else(|| QaError::GenericError("Missing output basename for extraction".to_string()))?
            .clone();

        let flags: Vec<String> = args.get_many::<String>("flags")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        if flags.is_empty() {
            return Err(QaError::GenericError("No flags requested".to_string()));
        }

        Ok(ExtractCommand {
            input_file,
            output,
            sensor: args.get_one::<String>("sensor").cloned(),
            band: args.get_one::<String>("band").cloned(),
            flags,
            combine: args.get_flag("combine"),
            config,
            logger,
        })
    }
}

impl<'a> Command for ExtractCommand<'a> {
    fn execute(&self) -> QaResult<()> {
        let input = Path::new(&self.input_file);
        let (sensor, band) = workflow::resolve_target(input, self.sensor.as_deref(), self.band.as_deref())?;
        info!("Extracting {:?} from {} ({} / {})", self.flags, self.input_file, band, sensor);

        let request = ExtractionRequest {
            sensor,
            band,
            flags: self.flags.clone(),
            combine: self.combine,
            basename: self.output.clone(),
        };

        let mut store = TiffRasterStore::new(self.logger, &self.config);
        let written = workflow::extract_raster(&mut store, input, &request)?;

        for path in &written {
            println!("{}", path.display());
        }
        self.logger.log(&format!("Extracted {} raster(s) from {}", written.len(), self.input_file))?;

        Ok(())
    }
}
