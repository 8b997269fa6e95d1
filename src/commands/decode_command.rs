//! QA decode command
//!
//! Decodes every value of a QA raster and attaches the labels as the
//! raster's attribute table.

use clap::ArgMatches;
use log::info;
use std::path::Path;

use crate::commands::command_traits::Command;
use crate::config::QaConfig;
use crate::errors::{QaError, QaResult};
use crate::qa::workflow;
use crate::raster::TiffRasterStore;
use crate::utils::logger::Logger;

/// Command for decoding a QA raster
pub struct DecodeCommand<'a> {
    /// Path to the input raster
    input_file: String,
    sensor: Option<String>,
    band: Option<String>,
    /// Drop low-confidence flags from labels
    remove_low: bool,
    config: QaConfig,
    /// Logger for recording operations
    logger: &'a Logger,
}

impl<'a> DecodeCommand<'a> {
    /// Create a new decode command
    ///
    /// # Arguments
    /// * `args` - Matches of the `decode` subcommand
    /// * `config` - Loaded configuration
    /// * `logger` - Logger for recording operations
    pub fn new(args: &ArgMatches, config: QaConfig, logger: &'a Logger) -> QaResult<Self> {
        let input_file = args.get_one::<String>("input")
            .ok_or_else(|| QaError::GenericError("Missing input file".to_string()))?
            .clone();

        Ok(DecodeCommand {
            input_file,
            sensor: args.get_one::<String>("sensor").cloned(),
            band: args.get_one::<String>("band").cloned(),
            remove_low: args.get_flag("remove-low"),
            config,
            logger,
        })
    }
}

impl<'a> Command for DecodeCommand<'a> {
    fn execute(&self) -> QaResult<()> {
        info!("Decoding {}", self.input_file);
        let mut store = TiffRasterStore::new(self.logger, &self.config);

        let summary = workflow::decode_raster(
            &mut store,
            Path::new(&self.input_file),
            self.sensor.as_deref(),
            self.band.as_deref(),
            self.remove_low,
            &self.config,
        )?;

        println!("{} ({} / {})", self.input_file, summary.band, summary.sensor);
        println!("{:>10}  {:>12}  {}", "Value", "Count", summary.table.field());
        for row in summary.table.rows() {
            println!("{:>10}  {:>12}  {}", row.value, row.count, row.label);
        }

        if summary.anomalies > 0 {
            println!("{} value(s) carry an error label", summary.anomalies);
        }
        self.logger.log(&format!("Decoded {} values in {}", summary.rows(), self.input_file))?;

        Ok(())
    }
}
