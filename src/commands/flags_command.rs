//! Flag listing command

use clap::ArgMatches;
use std::path::Path;

use crate::commands::command_traits::Command;
use crate::errors::QaResult;
use crate::qa::workflow;

/// Command listing the flags of a sensor's QA bands
pub struct FlagsCommand {
    /// Raster whose name the sensor and band are inferred from
    input_file: Option<String>,
    sensor: Option<String>,
    band: Option<String>,
}

impl FlagsCommand {
    pub fn new(args: &ArgMatches) -> QaResult<Self> {
        Ok(FlagsCommand {
            input_file: args.get_one::<String>("input").cloned(),
            sensor: args.get_one::<String>("sensor").cloned(),
            band: args.get_one::<String>("band").cloned(),
        })
    }
}

impl Command for FlagsCommand {
    fn execute(&self) -> QaResult<()> {
        let listing = workflow::list_flags(
            self.input_file.as_deref().map(Path::new),
            self.sensor.as_deref(),
            self.band.as_deref(),
        )?;

        for (band, flags) in listing {
            println!("{}", band);
            for flag in flags {
                let bits: Vec<String> = flag.bits.iter().map(|b| b.to_string()).collect();
                println!("  {:<40} [{}]", flag.name, bits.join(", "));
            }
        }

        Ok(())
    }
}
