//! CLI command implementations
//!
//! One command object per subcommand, created by `QakitCommandFactory`.

pub mod command_traits;
pub mod decode_command;
pub mod extract_command;
pub mod flags_command;

pub use command_traits::{Command, CommandFactory};
pub use decode_command::DecodeCommand;
pub use extract_command::ExtractCommand;
pub use flags_command::FlagsCommand;

use clap::ArgMatches;
use crate::config::QaConfig;
use crate::errors::{QaError, QaResult};
use crate::utils::logger::Logger;

/// Factory for creating command instances based on CLI arguments
pub struct QakitCommandFactory {
    config: QaConfig,
}

impl QakitCommandFactory {
    /// Create a new factory handing `config` to every command
    pub fn new(config: QaConfig) -> Self {
        QakitCommandFactory { config }
    }
}

impl<'a> CommandFactory<'a> for QakitCommandFactory {
    fn create_command(&self, args: &ArgMatches, logger: &'a Logger) -> QaResult<Box<dyn Command + 'a>> {
        match args.subcommand() {
            Some(("decode", sub)) => Ok(Box::new(DecodeCommand::new(sub, self.config.clone(), logger)?)),
            Some(("extract", sub)) => Ok(Box::new(ExtractCommand::new(sub, self.config.clone(), logger)?)),
            Some(("flags", sub)) => Ok(Box::new(FlagsCommand::new(sub)?)),
            Some((other, _)) => Err(QaError::GenericError(format!("Unknown command: {}", other))),
            None => Err(QaError::GenericError(
                "No command given; potential options: decode | extract | flags".to_string())),
        }
    }
}
