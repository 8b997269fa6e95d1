use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand};
use std::path::Path;
use std::process;
use log::error;

use qakit::commands::{CommandFactory, QakitCommandFactory};
use qakit::config::QaConfig;
use qakit::utils::logger::Logger;

fn sensor_arg() -> Arg {
    Arg::new("sensor")
        .short('s')
        .long("sensor")
        .help("Sensor: \"Landsat 8\" (L8) or \"Landsat 4-5, 7\" (L47); inferred from the file name if omitted")
        .value_name("SENSOR")
}

fn band_arg() -> Arg {
    Arg::new("band")
        .short('b')
        .long("band")
        .help("QA band: BQA, pixel_qa, radsat_qa, sr_aerosol or sr_cloud_qa; inferred from the file name if omitted")
        .value_name("BAND")
}

fn cli() -> ClapCommand {
    ClapCommand::new("qakit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Decode and extract Landsat QA band bit flags")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Configuration file (defaults to ./qakit.toml when present)")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Append log records to this file")
                .value_name("FILE")
                .global(true),
        )
        .subcommand(
            ClapCommand::new("decode")
                .about("Write a readable label for every value of a QA raster to its attribute table")
                .arg(
                    Arg::new("input")
                        .help("Input QA raster")
                        .required(true)
                        .index(1),
                )
                .arg(sensor_arg())
                .arg(band_arg())
                .arg(
                    Arg::new("remove-low")
                        .long("remove-low")
                        .help("Leave low-confidence flags out of the labels")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            ClapCommand::new("extract")
                .about("Write binary rasters marking the pixels that carry the given flags")
                .arg(
                    Arg::new("input")
                        .help("Input QA raster")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("flags")
                        .short('f')
                        .long("flags")
                        .help("Flag names; repeat the option or separate names with ';'")
                        .value_name("NAMES")
                        .required(true)
                        .num_args(1)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("combine")
                        .long("combine")
                        .help("Write one raster for all flags instead of one per flag")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Output basename; flag name and input extension are appended")
                        .value_name("BASENAME")
                        .required(true),
                )
                .arg(sensor_arg())
                .arg(band_arg()),
        )
        .subcommand(
            ClapCommand::new("flags")
                .about("List the flags of a sensor's QA bands")
                .arg(
                    Arg::new("input")
                        .help("Raster whose file name names the sensor and band")
                        .index(1),
                )
                .arg(sensor_arg())
                .arg(band_arg()),
        )
}

/// Global option value given before or after the subcommand
fn global_value(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.subcommand()
        .and_then(|(_, sub)| sub.get_one::<String>(id).cloned())
        .or_else(|| matches.get_one::<String>(id).cloned())
}

fn global_flag(matches: &ArgMatches, id: &str) -> bool {
    matches.get_flag(id) || matches.subcommand().map(|(_, sub)| sub.get_flag(id)).unwrap_or(false)
}

fn main() {
    let matches = cli().get_matches();

    let config_path = global_value(&matches, "config");
    let config = match QaConfig::load(config_path.as_deref().map(Path::new)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let log_file = global_value(&matches, "log-file")
        .or_else(|| config.log_file.clone());

    let logger = match log_file.as_deref().map(Logger::new).transpose() {
        Ok(logger) => logger.unwrap_or_else(Logger::null),
        Err(e) => {
            eprintln!("Error initializing logger: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = Logger::init_global_logger(log_file.as_deref(), global_flag(&matches, "verbose")) {
        eprintln!("Error setting up global logger: {}", e);
        process::exit(1);
    }

    let factory = QakitCommandFactory::new(config);

    match factory.create_command(&matches, &logger) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_flags(args: &[&str]) -> (Vec<String>, String) {
        let matches = cli().try_get_matches_from(args).unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let flags = sub.get_many::<String>("flags").unwrap().cloned().collect();
        let input = sub.get_one::<String>("input").unwrap().clone();
        (flags, input)
    }

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn flags_take_one_value_per_option() {
        let (flags, input) = extract_flags(&["qakit", "extract", "--flags", "Cloud", "scene.tif", "-o", "out"]);
        assert_eq!(flags, vec!["Cloud"]);
        assert_eq!(input, "scene.tif");

        let (flags, _) = extract_flags(&["qakit", "extract", "scene.tif", "-f", "Cloud", "-f", "Water;Snow", "-o", "out"]);
        assert_eq!(flags, vec!["Cloud", "Water;Snow"]);
    }
}
