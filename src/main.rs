use anyhow::{Context, Result};
use log::{debug, LevelFilter};
use std::io;
use std::process::ExitCode;

use pzem016_rust::cli::{build_cli, handle_subcommands};
use pzem016_rust::output::formatter_for;
use pzem016_rust::{Config, Pzem016, SerialTransport};

fn main() -> Result<ExitCode> {
    let mut command = build_cli();
    let matches = command.clone().get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path).with_context(|| format!("Failed to load config file {path:?}"))?,
        None => Config::default(),
    };
    config.apply_matches(&matches);
    config.validate().context("Invalid configuration")?;

    let level = if config.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
    debug!("🖥️  PZEM-016 tool v{}", pzem016_rust::VERSION);

    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("json");
    let formatter = formatter_for(format).with_context(|| format!("Unknown output format {format:?}"))?;

    let transport = SerialTransport::new(config.serial_settings());
    let mut meter = Pzem016::new(transport, config.session_config());

    let mut stdout = io::stdout().lock();
    match handle_subcommands(&matches, &mut meter, formatter.as_ref(), &mut stdout)? {
        Some(true) => Ok(ExitCode::SUCCESS),
        Some(false) => Ok(ExitCode::FAILURE),
        None => {
            command.print_help()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
