use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::info;
use std::io::Write;

use crate::devices::{Pzem016, RegisterWindow};
use crate::modbus::client::Transport;
use crate::output::DataFormatter;
use crate::utils::error::ModbusError;

pub fn build_cli() -> Command {
    Command::new("pzem016")
        .version(crate::VERSION)
        .about("Read and configure a PZEM-016 RS-485 energy meter")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Serial port name (e.g. COM3 or /dev/ttyUSB0)"),
        )
        .arg(
            Arg::new("baud")
                .short('b')
                .long("baud")
                .value_parser(value_parser!(u32))
                .help("Baud rate (e.g. 9600)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_parser(value_parser!(u64))
                .help("Response timeout in milliseconds"),
        )
        .arg(
            Arg::new("address")
                .short('a')
                .long("address")
                .value_parser(value_parser!(u8))
                .help("Default device address (0xF8 = general address)"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_parser(["console", "json", "csv"])
                .default_value("json")
                .help("Output format for measurement data"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable debug output"),
        )
        .subcommand(Command::new("getAddr").about("Query the device address through the general address"))
        .subcommand(
            Command::new("setAddr").about("Set a new device address").arg(
                Arg::new("address")
                    .required(true)
                    .value_parser(value_parser!(u8))
                    .help("New Modbus address (1-247)"),
            ),
        )
        .subcommand(
            Command::new("getData")
                .about("Read all measurement data")
                .arg(
                    Arg::new("address")
                        .value_parser(value_parser!(u8))
                        .help("Optional device address"),
                )
                .arg(
                    Arg::new("register")
                        .short('r')
                        .long("register")
                        .value_parser(PossibleValuesParser::new(RegisterWindow::names().iter().copied()))
                        .default_value("all")
                        .help("Read only the registers of one field"),
                ),
        )
        .subcommand(
            Command::new("resetEnergy").about("Reset the energy counter").arg(
                Arg::new("address")
                    .value_parser(value_parser!(u8))
                    .help("Optional device address"),
            ),
        )
}

/// Runs the selected subcommand. `Ok(None)` when no subcommand was given,
/// otherwise whether the device operation succeeded.
pub fn handle_subcommands<T: Transport>(
    matches: &ArgMatches,
    meter: &mut Pzem016<T>,
    formatter: &dyn DataFormatter,
    out: &mut dyn Write,
) -> Result<Option<bool>, ModbusError> {
    match matches.subcommand() {
        Some(("getAddr", _)) => {
            info!("🔍 Executing getAddr command...");
            match meter.get_address(None) {
                Some(addr) => {
                    writeln!(out, "Address found: {}", addr)?;
                    Ok(Some(true))
                }
                None => {
                    writeln!(out, "Address could not be determined.")?;
                    Ok(Some(false))
                }
            }
        }
        Some(("setAddr", sub)) => {
            let new_address = sub.get_one::<u8>("address").copied().unwrap_or_default();
            info!("📝 Executing setAddr command ({})...", new_address);
            match meter.set_address(new_address, None) {
                Ok(true) => {
                    writeln!(out, "Address set successfully.")?;
                    Ok(Some(true))
                }
                Ok(false) => {
                    writeln!(out, "Setting the address failed.")?;
                    Ok(Some(false))
                }
                Err(e) if e.is_invalid_argument() => {
                    writeln!(out, "Error: {}", e)?;
                    Ok(Some(false))
                }
                Err(e) => Err(e),
            }
        }
        Some(("getData", sub)) => {
            let address = sub.get_one::<u8>("address").copied();
            let window = sub
                .get_one::<String>("register")
                .and_then(|name| RegisterWindow::from_name(name))
                .unwrap_or_default();
            info!("🔍 Executing getData command...");

            if meter.request_data(address, window) {
                let addr = address.unwrap_or(meter.config().default_address);
                let header = formatter.format_header();
                if !header.is_empty() {
                    write!(out, "{}", header)?;
                }
                writeln!(out, "{}", formatter.format_snapshot(addr, meter.snapshot()).trim_end())?;
                Ok(Some(true))
            } else {
                writeln!(out, "Reading data failed.")?;
                Ok(Some(false))
            }
        }
        Some(("resetEnergy", sub)) => {
            let address = sub.get_one::<u8>("address").copied();
            info!("🔄 Executing resetEnergy command...");
            if meter.reset_energy(address) {
                writeln!(out, "Energy counter reset.")?;
                Ok(Some(true))
            } else {
                writeln!(out, "Resetting energy failed.")?;
                Ok(Some(false))
            }
        }
        _ => Ok(None),
    }
}
