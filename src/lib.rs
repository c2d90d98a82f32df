//! PZEM-016 Energy Meter Library
//!
//! Host-side driver for the PZEM-016 AC energy meter over Modbus RTU: frame
//! codec with CRC16, register decoding into engineering units, a blocking
//! serial transport and a device session tying them together.

pub mod config;
pub mod modbus;
pub mod devices;
pub mod output;
pub mod utils;
pub mod cli;

// Re-export commonly used types
pub use config::Config;
pub use devices::{MeasurementSnapshot, Pzem016, RegisterWindow, SessionConfig};
pub use modbus::{SerialTransport, Transport};
pub use output::{DataFormatter, ConsoleFormatter, JsonFormatter, CsvFormatter};
pub use utils::error::ModbusError;

pub const VERSION: &str = "0.1.0";
