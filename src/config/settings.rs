use clap::ArgMatches;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::devices::SessionConfig;
use crate::modbus::client::SerialSettings;
use crate::modbus::protocol::GENERAL_ADDRESS;
use crate::utils::error::ModbusError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Connection settings
    pub serial_port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub parity: ParityConfig,

    // Device settings
    pub default_address: u8,
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParityConfig {
    None,
    Even,
    Odd,
}

impl Default for Config {
    fn default() -> Self {
        let serial_port = if cfg!(target_os = "windows") {
            "COM3"
        } else {
            "/dev/ttyUSB0"
        };

        Self {
            serial_port: serial_port.to_string(),
            baud_rate: 9600,
            timeout_ms: 1000,
            parity: ParityConfig::None,
            default_address: GENERAL_ADDRESS,
            debug: false,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModbusError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ModbusError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;

        info!("⚙️  Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ModbusError> {
        // Create directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Command-line values win over whatever was loaded.
    pub fn apply_matches(&mut self, matches: &ArgMatches) {
        if let Some(port) = matches.get_one::<String>("port") {
            self.serial_port = port.clone();
        }
        if let Some(baud) = matches.get_one::<u32>("baud") {
            self.baud_rate = *baud;
        }
        if let Some(timeout) = matches.get_one::<u64>("timeout") {
            self.timeout_ms = *timeout;
        }
        if let Some(address) = matches.get_one::<u8>("address") {
            self.default_address = *address;
        }
        if matches.get_flag("debug") {
            self.debug = true;
        }
        debug!("Effective configuration: {:?}", self);
    }

    pub fn validate(&self) -> Result<(), ModbusError> {
        if self.serial_port.trim().is_empty() {
            return Err(ModbusError::ConfigError("serial_port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(ModbusError::ConfigError("baud_rate must be positive".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(ModbusError::ConfigError("timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings {
            port_name: self.serial_port.clone(),
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(self.timeout_ms),
            parity: self.parity,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            default_address: self.default_address,
            debug: self.debug,
        }
    }
}
