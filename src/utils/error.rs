use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModbusError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Invalid response from device")]
    InvalidResponse,

    #[error("Address must be in the range 0x01 to 0xF7, got {0:#04x}")]
    AddressOutOfRange(u8),

    #[error("New address must be different from old address ({0:#04x})")]
    AddressUnchanged(u8),

    #[error("New address cannot be the general address 0xf8")]
    GeneralAddressNotAssignable,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ModbusError {
    /// True for the errors raised by argument validation, before any I/O.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            ModbusError::AddressOutOfRange(_)
                | ModbusError::AddressUnchanged(_)
                | ModbusError::GeneralAddressNotAssignable
        )
    }
}

impl From<serialport::Error> for ModbusError {
    fn from(err: serialport::Error) -> Self {
        ModbusError::ConnectionError(format!("Serial port error: {}", err))
    }
}

impl From<serde_json::Error> for ModbusError {
    fn from(err: serde_json::Error) -> Self {
        ModbusError::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for ModbusError {
    fn from(err: toml::de::Error) -> Self {
        ModbusError::ConfigError(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for ModbusError {
    fn from(err: toml::ser::Error) -> Self {
        ModbusError::SerializationError(format!("TOML error: {}", err))
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::TimedOut {
            return ModbusError::Timeout;
        }
        ModbusError::CommunicationError(format!("IO error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_kinds() {
        assert!(ModbusError::AddressOutOfRange(0).is_invalid_argument());
        assert!(ModbusError::AddressUnchanged(4).is_invalid_argument());
        assert!(ModbusError::GeneralAddressNotAssignable.is_invalid_argument());
        assert!(!ModbusError::Timeout.is_invalid_argument());
        assert!(!ModbusError::InvalidResponse.is_invalid_argument());
    }

    #[test]
    fn test_io_timeout_maps_to_timeout() {
        let err: ModbusError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(err, ModbusError::Timeout));

        let err: ModbusError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, ModbusError::CommunicationError(_)));
    }

    #[test]
    fn test_address_error_message() {
        let msg = ModbusError::AddressOutOfRange(0xF9).to_string();
        assert!(msg.contains("0xf9"));
    }
}
