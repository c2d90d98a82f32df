use log::{debug, error, info};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use crate::config::settings::ParityConfig;
use crate::utils::error::ModbusError;

/// One request/response exchange on the bus.
///
/// Implementations write `request` in full, then collect up to `expected_len`
/// bytes. A short or empty result is not an error: the caller decides what a
/// truncated reply means.
pub trait Transport {
    fn transact(&mut self, request: &[u8], expected_len: usize) -> Result<Vec<u8>, ModbusError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transact(&mut self, request: &[u8], expected_len: usize) -> Result<Vec<u8>, ModbusError> {
        (**self).transact(request, expected_len)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub timeout: Duration,
    pub parity: ParityConfig,
}

/// Serial transport that opens the port for every exchange and closes it
/// again when the exchange ends, whatever the outcome.
pub struct SerialTransport {
    settings: SerialSettings,
}

impl SerialTransport {
    pub fn new(settings: SerialSettings) -> Self {
        info!(
            "🔌 Serial transport on {} ({} baud, 8 data bits, 1 stop bit, parity {:?}, timeout {:?})",
            settings.port_name, settings.baud_rate, settings.parity, settings.timeout
        );
        Self { settings }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    fn open(&self) -> Result<Box<dyn SerialPort>, ModbusError> {
        let serial_parity = match self.settings.parity {
            ParityConfig::None => serialport::Parity::None,
            ParityConfig::Even => serialport::Parity::Even,
            ParityConfig::Odd => serialport::Parity::Odd,
        };

        serialport::new(self.settings.port_name.as_str(), self.settings.baud_rate)
            .timeout(self.settings.timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serial_parity)
            .open()
            .map_err(|e| {
                error!("❌ Failed to open serial port {}: {}", self.settings.port_name, e);
                ModbusError::ConnectionError(format!("Failed to open port: {}", e))
            })
    }
}

impl Transport for SerialTransport {
    fn transact(&mut self, request: &[u8], expected_len: usize) -> Result<Vec<u8>, ModbusError> {
        // Dropped at the end of this call, which closes the port.
        let mut port = self.open()?;

        port.write_all(request)
            .map_err(|e| ModbusError::CommunicationError(format!("Write failed: {}", e)))?;
        port.flush()
            .map_err(|e| ModbusError::CommunicationError(format!("Flush failed: {}", e)))?;
        debug!("📤 Sent {} bytes on {}", request.len(), self.settings.port_name);

        let response = read_response(&mut port, expected_len, self.settings.timeout)?;
        debug!(
            "📥 Received {}/{} bytes on {}",
            response.len(),
            expected_len,
            self.settings.port_name
        );
        Ok(response)
    }
}

/// Reads until `expected_len` bytes arrived, the reader times out, or
/// `timeout` elapsed. Whatever arrived is returned.
pub fn read_response<R: Read + ?Sized>(
    reader: &mut R,
    expected_len: usize,
    timeout: Duration,
) -> Result<Vec<u8>, ModbusError> {
    let mut response = vec![0u8; expected_len];
    let mut filled = 0;
    let deadline = Instant::now() + timeout;

    while filled < expected_len {
        match reader.read(&mut response[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                return Err(ModbusError::CommunicationError(format!("Read failed: {}", e)));
            }
        }
        if Instant::now() >= deadline {
            break;
        }
    }

    response.truncate(filled);
    Ok(response)
}
