use log::{debug, error, info, warn};
use serde_json::{Map, Value};

use super::measurement::{MeasurementSnapshot, RegisterWindow};
use crate::modbus::client::Transport;
use crate::modbus::protocol::{
    validate_response, ModbusRequest, ResponseFrame, ADDRESS_REGISTER, GENERAL_ADDRESS,
    MAX_UNICAST_ADDRESS, MIN_UNICAST_ADDRESS,
};
use crate::utils::error::ModbusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Address used when an operation is not given one.
    pub default_address: u8,
    /// Emit hex dumps of every frame.
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_address: GENERAL_ADDRESS,
            debug: false,
        }
    }
}

/// Driver for a PZEM-016 meter reached through `T`.
///
/// Every operation is a single request followed by a single response; a failed
/// exchange is reported to the caller and never retried here.
pub struct Pzem016<T: Transport> {
    transport: T,
    config: SessionConfig,
    snapshot: MeasurementSnapshot,
}

impl<T: Transport> Pzem016<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            snapshot: MeasurementSnapshot::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Last successfully decoded reading.
    pub fn snapshot(&self) -> &MeasurementSnapshot {
        &self.snapshot
    }

    pub fn snapshot_as_map(&self) -> Map<String, Value> {
        self.snapshot.as_map()
    }

    /// Reads `window` from the meter and replaces the snapshot with it.
    ///
    /// Fields outside the window come back as zero. A CRC mismatch is logged
    /// but the payload is still decoded.
    pub fn request_data(&mut self, address: Option<u8>, window: RegisterWindow) -> bool {
        let address = address.unwrap_or(self.config.default_address);
        let request = ModbusRequest::ReadInputRegisters {
            address,
            start_register: window.start_register,
            quantity: window.register_count,
        };

        debug!(
            "📊 Reading {} registers from device {} starting at register {}",
            window.register_count, address, window.start_register
        );

        let frame = match self.exchange(&request) {
            Some(frame) => frame,
            None => return false,
        };

        if !frame.matches(address, request.function_code()) {
            warn!(
                "❌ Invalid response from device {}: address {}, function 0x{:02x}",
                address, frame.address, frame.function_code
            );
            return false;
        }
        if !frame.crc_ok {
            warn!("⚠️  CRC check failed for device {}, decoding anyway", address);
        }

        self.snapshot = MeasurementSnapshot::decode(&frame.payload, window.start_register);
        debug!("✅ Data received from device {} ({} bytes)", address, frame.payload.len());
        true
    }

    /// Reads the whole 10-register block.
    pub fn read_all(&mut self, address: Option<u8>) -> bool {
        self.request_data(address, RegisterWindow::ALL)
    }

    pub fn reset_energy(&mut self, address: Option<u8>) -> bool {
        let address = address.unwrap_or(self.config.default_address);
        let request = ModbusRequest::ResetEnergy { address };

        info!("🔄 Resetting energy counter on device {}", address);
        self.exchange(&request)
            .map(|frame| self.accept(&frame, &request))
            .unwrap_or(false)
    }

    /// Writes `new_address` into the address register of the meter currently at
    /// `old_address` (default address if `None`).
    ///
    /// Arguments are checked before anything is sent.
    pub fn set_address(&mut self, new_address: u8, old_address: Option<u8>) -> Result<bool, ModbusError> {
        if !(MIN_UNICAST_ADDRESS..=MAX_UNICAST_ADDRESS).contains(&new_address) {
            return Err(ModbusError::AddressOutOfRange(new_address));
        }

        let old_address = old_address.unwrap_or(self.config.default_address);
        if new_address == old_address {
            return Err(ModbusError::AddressUnchanged(old_address));
        }
        if new_address == GENERAL_ADDRESS {
            return Err(ModbusError::GeneralAddressNotAssignable);
        }

        let request = ModbusRequest::WriteSingleRegister {
            address: old_address,
            register: ADDRESS_REGISTER,
            value: new_address as u16,
        };

        info!("📝 Changing device address {} -> {}", old_address, new_address);
        Ok(self
            .exchange(&request)
            .map(|frame| self.accept(&frame, &request))
            .unwrap_or(false))
    }

    /// Asks the meter for its address. `None` queries through the general
    /// address, which only works with a single meter on the bus.
    pub fn get_address(&mut self, address: Option<u8>) -> Option<u16> {
        let address = address.unwrap_or(GENERAL_ADDRESS);
        let request = ModbusRequest::ReadHoldingRegister {
            address,
            register: ADDRESS_REGISTER,
        };

        let frame = self.exchange(&request)?;
        if !self.accept(&frame, &request) || frame.payload.len() < 2 {
            return None;
        }
        Some(u16::from_be_bytes([frame.payload[0], frame.payload[1]]))
    }

    /// Factory calibration. Always addressed to the general address.
    pub fn calibrate(&mut self) -> bool {
        let request = ModbusRequest::Calibrate;

        info!("🔧 Sending calibration command");
        self.exchange(&request)
            .map(|frame| self.accept(&frame, &request))
            .unwrap_or(false)
    }

    /// Sends `request` and splits the answer. `None` on transport failure or
    /// when fewer than 4 bytes came back.
    fn exchange(&mut self, request: &ModbusRequest) -> Option<ResponseFrame> {
        let frame = request.to_frame();
        let expected_len = request.expected_response_len();

        if self.config.debug {
            debug!("> {} ({} bytes, expecting {})", hex::encode(&frame), frame.len(), expected_len);
        }

        let raw = match self.transport.transact(&frame, expected_len) {
            Ok(raw) => raw,
            Err(e) => {
                error!("💥 Device {} - {}", request.address(), e);
                return None;
            }
        };

        if self.config.debug {
            debug!("< {} ({} bytes)", hex::encode(&raw), raw.len());
        }

        let response = validate_response(&raw);
        match &response {
            None => warn!("📵 No response from device {}", request.address()),
            Some(frame) if frame.is_exception() => warn!(
                "❌ Device {} answered with exception code {:?}",
                request.address(),
                frame.exception_code()
            ),
            Some(frame) if self.config.debug => debug!(
                "< CRC received {} ok={}",
                hex::encode(frame.crc_received),
                frame.crc_ok
            ),
            Some(_) => {}
        }
        response
    }

    /// Strict acceptance: CRC, function code and echoed address must all agree.
    fn accept(&self, frame: &ResponseFrame, request: &ModbusRequest) -> bool {
        if !frame.crc_ok {
            warn!("❌ CRC check failed for device {}", request.address());
            return false;
        }
        frame.matches(request.address(), request.function_code())
    }
}
