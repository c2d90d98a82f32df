use super::crc::{crc16_bytes, crc16_modbus};

pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const READ_INPUT_REGISTERS: u8 = 0x04;
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
pub const CALIBRATE: u8 = 0x41;
pub const RESET_ENERGY: u8 = 0x42;

/// Broadcast address, never answered by a slave.
pub const BROADCAST_ADDRESS: u8 = 0x00;
/// General address used for calibration and when a lone meter's address is unknown.
pub const GENERAL_ADDRESS: u8 = 0xF8;
pub const MIN_UNICAST_ADDRESS: u8 = 0x01;
pub const MAX_UNICAST_ADDRESS: u8 = 0xF7;

/// Holding register that stores the slave address.
pub const ADDRESS_REGISTER: u16 = 0x0002;
/// Fixed password carried by the calibration frame.
pub const CALIBRATION_PASSWORD: u16 = 0x3721;

const MIN_RESPONSE_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModbusRequest {
    ReadInputRegisters {
        address: u8,
        start_register: u16,
        quantity: u16,
    },
    ReadHoldingRegister {
        address: u8,
        register: u16,
    },
    WriteSingleRegister {
        address: u8,
        register: u16,
        value: u16,
    },
    ResetEnergy {
        address: u8,
    },
    Calibrate,
}

impl ModbusRequest {
    pub fn address(&self) -> u8 {
        match *self {
            ModbusRequest::ReadInputRegisters { address, .. }
            | ModbusRequest::ReadHoldingRegister { address, .. }
            | ModbusRequest::WriteSingleRegister { address, .. }
            | ModbusRequest::ResetEnergy { address } => address,
            ModbusRequest::Calibrate => GENERAL_ADDRESS,
        }
    }

    pub fn function_code(&self) -> u8 {
        match self {
            ModbusRequest::ReadInputRegisters { .. } => READ_INPUT_REGISTERS,
            ModbusRequest::ReadHoldingRegister { .. } => READ_HOLDING_REGISTERS,
            ModbusRequest::WriteSingleRegister { .. } => WRITE_SINGLE_REGISTER,
            ModbusRequest::ResetEnergy { .. } => RESET_ENERGY,
            ModbusRequest::Calibrate => CALIBRATE,
        }
    }

    /// Number of bytes a well-formed reply to this request occupies on the wire.
    pub fn expected_response_len(&self) -> usize {
        match *self {
            // address + function + byte count + data + 2 CRC
            ModbusRequest::ReadInputRegisters { quantity, .. } => quantity as usize * 2 + 5,
            ModbusRequest::ReadHoldingRegister { .. } => 7,
            ModbusRequest::WriteSingleRegister { .. } => 8,
            ModbusRequest::ResetEnergy { .. } => 4,
            ModbusRequest::Calibrate => 6,
        }
    }

    /// Frame without the trailing CRC.
    pub fn pdu(&self) -> Vec<u8> {
        let mut request = vec![self.address(), self.function_code()];
        match *self {
            ModbusRequest::ReadInputRegisters {
                start_register,
                quantity,
                ..
            } => {
                request.extend_from_slice(&start_register.to_be_bytes());
                request.extend_from_slice(&quantity.to_be_bytes());
            }
            ModbusRequest::ReadHoldingRegister { register, .. } => {
                request.extend_from_slice(&register.to_be_bytes());
                request.extend_from_slice(&1u16.to_be_bytes());
            }
            ModbusRequest::WriteSingleRegister { register, value, .. } => {
                request.extend_from_slice(&register.to_be_bytes());
                request.extend_from_slice(&value.to_be_bytes());
            }
            ModbusRequest::ResetEnergy { .. } => {}
            ModbusRequest::Calibrate => {
                request.extend_from_slice(&CALIBRATION_PASSWORD.to_be_bytes());
            }
        }
        request
    }

    /// Complete frame, CRC appended low byte first.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = self.pdu();
        let crc = crc16_bytes(&frame);
        frame.extend_from_slice(&crc);
        frame
    }
}

/// A response split into its parts. The CRC result is advisory; the caller
/// decides whether a mismatch is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub address: u8,
    pub function_code: u8,
    /// Byte 2 of the response: byte count for reads, exception code for errors.
    pub count_byte: Option<u8>,
    pub payload: Vec<u8>,
    pub crc_received: [u8; 2],
    pub crc_ok: bool,
}

impl ResponseFrame {
    pub fn is_exception(&self) -> bool {
        self.function_code & 0x80 != 0
    }

    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() {
            self.count_byte
        } else {
            None
        }
    }

    /// Echoed function code and address both equal the expected ones.
    pub fn matches(&self, address: u8, function_code: u8) -> bool {
        self.address == address && self.function_code == function_code
    }
}

/// Splits a raw response. Returns `None` when fewer than 4 bytes arrived.
///
/// The byte count (byte 2) is skipped, not checked: the payload is everything
/// between it and the CRC.
pub fn validate_response(raw: &[u8]) -> Option<ResponseFrame> {
    if raw.len() < MIN_RESPONSE_LEN {
        return None;
    }

    let data_len = raw.len() - 2;
    let crc_received = [raw[data_len], raw[data_len + 1]];
    let crc_calculated = crc16_modbus(&raw[..data_len]).to_le_bytes();
    let payload = if data_len > 3 {
        raw[3..data_len].to_vec()
    } else {
        Vec::new()
    };

    Some(ResponseFrame {
        address: raw[0],
        function_code: raw[1],
        count_byte: if data_len > 2 { Some(raw[2]) } else { None },
        payload,
        crc_received,
        crc_ok: crc_calculated == crc_received,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_crc(prefix: &[u8]) -> Vec<u8> {
        let mut frame = prefix.to_vec();
        frame.extend_from_slice(&crc16_bytes(prefix));
        frame
    }

    #[test]
    fn test_read_input_registers_frame() {
        let request = ModbusRequest::ReadInputRegisters {
            address: 0xF8,
            start_register: 0,
            quantity: 10,
        };
        assert_eq!(
            request.to_frame(),
            vec![0xF8, 0x04, 0x00, 0x00, 0x00, 0x0A, 0x64, 0x64]
        );
        assert_eq!(request.expected_response_len(), 25);
    }

    #[test]
    fn test_read_window_frame_encodes_start_and_count() {
        let request = ModbusRequest::ReadInputRegisters {
            address: 0x01,
            start_register: 0x0107,
            quantity: 2,
        };
        assert_eq!(request.pdu(), vec![0x01, 0x04, 0x01, 0x07, 0x00, 0x02]);
        assert_eq!(request.expected_response_len(), 9);
    }

    #[test]
    fn test_read_holding_register_frame() {
        let request = ModbusRequest::ReadHoldingRegister {
            address: 0x01,
            register: ADDRESS_REGISTER,
        };
        assert_eq!(
            request.to_frame(),
            vec![0x01, 0x03, 0x00, 0x02, 0x00, 0x01, 0x25, 0xCA]
        );
        assert_eq!(request.expected_response_len(), 7);
    }

    #[test]
    fn test_write_single_register_frame() {
        let request = ModbusRequest::WriteSingleRegister {
            address: 0x01,
            register: ADDRESS_REGISTER,
            value: 0x0005,
        };
        assert_eq!(
            request.to_frame(),
            vec![0x01, 0x06, 0x00, 0x02, 0x00, 0x05, 0xE8, 0x09]
        );
        assert_eq!(request.expected_response_len(), 8);
    }

    #[test]
    fn test_reset_energy_frame_has_no_payload() {
        let request = ModbusRequest::ResetEnergy { address: 0xF8 };
        assert_eq!(request.to_frame(), vec![0xF8, 0x42, 0xC2, 0x41]);
        assert_eq!(request.expected_response_len(), 4);
    }

    #[test]
    fn test_calibrate_frame_uses_general_address() {
        let request = ModbusRequest::Calibrate;
        assert_eq!(request.address(), GENERAL_ADDRESS);
        assert_eq!(request.to_frame(), vec![0xF8, 0x41, 0x37, 0x21, 0xB7, 0x78]);
        assert_eq!(request.expected_response_len(), 6);
    }

    #[test]
    fn test_validate_rejects_short_response() {
        assert!(validate_response(&[]).is_none());
        assert!(validate_response(&[0xF8, 0x04]).is_none());
        assert!(validate_response(&[0xF8, 0x04, 0x02]).is_none());
    }

    #[test]
    fn test_validate_splits_read_response() {
        let raw = with_crc(&[0x01, 0x04, 0x02, 0x08, 0xF5]);
        let frame = validate_response(&raw).unwrap();

        assert_eq!(frame.address, 0x01);
        assert_eq!(frame.function_code, READ_INPUT_REGISTERS);
        assert_eq!(frame.count_byte, Some(0x02));
        assert_eq!(frame.payload, vec![0x08, 0xF5]);
        assert_eq!(frame.crc_received, [0x7E, 0xB7]);
        assert!(frame.crc_ok);
        assert!(frame.matches(0x01, READ_INPUT_REGISTERS));
    }

    #[test]
    fn test_validate_flags_crc_mismatch_without_failing() {
        let mut raw = with_crc(&[0xF8, 0x03, 0x02, 0x00, 0x05]);
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;

        let frame = validate_response(&raw).unwrap();
        assert!(!frame.crc_ok);
        assert_eq!(frame.payload, vec![0x00, 0x05]);
    }

    #[test]
    fn test_validate_four_byte_echo_has_empty_payload() {
        let frame = validate_response(&[0xF8, 0x42, 0xC2, 0x41]).unwrap();
        assert!(frame.crc_ok);
        assert!(frame.payload.is_empty());
        assert_eq!(frame.count_byte, None);
        assert!(frame.matches(0xF8, RESET_ENERGY));
    }

    #[test]
    fn test_built_frames_validate() {
        let requests = [
            ModbusRequest::ReadInputRegisters { address: 0x07, start_register: 3, quantity: 2 },
            ModbusRequest::ReadHoldingRegister { address: 0xF8, register: ADDRESS_REGISTER },
            ModbusRequest::WriteSingleRegister { address: 0x10, register: ADDRESS_REGISTER, value: 0x20 },
            ModbusRequest::ResetEnergy { address: 0x01 },
            ModbusRequest::Calibrate,
        ];
        for request in requests {
            let frame = validate_response(&request.to_frame()).unwrap();
            assert!(frame.crc_ok, "{:?}", request);
            assert!(frame.matches(request.address(), request.function_code()));
        }
    }

    #[test]
    fn test_exception_response() {
        let raw = with_crc(&[0xF8, RESET_ENERGY | 0x80, 0x01]);
        let frame = validate_response(&raw).unwrap();
        assert!(frame.crc_ok);
        assert!(frame.is_exception());
        assert_eq!(frame.exception_code(), Some(0x01));
        assert!(!frame.matches(0xF8, RESET_ENERGY));
    }
}
