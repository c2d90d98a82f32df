pub mod client;
pub mod protocol;
pub mod crc;

pub use client::{SerialSettings, SerialTransport, Transport};
pub use protocol::{validate_response, ModbusRequest, ResponseFrame};
pub use crc::{crc16_bytes, crc16_modbus};
