use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Size of the measurement block: 10 input registers.
pub const REGISTER_BLOCK_LEN: usize = 20;
pub const REGISTER_COUNT: u16 = 10;

const ALARM_ON: u16 = 0xFFFF;

/// A contiguous run of input registers inside the 10-register block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWindow {
    pub start_register: u16,
    pub register_count: u16,
}

impl RegisterWindow {
    pub const ALL: RegisterWindow = RegisterWindow::new(0, REGISTER_COUNT);
    pub const VOLTAGE: RegisterWindow = RegisterWindow::new(0, 1);
    pub const CURRENT: RegisterWindow = RegisterWindow::new(1, 2);
    pub const POWER: RegisterWindow = RegisterWindow::new(3, 2);
    pub const ENERGY: RegisterWindow = RegisterWindow::new(5, 2);
    pub const FREQUENCY: RegisterWindow = RegisterWindow::new(7, 1);
    pub const POWER_FACTOR: RegisterWindow = RegisterWindow::new(8, 1);
    pub const ALARM: RegisterWindow = RegisterWindow::new(9, 1);

    pub const fn new(start_register: u16, register_count: u16) -> Self {
        Self {
            start_register,
            register_count,
        }
    }

    /// Looks a window up by the name of the field it covers.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "all" => Some(Self::ALL),
            "voltage" => Some(Self::VOLTAGE),
            "current" => Some(Self::CURRENT),
            "power" => Some(Self::POWER),
            "energy" => Some(Self::ENERGY),
            "frequency" => Some(Self::FREQUENCY),
            "power_factor" | "pf" => Some(Self::POWER_FACTOR),
            "alarm" => Some(Self::ALARM),
            _ => None,
        }
    }

    pub fn names() -> &'static [&'static str] {
        &[
            "all",
            "voltage",
            "current",
            "power",
            "energy",
            "frequency",
            "power_factor",
            "alarm",
        ]
    }

    /// Offset of the window's first byte inside the register block.
    pub fn byte_offset(&self) -> usize {
        self.start_register as usize * 2
    }
}

impl Default for RegisterWindow {
    fn default() -> Self {
        Self::ALL
    }
}

/// One reading of the meter in engineering units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasurementSnapshot {
    /// V, 0.1 V per LSB.
    pub voltage: f64,
    /// A, 0.001 A per LSB, two registers.
    pub current: f64,
    /// W, 0.1 W per LSB, two registers.
    pub power: f64,
    /// Wh, 1 Wh per LSB, two registers.
    pub energy: f64,
    /// Hz, 0.1 Hz per LSB.
    pub frequency: f64,
    /// 0.01 per LSB.
    pub power_factor: f64,
    pub alarm: bool,
}

impl MeasurementSnapshot {
    /// Decodes a register payload that starts at `start_register`.
    ///
    /// The payload is placed into a zeroed 20-byte block at the register's byte
    /// offset, anything running past the block is dropped, and every field is
    /// decoded from the block. Registers not covered by the payload read as
    /// zero. Never fails.
    pub fn decode(payload: &[u8], start_register: u16) -> Self {
        let mut block = [0u8; REGISTER_BLOCK_LEN];
        let offset = (start_register as usize * 2).min(REGISTER_BLOCK_LEN);
        let len = payload.len().min(REGISTER_BLOCK_LEN - offset);
        block[offset..offset + len].copy_from_slice(&payload[..len]);

        Self {
            voltage: register(&block, 0) as f64 / 10.0,
            current: register_pair(&block, 1) as f64 / 1000.0,
            power: register_pair(&block, 3) as f64 / 10.0,
            energy: register_pair(&block, 5) as f64,
            frequency: register(&block, 7) as f64 / 10.0,
            power_factor: register(&block, 8) as f64 / 100.0,
            alarm: register(&block, 9) == ALARM_ON,
        }
    }

    /// Flat key/value view used by the output formatters.
    pub fn as_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("voltage".to_string(), Value::from(self.voltage));
        map.insert("current".to_string(), Value::from(self.current));
        map.insert("power".to_string(), Value::from(self.power));
        map.insert("energy".to_string(), Value::from(self.energy));
        map.insert("frequency".to_string(), Value::from(self.frequency));
        map.insert("power_factor".to_string(), Value::from(self.power_factor));
        map.insert("alarm".to_string(), Value::from(self.alarm));
        map
    }
}

impl fmt::Display for MeasurementSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Voltage: {} V", self.voltage)?;
        writeln!(f, "Current: {} A", self.current)?;
        writeln!(f, "Power: {} W", self.power)?;
        writeln!(f, "Energy: {} Wh", self.energy)?;
        writeln!(f, "Frequency: {} Hz", self.frequency)?;
        writeln!(f, "Power factor: {}", self.power_factor)?;
        write!(f, "Alarm: {}", self.alarm)
    }
}

fn register(block: &[u8; REGISTER_BLOCK_LEN], index: usize) -> u16 {
    u16::from_be_bytes([block[index * 2], block[index * 2 + 1]])
}

// Low register first, each register big-endian.
fn register_pair(block: &[u8; REGISTER_BLOCK_LEN], index: usize) -> u32 {
    register(block, index) as u32 | (register(block, index + 1) as u32) << 16
}
