use chrono::Utc;
use serde_json::Value;

use crate::devices::MeasurementSnapshot;

pub trait DataFormatter {
    fn format_snapshot(&self, addr: u8, data: &MeasurementSnapshot) -> String;
    fn format_header(&self) -> String;
}

/// Picks a formatter by its command-line name.
pub fn formatter_for(name: &str) -> Option<Box<dyn DataFormatter>> {
    match name {
        "console" => Some(Box::new(ConsoleFormatter)),
        "json" => Some(Box::new(JsonFormatter)),
        "csv" => Some(Box::new(CsvFormatter)),
        _ => None,
    }
}

pub struct ConsoleFormatter;

impl DataFormatter for ConsoleFormatter {
    fn format_snapshot(&self, addr: u8, data: &MeasurementSnapshot) -> String {
        format!("🔹 Device {} Data:\n{}\n", addr, data)
    }

    fn format_header(&self) -> String {
        format!("🚀 PZEM-016 Data - {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Pretty-printed flat mapping, nothing else.
pub struct JsonFormatter;

impl DataFormatter for JsonFormatter {
    fn format_snapshot(&self, _addr: u8, data: &MeasurementSnapshot) -> String {
        serde_json::to_string_pretty(&Value::Object(data.as_map())).unwrap_or_default()
    }

    fn format_header(&self) -> String {
        String::new() // JSON doesn't need headers
    }
}

pub struct CsvFormatter;

impl DataFormatter for CsvFormatter {
    fn format_snapshot(&self, addr: u8, data: &MeasurementSnapshot) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}\n",
            Utc::now().to_rfc3339(),
            addr,
            data.voltage,
            data.current,
            data.power,
            data.energy,
            data.frequency,
            data.power_factor,
            data.alarm
        )
    }

    fn format_header(&self) -> String {
        "Timestamp,Device,voltage,current,power,energy,frequency,power_factor,alarm\n".to_string()
    }
}
