pub mod measurement;
pub mod pzem016;

pub use measurement::{MeasurementSnapshot, RegisterWindow};
pub use pzem016::{Pzem016, SessionConfig};
