//! Periboard host library
//!
//! Host-side control of the periboard peripheral controller board:
//! serial device discovery, a single-connection session with
//! timeout-bounded command dispatch, and z-stage/ADC conveniences.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::adc::{read_calibration, AdcCalibration};
pub use crate::core::discovery::{discover, DiscoveredDevice};
pub use crate::core::protocol::{Command, ZStageSetting};
pub use crate::core::session::{
    DeviceSession, Monitor, SessionOptions, Transport, BAUD_RATE, DEFAULT_TIMEOUT, DEVICE_NAME,
};
pub use crate::core::zstage::{ZStage, ZStageState, ZStageUpdate};
pub use crate::domain::config::PeriboardConfig;
pub use crate::domain::error::{PeriboardError, PeriboardResult};
