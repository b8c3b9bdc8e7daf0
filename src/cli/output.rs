use crate::cli::args::OutputFormat;
use crate::core::adc::AdcCalibration;
use crate::core::discovery::DiscoveredDevice;
use crate::core::zstage::ZStageState;
use crate::domain::config::PeriboardConfig;
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// Identity and diagnostics of one connected board.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub device_name: String,
    pub device_version: String,
    pub id: String,
    pub ram_free: u32,
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::PeriboardError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Device")]
    device_name: String,
    #[tabled(rename = "Version")]
    device_version: String,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&DiscoveredDevice> for DeviceRow {
    fn from(device: &DiscoveredDevice) -> Self {
        Self {
            port: device.port.clone(),
            device_name: device.device_name.clone(),
            device_version: device.device_version.clone(),
        }
    }
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn write_devices(&self, devices: &[DiscoveredDevice]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if devices.is_empty() {
                    println!("No devices found");
                }
                for device in devices {
                    println!(
                        "{}: {} (version {})",
                        device.port, device.device_name, device.device_version
                    );
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(devices)?);
            }
            OutputFormat::Table => {
                if !devices.is_empty() {
                    let rows: Vec<DeviceRow> = devices.iter().map(DeviceRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
        }
        Ok(())
    }

    pub fn write_info(&self, info: &DeviceInfo) -> Result<(), OutputError> {
        let fields = [
            ("device_name", info.device_name.clone()),
            ("device_version", info.device_version.clone()),
            ("id", info.id.clone()),
            ("ram_free", info.ram_free.to_string()),
        ];
        self.write_fields(info, &fields)
    }

    pub fn write_zstage_state(&self, state: &ZStageState) -> Result<(), OutputError> {
        let fields = [
            ("engaged_stop_enabled", state.engaged_stop_enabled.to_string()),
            ("home_stop_enabled", state.home_stop_enabled.to_string()),
            ("micro_stepping", state.micro_stepping.to_string()),
            ("motor_enabled", state.motor_enabled.to_string()),
            ("position", state.position.to_string()),
            ("rpm", state.rpm.to_string()),
        ];
        self.write_fields(state, &fields)
    }

    pub fn write_calibration(&self, calibration: &AdcCalibration) -> Result<(), OutputError> {
        let fields = [
            ("self_cal_gain", calibration.self_cal_gain.to_string()),
            ("self_cal_offset", calibration.self_cal_offset.to_string()),
            ("system_gain", calibration.system_gain.to_string()),
            ("system_offset", calibration.system_offset.to_string()),
        ];
        self.write_fields(calibration, &fields)
    }

    pub fn write_config(&self, config: &PeriboardConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            _ => {
                print!("{}", toml::to_string_pretty(config)?);
            }
        }
        Ok(())
    }

    pub fn write_message(&self, message: &str) -> Result<(), OutputError> {
        println!("{}", message);
        Ok(())
    }

    pub fn write_error(&self, error: &str) -> Result<(), OutputError> {
        eprintln!("Error: {}", error);
        Ok(())
    }

    fn write_fields<T: Serialize>(
        &self,
        value: &T,
        fields: &[(&str, String)],
    ) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for (field, value) in fields {
                    println!("{}: {}", field, value);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
            OutputFormat::Table => {
                let rows: Vec<FieldRow> = fields
                    .iter()
                    .map(|(field, value)| FieldRow {
                        field: field.to_string(),
                        value: value.clone(),
                    })
                    .collect();
                println!("{}", Table::new(rows));
            }
        }
        Ok(())
    }
}
