use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Periboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriboardConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Device profile
    #[serde(default)]
    pub device: DeviceProfile,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Default request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Delay after opening a port before probing it, in milliseconds
    #[serde(default = "default_settling_time")]
    pub settling_time_ms: u64,
}

/// Device profile for the periboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Baud rate of the serial link. The firmware only speaks 57600;
    /// this is exposed for bench setups with non-standard bridges.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Z-stage motion parameters
    #[serde(default)]
    pub zstage: ZStageProfile,
}

/// Z-stage motion parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZStageProfile {
    /// Raised position in steps
    #[serde(default = "default_up_position")]
    pub up_position: i32,
    /// Lowered position in steps
    #[serde(default = "default_down_position")]
    pub down_position: i32,
    /// Position poll cadence while waiting for a move, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Upper bound on a single move, in milliseconds
    #[serde(default = "default_move_timeout")]
    pub move_timeout_ms: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    5000
}

fn default_settling_time() -> u64 {
    2500
}

fn default_baud_rate() -> u32 {
    57_600
}

fn default_up_position() -> i32 {
    1000
}

fn default_down_position() -> i32 {
    0
}

fn default_poll_interval() -> u64 {
    50
}

fn default_move_timeout() -> u64 {
    5000
}

impl Default for PeriboardConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            device: DeviceProfile::default(),
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            timeout_ms: default_timeout(),
            settling_time_ms: default_settling_time(),
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            zstage: ZStageProfile::default(),
        }
    }
}

impl Default for ZStageProfile {
    fn default() -> Self {
        Self {
            up_position: default_up_position(),
            down_position: default_down_position(),
            poll_interval_ms: default_poll_interval(),
            move_timeout_ms: default_move_timeout(),
        }
    }
}

impl GlobalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settling_time(&self) -> Duration {
        Duration::from_millis(self.settling_time_ms)
    }
}

impl ZStageProfile {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn move_timeout(&self) -> Duration {
        Duration::from_millis(self.move_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = PeriboardConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let _deserialized: PeriboardConfig = toml::from_str(&toml_str).unwrap();
    }

    #[test]
    fn test_config_defaults() {
        let config = PeriboardConfig::default();

        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.global.timeout_ms, 5000);
        assert_eq!(config.global.settling_time_ms, 2500);
        assert_eq!(config.device.baud_rate, 57_600);
        assert_eq!(config.device.zstage.down_position, 0);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: PeriboardConfig = toml::from_str(
            r#"
            [device.zstage]
            up_position = 825
            "#,
        )
        .unwrap();

        assert_eq!(config.device.zstage.up_position, 825);
        assert_eq!(config.device.zstage.down_position, 0);
        assert_eq!(config.global.timeout_ms, 5000);
    }

    #[test]
    fn test_duration_accessors() {
        let config = PeriboardConfig::default();
        assert_eq!(config.global.timeout(), Duration::from_secs(5));
        assert_eq!(
            config.device.zstage.poll_interval(),
            Duration::from_millis(50)
        );
    }
}
