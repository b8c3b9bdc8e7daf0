use periboard::core::discovery::{select_device, DiscoveredDevice};
use periboard::{Command, PeriboardConfig, PeriboardError, ZStageSetting, DEVICE_NAME};
use std::time::Duration;
use tokio::time::timeout;

/// Integration tests for the periboard library
#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = PeriboardConfig::default();
        let toml_str = toml::to_string(&config).expect("Failed to serialize config");
        let deserialized: PeriboardConfig =
            toml::from_str(&toml_str).expect("Failed to deserialize config");

        assert_eq!(config.global.timeout_ms, deserialized.global.timeout_ms);
        assert_eq!(config.global.log_level, deserialized.global.log_level);
        assert_eq!(
            config.device.zstage.up_position,
            deserialized.device.zstage.up_position
        );
    }

    #[test]
    fn test_config_defaults() {
        let config = PeriboardConfig::default();

        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.global.timeout_ms, 5000);
        assert_eq!(config.global.settling_time_ms, 2500);
        assert_eq!(config.device.baud_rate, 57_600);
    }

    #[test]
    fn test_error_display() {
        let error = PeriboardError::Config {
            message: "invalid configuration".to_string(),
        };
        assert!(error.to_string().contains("configuration error"));
        assert!(error.to_string().contains("invalid configuration"));
    }

    #[test]
    fn test_command_encoding() {
        assert_eq!(Command::RamFree.encode(), b"ram_free");
        assert_eq!(
            Command::ZStageSet(ZStageSetting::HomeStopEnabled(false)).encode(),
            b"zstage.disable_home_stop"
        );
    }

    #[test]
    fn test_device_selection_taxonomy() {
        assert!(matches!(
            select_device(&[], DEVICE_NAME),
            Err(PeriboardError::NoDeviceFound)
        ));

        let strangers = vec![DiscoveredDevice {
            port: "/dev/ttyACM3".to_string(),
            device_name: "other-board".to_string(),
            device_version: "2.1.0".to_string(),
        }];
        assert!(matches!(
            select_device(&strangers, DEVICE_NAME),
            Err(PeriboardError::NoMatchingDevice { .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_behavior() {
        // Long-running operations can be timed out.
        let result = timeout(Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "completed"
        })
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_monitor_roundtrip_without_runtime_macro() {
        use periboard::infrastructure::sim::SimDevice;
        use periboard::Monitor;

        tokio_test::block_on(async {
            let monitor = Monitor::start(Box::new(SimDevice::new()));
            monitor.connected().await.unwrap();
            let reply = monitor
                .request(Command::RamFree.encode(), Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(reply, b"490");
        });
    }
}
