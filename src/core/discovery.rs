use crate::core::session::DEVICE_NAME;
use crate::domain::error::{PeriboardError, PeriboardResult};
use serde::Serialize;
use std::time::Duration;

/// Ephemeral record produced by enumerating one responding port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    pub port: String,
    pub device_name: String,
    pub device_version: String,
}

/// Pick the device to connect to from a set of probe results.
///
/// Zero responding candidates means nothing answered the identity probe
/// at all; candidates without a name match mean other hardware is
/// present on the bus but no periboard.
pub fn select_device<'a>(
    candidates: &'a [DiscoveredDevice],
    expected: &str,
) -> PeriboardResult<&'a DiscoveredDevice> {
    if candidates.is_empty() {
        return Err(PeriboardError::NoDeviceFound);
    }

    candidates
        .iter()
        .find(|device| device.device_name == expected)
        .ok_or_else(|| PeriboardError::NoMatchingDevice {
            expected: expected.to_string(),
        })
}

/// Enumerate serial ports, probe each responder, and return the first
/// periboard found.
pub async fn discover(
    baud_rate: u32,
    timeout: Duration,
    settling_time: Duration,
) -> PeriboardResult<DiscoveredDevice> {
    let candidates =
        crate::infrastructure::serial::available_devices(baud_rate, timeout, settling_time)
            .await?;
    select_device(&candidates, DEVICE_NAME).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(port: &str, name: &str) -> DiscoveredDevice {
        DiscoveredDevice {
            port: port.to_string(),
            device_name: name.to_string(),
            device_version: "1.0.0".to_string(),
        }
    }

    #[test]
    fn test_empty_candidates_is_no_device_found() {
        let result = select_device(&[], DEVICE_NAME);
        assert!(matches!(result, Err(PeriboardError::NoDeviceFound)));
    }

    #[test]
    fn test_responders_without_match_is_no_matching_device() {
        let candidates = vec![device("/dev/ttyUSB0", "other-board")];
        let result = select_device(&candidates, DEVICE_NAME);
        assert!(matches!(
            result,
            Err(PeriboardError::NoMatchingDevice { expected }) if expected == DEVICE_NAME
        ));
    }

    #[test]
    fn test_first_match_wins() {
        let candidates = vec![
            device("/dev/ttyUSB0", "other-board"),
            device("/dev/ttyUSB1", DEVICE_NAME),
            device("/dev/ttyUSB2", DEVICE_NAME),
        ];
        let selected = select_device(&candidates, DEVICE_NAME).unwrap();
        assert_eq!(selected.port, "/dev/ttyUSB1");
    }
}
