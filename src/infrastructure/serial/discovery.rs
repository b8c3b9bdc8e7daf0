use crate::core::discovery::DiscoveredDevice;
use crate::core::protocol::{self, Command};
use crate::core::session::Monitor;
use crate::infrastructure::serial::link::SerialLink;
use crate::domain::error::{PeriboardError, PeriboardResult};
use std::time::Duration;
use tracing::{debug, info};

/// Enumerate serial ports and probe each one for a device identity.
///
/// Ports that fail to open or never answer are skipped; the returned
/// list contains only responders. Name filtering is the caller's
/// concern (`core::discovery::select_device`).
pub async fn available_devices(
    baud_rate: u32,
    timeout: Duration,
    settling_time: Duration,
) -> PeriboardResult<Vec<DiscoveredDevice>> {
    let ports = serialport::available_ports().map_err(|e| PeriboardError::Transport {
        reason: format!("failed to enumerate serial ports: {}", e),
    })?;

    let mut found = Vec::new();
    for info in ports {
        match probe_port(&info.port_name, baud_rate, timeout, settling_time).await {
            Ok(device) => {
                info!(
                    port = %device.port,
                    name = %device.device_name,
                    version = %device.device_version,
                    "identified device"
                );
                found.push(device);
            }
            Err(e) => {
                debug!(port = %info.port_name, error = %e, "port did not answer identity probe");
            }
        }
    }

    Ok(found)
}

/// Probe one port: open, settle, wait for the handshake, then query the
/// declared device name and version.
pub async fn probe_port(
    port: &str,
    baud_rate: u32,
    timeout: Duration,
    settling_time: Duration,
) -> PeriboardResult<DiscoveredDevice> {
    let link = SerialLink::open(port, baud_rate)?;
    let monitor = Monitor::start(Box::new(link));

    // Some firmware revisions drop bytes right after the port opens;
    // give the board a settle period before trusting anything it says.
    tokio::time::sleep(settling_time).await;

    tokio::time::timeout(timeout, monitor.connected())
        .await
        .map_err(|_| PeriboardError::ConnectionTimeout {
            port: port.to_string(),
        })??;

    let name = monitor.request(Command::DeviceName.encode(), timeout).await?;
    let version = monitor
        .request(Command::DeviceVersion.encode(), timeout)
        .await?;
    monitor.stop();

    Ok(DiscoveredDevice {
        port: port.to_string(),
        device_name: protocol::parse_text(&name)?,
        device_version: protocol::parse_text(&version)?,
    })
}
