use crate::core::session::transport::{DeviceFrame, Request, Transport};
use crate::domain::error::{PeriboardError, PeriboardResult};
use async_trait::async_trait;
use serialport::SerialPort;
use std::io;
use std::time::Duration;
use tracing::{debug, info};

/// Poll cadence of the reader loop.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Blocking read timeout on the port handle. Short, so a quiet line
/// never stalls the listener for long.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// `serialport`-backed transport.
///
/// Frames are newline-delimited ASCII: requests as `<id> <payload>`,
/// device replies the same way, and the handshake banner is `!ready`.
/// Boot noise before the banner decodes as garbage and is skipped.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    rx_buffer: Vec<u8>,
}

impl SerialLink {
    /// Open a port at the given baud rate with the board's fixed 8N1
    /// line settings.
    pub fn open(port: &str, baud_rate: u32) -> PeriboardResult<Self> {
        let handle = serialport::new(port, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| PeriboardError::TransportOpen {
                port: port.to_string(),
                source,
            })?;

        info!(port, baud_rate, "serial port opened");

        Ok(Self {
            port: handle,
            rx_buffer: Vec::new(),
        })
    }

    /// Pop the next complete frame out of the receive buffer, skipping
    /// lines that do not decode (boot noise).
    fn take_frame(&mut self) -> Option<DeviceFrame> {
        while let Some(end) = self.rx_buffer.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.rx_buffer.drain(..=end).collect();
            match decode_frame(&line[..line.len() - 1]) {
                Some(frame) => return Some(frame),
                None => {
                    debug!(line = %String::from_utf8_lossy(&line), "skipping undecodable line");
                }
            }
        }
        None
    }
}

#[async_trait]
impl Transport for SerialLink {
    async fn send(&mut self, request: Request) -> PeriboardResult<()> {
        let bytes = encode_request(&request);
        debug!(
            id = request.id,
            raw = %hex::encode(&bytes),
            "writing frame"
        );

        self.port
            .write_all(&bytes)
            .and_then(|_| self.port.flush())
            .map_err(|e| PeriboardError::Transport {
                reason: format!("serial write failed: {}", e),
            })
    }

    async fn recv(&mut self) -> PeriboardResult<Option<DeviceFrame>> {
        let mut chunk = [0u8; 256];

        loop {
            if let Some(frame) = self.take_frame() {
                return Ok(Some(frame));
            }

            tokio::time::sleep(POLL_INTERVAL).await;

            match self.port.read(&mut chunk) {
                Ok(0) => continue,
                Ok(n) => self.rx_buffer.extend_from_slice(&chunk[..n]),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => {
                    return Err(PeriboardError::Transport {
                        reason: format!("serial read failed: {}", e),
                    })
                }
            }
        }
    }
}

fn encode_request(request: &Request) -> Vec<u8> {
    let mut bytes = format!("{} ", request.id).into_bytes();
    bytes.extend_from_slice(&request.payload);
    bytes.push(b'\n');
    bytes
}

fn decode_frame(line: &[u8]) -> Option<DeviceFrame> {
    let text = std::str::from_utf8(line).ok()?.trim_end_matches('\r');

    if text == "!ready" {
        return Some(DeviceFrame::Ready);
    }

    let (id, payload) = match text.split_once(' ') {
        Some((id, payload)) => (id, payload),
        None => (text, ""),
    };

    Some(DeviceFrame::Response {
        id: id.parse().ok()?,
        payload: payload.as_bytes().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_request() {
        let request = Request {
            id: 17,
            payload: b"ram_free".to_vec(),
        };
        assert_eq!(encode_request(&request), b"17 ram_free\n");
    }

    #[test]
    fn test_decode_ready_banner() {
        assert_eq!(decode_frame(b"!ready"), Some(DeviceFrame::Ready));
        assert_eq!(decode_frame(b"!ready\r"), Some(DeviceFrame::Ready));
    }

    #[test]
    fn test_decode_response() {
        assert_eq!(
            decode_frame(b"17 490"),
            Some(DeviceFrame::Response {
                id: 17,
                payload: b"490".to_vec()
            })
        );
        assert_eq!(
            decode_frame(b"3"),
            Some(DeviceFrame::Response {
                id: 3,
                payload: Vec::new()
            })
        );
    }

    #[test]
    fn test_boot_noise_is_skipped() {
        assert_eq!(decode_frame(b"\xff\xfegarbage"), None);
        assert_eq!(decode_frame(b"hello world"), None);
    }

    #[test]
    fn test_open_invalid_port_fails_with_transport_open() {
        let result = SerialLink::open("/dev/does-not-exist", 57_600);
        assert!(matches!(
            result,
            Err(PeriboardError::TransportOpen { .. })
        ));
    }
}
