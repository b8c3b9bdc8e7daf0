use crate::core::protocol::Command;
use crate::core::session::monitor::Monitor;
use crate::core::session::transport::Transport;
use crate::domain::config::PeriboardConfig;
use crate::domain::error::{PeriboardError, PeriboardResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Device name the firmware reports during the identity handshake.
pub const DEVICE_NAME: &str = "periboard";

/// Baud rate mandated by the firmware.
pub const BAUD_RATE: u32 = 57_600;

/// Request timeout used when the caller does not supply one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for establishing a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub baud_rate: u32,
    pub default_timeout: Duration,
    pub settling_time: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            default_timeout: DEFAULT_TIMEOUT,
            settling_time: Duration::from_millis(2500),
        }
    }
}

impl From<&PeriboardConfig> for SessionOptions {
    fn from(config: &PeriboardConfig) -> Self {
        Self {
            baud_rate: config.device.baud_rate,
            default_timeout: config.global.timeout(),
            settling_time: config.global.settling_time(),
        }
    }
}

/// Factory producing a fresh transport for a port, invoked on every
/// `connect()`. Lets tests and `--sim` substitute an in-memory device.
pub type TransportOpener =
    dyn Fn(&str, u32) -> PeriboardResult<Box<dyn Transport>> + Send + Sync;

/// One logical connection to a physical periboard.
///
/// Holds at most one active monitor; `connect()` tears down any existing
/// monitor before opening a new transport, and dropping the session
/// releases the link on every exit path.
pub struct DeviceSession {
    port: String,
    baud_rate: u32,
    default_timeout: Duration,
    monitor: Option<Monitor>,
    opener: Box<TransportOpener>,
    transaction_lock: Arc<Mutex<()>>,
}

impl DeviceSession {
    /// Create an unconnected session for a serial port.
    pub fn new(port: impl Into<String>, options: SessionOptions) -> Self {
        Self::with_opener(
            port,
            options,
            Box::new(|port: &str, baud_rate: u32| {
                let link = crate::infrastructure::serial::SerialLink::open(port, baud_rate)?;
                Ok(Box::new(link) as Box<dyn Transport>)
            }),
        )
    }

    /// Create an unconnected session with a custom transport factory.
    pub fn with_opener(
        port: impl Into<String>,
        options: SessionOptions,
        opener: Box<TransportOpener>,
    ) -> Self {
        Self {
            port: port.into(),
            baud_rate: options.baud_rate,
            default_timeout: options.default_timeout,
            monitor: None,
            opener,
            transaction_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Discover the board (or use an explicit port) and connect to it.
    ///
    /// Fails fast: any failure after the transport opens releases the
    /// link before the error propagates, so no handle leaks out of a
    /// half-constructed session.
    pub async fn establish(
        port: Option<String>,
        options: SessionOptions,
    ) -> PeriboardResult<Self> {
        let port = match port {
            Some(port) => port,
            None => {
                let device = crate::core::discovery::discover(
                    options.baud_rate,
                    options.default_timeout,
                    options.settling_time,
                )
                .await?;
                info!(port = %device.port, version = %device.device_version, "discovered device");
                device.port
            }
        };

        let mut session = Self::new(port, options);
        session.connect().await?;
        Ok(session)
    }

    /// Open the transport and block until the device signals ready.
    ///
    /// Reconnection is idempotent: an existing monitor is stopped first,
    /// so exactly one monitor is active afterwards, never two.
    pub async fn connect(&mut self) -> PeriboardResult<()> {
        self.terminate();

        let transport = (self.opener)(&self.port, self.baud_rate)?;
        let monitor = Monitor::start(transport);

        match tokio::time::timeout(self.default_timeout, monitor.connected()).await {
            Ok(Ok(())) => {
                info!(port = %self.port, "session connected");
                self.monitor = Some(monitor);
                Ok(())
            }
            Ok(Err(e)) => {
                monitor.stop();
                Err(e)
            }
            Err(_) => {
                monitor.stop();
                Err(PeriboardError::ConnectionTimeout {
                    port: self.port.clone(),
                })
            }
        }
    }

    /// Forward a raw payload to the device and wait for its reply.
    ///
    /// Uses the session default timeout when the caller does not supply
    /// one. A timeout leaves the session connected; a transport failure
    /// means the link is gone and `connect()` must be called again.
    pub async fn send_command(
        &self,
        payload: impl Into<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> PeriboardResult<Vec<u8>> {
        let monitor = self.monitor.as_ref().ok_or(PeriboardError::NotConnected)?;
        let timeout = timeout.unwrap_or(self.default_timeout);
        debug!(?timeout, "sending command");
        monitor.request(payload.into(), timeout).await
    }

    /// Encode and dispatch a typed command.
    pub async fn execute(
        &self,
        command: &Command,
        timeout: Option<Duration>,
    ) -> PeriboardResult<Vec<u8>> {
        debug!(command = %command, "executing");
        self.send_command(command.encode(), timeout).await
    }

    /// Stop the monitor and release the transport. Idempotent: calling
    /// this on a closed session is a no-op.
    pub fn terminate(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
            info!(port = %self.port, "session terminated");
        }
    }

    /// Whether the session currently holds a live, handshaken monitor.
    pub fn is_connected(&self) -> bool {
        self.monitor
            .as_ref()
            .map(|monitor| monitor.is_connected())
            .unwrap_or(false)
    }

    /// Serialize a compound multi-command operation against this session.
    ///
    /// Held across the z-stage batch update and state snapshot so two
    /// callers cannot interleave dependent command sequences.
    pub async fn transaction(&self) -> MutexGuard<'_, ()> {
        self.transaction_lock.lock().await
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}
