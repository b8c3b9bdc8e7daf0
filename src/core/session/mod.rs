// Session module - Device session lifecycle
pub mod monitor;
pub mod session;
pub mod transport;

pub use monitor::Monitor;
pub use session::{
    DeviceSession, SessionOptions, TransportOpener, BAUD_RATE, DEFAULT_TIMEOUT, DEVICE_NAME,
};
pub use transport::{CorrelationId, DeviceFrame, Request, Transport};
