use std::time::Duration;
use thiserror::Error;

/// Periboard unified error type
#[derive(Error, Debug)]
pub enum PeriboardError {
    #[error("no serial devices available for connection")]
    NoDeviceFound,

    #[error("no '{expected}' device available for connection")]
    NoMatchingDevice { expected: String },

    #[error("timed out waiting for device handshake on {port}")]
    ConnectionTimeout { port: String },

    #[error("session is not connected")]
    NotConnected,

    #[error("no response within {timeout:?}")]
    RequestTimeout { timeout: Duration },

    #[error("transport failure: {reason}")]
    Transport { reason: String },

    #[error("failed to open {port}: {source}")]
    TransportOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("z-stage did not reach position {target} within {timeout:?}")]
    MoveIncomplete { target: i32, timeout: Duration },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("output error: {0}")]
    Output(String),
}

pub type PeriboardResult<T> = Result<T, PeriboardError>;
