use crate::domain::error::PeriboardResult;
use async_trait::async_trait;

/// Correlation identifier attached to every outbound request.
pub type CorrelationId = u32;

/// One host-to-device request frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: CorrelationId,
    pub payload: Vec<u8>,
}

/// Frames emitted by the device side of the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFrame {
    /// Handshake complete. Emitted exactly once after the link comes up.
    Ready,
    /// Reply carrying the correlation id of the request it answers.
    Response {
        id: CorrelationId,
        payload: Vec<u8>,
    },
}

/// Byte-level link to one physical device.
///
/// Implementations own framing and the underlying handle; the monitor
/// drives a `Transport` from a single task, so no interior locking is
/// required for correctness.
#[async_trait]
pub trait Transport: Send {
    /// Write one request frame to the device.
    async fn send(&mut self, request: Request) -> PeriboardResult<()>;

    /// Read the next frame from the device. `Ok(None)` means the link
    /// closed cleanly; an error means it died underneath us.
    async fn recv(&mut self) -> PeriboardResult<Option<DeviceFrame>>;
}
