// Core module - Session lifecycle, protocol, and device conveniences
pub mod adc;
pub mod discovery;
pub mod protocol;
pub mod session;
pub mod zstage;

pub use discovery::{discover, DiscoveredDevice};
pub use session::{DeviceSession, Monitor, SessionOptions};
pub use zstage::{ZStage, ZStageState, ZStageUpdate};
