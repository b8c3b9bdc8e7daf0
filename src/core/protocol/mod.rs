//! Typed command set spoken over the device link.
//!
//! Requests are ASCII lines (`name [args…]`); replies carry the ASCII
//! value for queries and `ok` for actions. Each settable z-stage field
//! maps to its enable/disable/set command through [`ZStageSetting`], so
//! the whole dispatch table is resolved at compile time.

use crate::domain::error::{PeriboardError, PeriboardResult};

/// Commands understood by the periboard firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Free RAM on the board, in bytes
    RamFree,
    /// Device name reported during identity probing
    DeviceName,
    /// Firmware version reported during identity probing
    DeviceVersion,
    /// Stored board identifier
    Id,
    /// Persist a new board identifier
    SetId(String),
    ZStagePosition,
    ZStageMotorEnabled,
    ZStageMicroStepping,
    ZStageRpm,
    ZStageHomeStopEnabled,
    ZStageEngagedStopEnabled,
    /// Start a move; the device updates `position` once motion finishes
    ZStageMoveTo(i32),
    ZStageHome,
    ZStageSet(ZStageSetting),
    AdcSelfCalGain,
    AdcSelfCalOffset,
    AdcSystemGain,
    AdcSystemOffset,
}

/// One settable z-stage field together with its new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZStageSetting {
    MotorEnabled(bool),
    MicroStepping(bool),
    HomeStopEnabled(bool),
    EngagedStopEnabled(bool),
    Rpm(u32),
}

impl Command {
    /// Encode the request payload sent over the link.
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::RamFree => write!(f, "ram_free"),
            Command::DeviceName => write!(f, "name"),
            Command::DeviceVersion => write!(f, "version"),
            Command::Id => write!(f, "id"),
            Command::SetId(id) => write!(f, "set_id {}", id),
            Command::ZStagePosition => write!(f, "zstage.position"),
            Command::ZStageMotorEnabled => write!(f, "zstage.motor_enabled"),
            Command::ZStageMicroStepping => write!(f, "zstage.micro_stepping"),
            Command::ZStageRpm => write!(f, "zstage.rpm"),
            Command::ZStageHomeStopEnabled => write!(f, "zstage.home_stop_enabled"),
            Command::ZStageEngagedStopEnabled => write!(f, "zstage.engaged_stop_enabled"),
            Command::ZStageMoveTo(position) => write!(f, "zstage.move_to {}", position),
            Command::ZStageHome => write!(f, "zstage.home"),
            Command::ZStageSet(setting) => setting.fmt(f),
            Command::AdcSelfCalGain => write!(f, "adc.self_cal_gain"),
            Command::AdcSelfCalOffset => write!(f, "adc.self_cal_offset"),
            Command::AdcSystemGain => write!(f, "adc.system_gain"),
            Command::AdcSystemOffset => write!(f, "adc.system_offset"),
        }
    }
}

impl std::fmt::Display for ZStageSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZStageSetting::MotorEnabled(true) => write!(f, "zstage.enable_motor"),
            ZStageSetting::MotorEnabled(false) => write!(f, "zstage.disable_motor"),
            ZStageSetting::MicroStepping(true) => write!(f, "zstage.enable_micro_stepping"),
            ZStageSetting::MicroStepping(false) => write!(f, "zstage.disable_micro_stepping"),
            ZStageSetting::HomeStopEnabled(true) => write!(f, "zstage.enable_home_stop"),
            ZStageSetting::HomeStopEnabled(false) => write!(f, "zstage.disable_home_stop"),
            ZStageSetting::EngagedStopEnabled(true) => write!(f, "zstage.enable_engaged_stop"),
            ZStageSetting::EngagedStopEnabled(false) => write!(f, "zstage.disable_engaged_stop"),
            ZStageSetting::Rpm(rpm) => write!(f, "zstage.set_rpm {}", rpm),
        }
    }
}

/// Parse a reply payload as UTF-8 text.
pub fn parse_text(payload: &[u8]) -> PeriboardResult<String> {
    String::from_utf8(payload.to_vec())
        .map(|text| text.trim().to_string())
        .map_err(|_| PeriboardError::Protocol("reply is not valid UTF-8".to_string()))
}

/// Parse a reply payload as an unsigned integer.
pub fn parse_u32(payload: &[u8]) -> PeriboardResult<u32> {
    let text = parse_text(payload)?;
    text.parse()
        .map_err(|_| PeriboardError::Protocol(format!("expected unsigned integer, got '{}'", text)))
}

/// Parse a reply payload as a signed integer.
pub fn parse_i32(payload: &[u8]) -> PeriboardResult<i32> {
    let text = parse_text(payload)?;
    text.parse()
        .map_err(|_| PeriboardError::Protocol(format!("expected integer, got '{}'", text)))
}

/// Parse a reply payload as a boolean (`0` or `1`).
pub fn parse_bool(payload: &[u8]) -> PeriboardResult<bool> {
    match parse_text(payload)?.as_str() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(PeriboardError::Protocol(format!(
            "expected boolean 0/1, got '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_encoding() {
        assert_eq!(Command::RamFree.encode(), b"ram_free");
        assert_eq!(Command::ZStageMoveTo(10).encode(), b"zstage.move_to 10");
        assert_eq!(Command::ZStageMoveTo(-3).encode(), b"zstage.move_to -3");
        assert_eq!(Command::SetId("box-07".to_string()).encode(), b"set_id box-07");
    }

    #[test]
    fn test_setting_dispatch_table() {
        assert_eq!(
            Command::ZStageSet(ZStageSetting::MotorEnabled(true)).encode(),
            b"zstage.enable_motor"
        );
        assert_eq!(
            Command::ZStageSet(ZStageSetting::MotorEnabled(false)).encode(),
            b"zstage.disable_motor"
        );
        assert_eq!(
            Command::ZStageSet(ZStageSetting::Rpm(20)).encode(),
            b"zstage.set_rpm 20"
        );
        assert_eq!(
            Command::ZStageSet(ZStageSetting::EngagedStopEnabled(true)).encode(),
            b"zstage.enable_engaged_stop"
        );
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_u32(b"490").unwrap(), 490);
        assert_eq!(parse_i32(b"-12").unwrap(), -12);
        assert!(parse_bool(b"1").unwrap());
        assert!(!parse_bool(b"0").unwrap());
        assert_eq!(parse_text(b"periboard\r\n").unwrap(), "periboard");
    }

    #[test]
    fn test_parse_rejects_malformed_payloads() {
        assert!(matches!(
            parse_u32(b"many"),
            Err(PeriboardError::Protocol(_))
        ));
        assert!(matches!(
            parse_bool(b"yes"),
            Err(PeriboardError::Protocol(_))
        ));
    }
}
