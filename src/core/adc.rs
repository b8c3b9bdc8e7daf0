use crate::core::protocol::{self, Command};
use crate::core::session::DeviceSession;
use crate::domain::error::PeriboardResult;
use serde::Serialize;

/// MAX11210 calibration registers read back from the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdcCalibration {
    pub self_cal_gain: u32,
    pub self_cal_offset: u32,
    pub system_gain: u32,
    pub system_offset: u32,
}

/// Read the four calibration registers in one guarded sweep.
pub async fn read_calibration(session: &DeviceSession) -> PeriboardResult<AdcCalibration> {
    let _guard = session.transaction().await;

    let self_cal_gain = session.execute(&Command::AdcSelfCalGain, None).await?;
    let self_cal_offset = session.execute(&Command::AdcSelfCalOffset, None).await?;
    let system_gain = session.execute(&Command::AdcSystemGain, None).await?;
    let system_offset = session.execute(&Command::AdcSystemOffset, None).await?;

    Ok(AdcCalibration {
        self_cal_gain: protocol::parse_u32(&self_cal_gain)?,
        self_cal_offset: protocol::parse_u32(&self_cal_offset)?,
        system_gain: protocol::parse_u32(&system_gain)?,
        system_offset: protocol::parse_u32(&system_offset)?,
    })
}
