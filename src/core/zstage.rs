//! Z-stage convenience layer over a device session.
//!
//! Property reads issue synchronous queries; writes are acknowledged by
//! the device but take effect asynchronously, so the only way to observe
//! move completion is to poll `position` against the target. `up()` does
//! exactly that; `down()` is fire-and-forget like the firmware's own
//! clients.

use crate::core::protocol::{self, Command, ZStageSetting};
use crate::core::session::DeviceSession;
use crate::domain::config::ZStageProfile;
use crate::domain::error::{PeriboardError, PeriboardResult};
use serde::Serialize;
use tracing::debug;

/// Z-stage handle borrowing its session explicitly.
pub struct ZStage<'a> {
    session: &'a DeviceSession,
    profile: ZStageProfile,
}

/// Snapshot of every z-stage field, read under the transaction guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZStageState {
    pub engaged_stop_enabled: bool,
    pub home_stop_enabled: bool,
    pub micro_stepping: bool,
    pub motor_enabled: bool,
    pub position: i32,
    pub rpm: u32,
}

/// Batch of optional setting changes, applied in fixed field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZStageUpdate {
    pub motor_enabled: Option<bool>,
    pub micro_stepping: Option<bool>,
    pub home_stop_enabled: Option<bool>,
    pub engaged_stop_enabled: Option<bool>,
    pub rpm: Option<u32>,
}

impl ZStageUpdate {
    /// Expand into concrete settings, always in declaration order so
    /// concurrent observers see a deterministic sequence.
    pub fn settings(&self) -> Vec<ZStageSetting> {
        let mut settings = Vec::new();
        if let Some(enabled) = self.motor_enabled {
            settings.push(ZStageSetting::MotorEnabled(enabled));
        }
        if let Some(enabled) = self.micro_stepping {
            settings.push(ZStageSetting::MicroStepping(enabled));
        }
        if let Some(enabled) = self.home_stop_enabled {
            settings.push(ZStageSetting::HomeStopEnabled(enabled));
        }
        if let Some(enabled) = self.engaged_stop_enabled {
            settings.push(ZStageSetting::EngagedStopEnabled(enabled));
        }
        if let Some(rpm) = self.rpm {
            settings.push(ZStageSetting::Rpm(rpm));
        }
        settings
    }

    pub fn is_empty(&self) -> bool {
        self.settings().is_empty()
    }
}

impl<'a> ZStage<'a> {
    pub fn new(session: &'a DeviceSession, profile: ZStageProfile) -> Self {
        Self { session, profile }
    }

    pub async fn position(&self) -> PeriboardResult<i32> {
        let reply = self.session.execute(&Command::ZStagePosition, None).await?;
        protocol::parse_i32(&reply)
    }

    pub async fn motor_enabled(&self) -> PeriboardResult<bool> {
        let reply = self
            .session
            .execute(&Command::ZStageMotorEnabled, None)
            .await?;
        protocol::parse_bool(&reply)
    }

    pub async fn micro_stepping(&self) -> PeriboardResult<bool> {
        let reply = self
            .session
            .execute(&Command::ZStageMicroStepping, None)
            .await?;
        protocol::parse_bool(&reply)
    }

    pub async fn rpm(&self) -> PeriboardResult<u32> {
        let reply = self.session.execute(&Command::ZStageRpm, None).await?;
        protocol::parse_u32(&reply)
    }

    pub async fn home_stop_enabled(&self) -> PeriboardResult<bool> {
        let reply = self
            .session
            .execute(&Command::ZStageHomeStopEnabled, None)
            .await?;
        protocol::parse_bool(&reply)
    }

    pub async fn engaged_stop_enabled(&self) -> PeriboardResult<bool> {
        let reply = self
            .session
            .execute(&Command::ZStageEngagedStopEnabled, None)
            .await?;
        protocol::parse_bool(&reply)
    }

    /// Start a move. The device acknowledges immediately and updates
    /// `position` on its own once the motion completes.
    pub async fn move_to(&self, position: i32) -> PeriboardResult<()> {
        self.session
            .execute(&Command::ZStageMoveTo(position), None)
            .await?;
        Ok(())
    }

    /// Apply one setting.
    pub async fn set(&self, setting: ZStageSetting) -> PeriboardResult<()> {
        self.session
            .execute(&Command::ZStageSet(setting), None)
            .await?;
        Ok(())
    }

    /// Apply a batch of settings under the transaction guard so the
    /// sequence cannot interleave with another compound operation.
    pub async fn apply(&self, update: &ZStageUpdate) -> PeriboardResult<()> {
        let settings = update.settings();
        if settings.is_empty() {
            return Ok(());
        }

        let _guard = self.session.transaction().await;
        for setting in settings {
            self.session
                .execute(&Command::ZStageSet(setting), None)
                .await?;
        }
        Ok(())
    }

    /// Read every field in one guarded sweep.
    pub async fn state(&self) -> PeriboardResult<ZStageState> {
        let _guard = self.session.transaction().await;
        Ok(ZStageState {
            engaged_stop_enabled: self.engaged_stop_enabled().await?,
            home_stop_enabled: self.home_stop_enabled().await?,
            micro_stepping: self.micro_stepping().await?,
            motor_enabled: self.motor_enabled().await?,
            position: self.position().await?,
            rpm: self.rpm().await?,
        })
    }

    pub async fn is_up(&self) -> PeriboardResult<bool> {
        Ok(self.position().await? == self.profile.up_position)
    }

    pub async fn is_down(&self) -> PeriboardResult<bool> {
        Ok(self.position().await? == self.profile.down_position)
    }

    /// Raise the stage if it is not already up, then poll until the
    /// device reports the target position or the move deadline lapses.
    /// The firmware emits no move-completion signal.
    pub async fn up(&self) -> PeriboardResult<()> {
        if self.is_up().await? {
            debug!("z-stage already up");
            return Ok(());
        }
        self.move_to(self.profile.up_position).await?;
        self.wait_for_position(self.profile.up_position).await
    }

    /// Lower the stage if it is not already down. Fire-and-forget: the
    /// next `position` read observes progress.
    pub async fn down(&self) -> PeriboardResult<()> {
        if self.is_down().await? {
            debug!("z-stage already down");
            return Ok(());
        }
        self.move_to(self.profile.down_position).await
    }

    /// Home the stage; position reads 0 once homing finishes.
    pub async fn home(&self) -> PeriboardResult<()> {
        self.session.execute(&Command::ZStageHome, None).await?;
        Ok(())
    }

    async fn wait_for_position(&self, target: i32) -> PeriboardResult<()> {
        let timeout = self.profile.move_timeout();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.position().await? == target {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PeriboardError::MoveIncomplete { target, timeout });
            }
            tokio::time::sleep(self.profile.poll_interval()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_expands_in_declaration_order() {
        let update = ZStageUpdate {
            rpm: Some(20),
            motor_enabled: Some(true),
            engaged_stop_enabled: Some(false),
            ..ZStageUpdate::default()
        };

        assert_eq!(
            update.settings(),
            vec![
                ZStageSetting::MotorEnabled(true),
                ZStageSetting::EngagedStopEnabled(false),
                ZStageSetting::Rpm(20),
            ]
        );
    }

    #[test]
    fn test_empty_update() {
        assert!(ZStageUpdate::default().is_empty());
        assert!(!ZStageUpdate {
            rpm: Some(1),
            ..ZStageUpdate::default()
        }
        .is_empty());
    }
}
