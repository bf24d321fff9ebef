// ── Bed commands ──
//
// Typed write requests and the executor that routes them to the session
// client. Accessories hold a weak reference to the executor, so a write
// scheduled after shutdown fails with `SessionClosed` instead of keeping
// the client alive.

use std::sync::Arc;
use std::time::Duration;

use sleepiq_api::{Actuator, SleepIqClient};
use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::model::{Side, foot_warmer_code, normalize_sleep_number};

/// A write against one bed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Snapped to 5..=100 in steps of 5 before sending.
    SetSleepNumber { bed_id: String, side: Side, value: u8 },
    SetPrivacy { bed_id: String, enabled: bool },
    SetOutlet { bed_id: String, outlet_id: u8, on: bool },
    /// `level` 0..=3; sent with the configured timer.
    SetFootWarmer { bed_id: String, side: Side, level: u8 },
    /// Waits for the foundation to stop moving first.
    Adjust {
        bed_id: String,
        side: Side,
        actuator: Actuator,
        position: u8,
    },
    ForceIdle { bed_id: String },
}

/// Executes [`Command`]s against the SleepIQ API.
pub struct CommandExecutor {
    client: Arc<SleepIqClient>,
    foot_warmer_timer: u32,
    motion_wait_timeout: Duration,
    motion_poll_interval: Duration,
}

impl CommandExecutor {
    pub fn new(client: Arc<SleepIqClient>, config: &BridgeConfig) -> Self {
        Self {
            client,
            foot_warmer_timer: config.foot_warmer_timer,
            motion_wait_timeout: config.motion_wait_timeout,
            motion_poll_interval: config.motion_poll_interval,
        }
    }

    pub fn client(&self) -> &Arc<SleepIqClient> {
        &self.client
    }

    pub async fn execute(&self, cmd: Command) -> Result<(), CoreError> {
        debug!(?cmd, "executing command");
        match cmd {
            Command::SetSleepNumber {
                bed_id,
                side,
                value,
            } => {
                let value = normalize_sleep_number(value);
                self.client
                    .set_sleep_number(&bed_id, side.code(), value)
                    .await?;
                info!(bed = %bed_id, %side, value, "sleep number set");
            }
            Command::SetPrivacy { bed_id, enabled } => {
                let mode = if enabled { "on" } else { "off" };
                self.client.set_bed_pause_mode(&bed_id, mode).await?;
                info!(bed = %bed_id, mode, "privacy mode set");
            }
            Command::SetOutlet {
                bed_id,
                outlet_id,
                on,
            } => {
                if !(1..=4).contains(&outlet_id) {
                    return Err(CoreError::Validation {
                        message: format!("outlet must be 1-4, got {outlet_id}"),
                    });
                }
                self.client
                    .set_outlet(&bed_id, outlet_id, u8::from(on))
                    .await?;
                info!(bed = %bed_id, outlet_id, on, "outlet set");
            }
            Command::SetFootWarmer {
                bed_id,
                side,
                level,
            } => {
                let code = foot_warmer_code(level)?;
                self.client
                    .set_foot_warming(&bed_id, side.code(), code, self.foot_warmer_timer)
                    .await?;
                info!(bed = %bed_id, %side, level, "foot warmer set");
            }
            Command::Adjust {
                bed_id,
                side,
                actuator,
                position,
            } => {
                if position > 100 {
                    return Err(CoreError::Validation {
                        message: format!("position must be 0-100, got {position}"),
                    });
                }
                self.wait_for_motion(&bed_id).await?;
                self.client
                    .adjust(&bed_id, side.code(), actuator, position)
                    .await?;
                info!(bed = %bed_id, %side, ?actuator, position, "foundation adjusted");
            }
            Command::ForceIdle { bed_id } => {
                self.client.force_idle(&bed_id).await?;
                info!(bed = %bed_id, "pump forced idle");
            }
        }
        Ok(())
    }

    /// Poll foundation status until it reports no motion, bounded by the
    /// configured ceiling.
    async fn wait_for_motion(&self, bed_id: &str) -> Result<(), CoreError> {
        let wait = async {
            loop {
                let status = self.client.foundation_status(bed_id).await?;
                if !status.fs_is_moving.unwrap_or(false) {
                    return Ok::<(), CoreError>(());
                }
                debug!(bed = %bed_id, "foundation moving, waiting");
                tokio::time::sleep(self.motion_poll_interval).await;
            }
        };

        tokio::time::timeout(self.motion_wait_timeout, wait)
            .await
            .map_err(|_| CoreError::MotionTimeout {
                bed_id: bed_id.to_owned(),
                waited_secs: self.motion_wait_timeout.as_secs(),
            })?
    }
}
