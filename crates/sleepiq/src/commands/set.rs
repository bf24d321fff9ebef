//! One-shot writes through the core command executor.

use std::sync::Arc;

use sleepiq_core::model::normalize_sleep_number;
use sleepiq_core::{Actuator, BridgeConfig, Command as CoreCommand, CommandExecutor, Side};

use crate::cli::{GlobalOpts, SetArgs, SetCommand};
use crate::error::CliError;

use super::util;

/// Translate a `set` subcommand into a core command plus a confirmation line.
fn to_command(bed_id: String, cmd: SetCommand) -> (CoreCommand, String) {
    match cmd {
        SetCommand::SleepNumber { side, value } => {
            let side = Side::from(side);
            let value = normalize_sleep_number(value);
            let msg = format!("Sleep number on {side} side set to {value}");
            (CoreCommand::SetSleepNumber { bed_id, side, value }, msg)
        }
        SetCommand::Privacy { state } => {
            let enabled = state.is_on();
            let msg = format!("Privacy mode {}", on_off(enabled));
            (CoreCommand::SetPrivacy { bed_id, enabled }, msg)
        }
        SetCommand::Outlet { side, state } => {
            let side = Side::from(side);
            let msg = format!("{side} outlet switched {}", on_off(state.is_on()));
            let cmd = CoreCommand::SetOutlet {
                bed_id,
                outlet_id: side.outlet_id(),
                on: state.is_on(),
            };
            (cmd, msg)
        }
        SetCommand::Light { side, state } => {
            let side = Side::from(side);
            let msg = format!("{side} light strip switched {}", on_off(state.is_on()));
            let cmd = CoreCommand::SetOutlet {
                bed_id,
                outlet_id: side.light_strip_id(),
                on: state.is_on(),
            };
            (cmd, msg)
        }
        SetCommand::FootWarmer { side, level } => {
            let side = Side::from(side);
            let msg = format!("Foot warmer on {side} side set to level {level}");
            (CoreCommand::SetFootWarmer { bed_id, side, level }, msg)
        }
        SetCommand::Flex {
            side,
            actuator,
            position,
        } => {
            let side = Side::from(side);
            let actuator = Actuator::from(actuator);
            let part = match actuator {
                Actuator::Head => "head",
                Actuator::Foot => "foot",
            };
            let msg = format!("{side} {part} moved to {position}");
            let cmd = CoreCommand::Adjust {
                bed_id,
                side,
                actuator,
                position,
            };
            (cmd, msg)
        }
        SetCommand::ForceIdle => (CoreCommand::ForceIdle { bed_id }, "Pump forced idle".into()),
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(config: BridgeConfig, args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = util::connect(&config).await?;
    let bed_id = util::resolve_bed(&client, args.bed).await?;
    let executor = CommandExecutor::new(Arc::clone(&client), &config);

    let (cmd, message) = to_command(bed_id, args.command);
    tracing::debug!(command = ?cmd, "executing");
    executor.execute(cmd).await?;

    if !global.quiet {
        eprintln!("✓ {message}");
    }
    Ok(())
}
