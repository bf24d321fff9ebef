//! Air pump state, per bed, as the pump itself reports it.

use serde::Serialize;
use tabled::Tabled;

use sleepiq_core::{Bed, BridgeConfig, CoreError};

use crate::cli::{GlobalOpts, PumpArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct PumpStatus {
    account_id: String,
    bed_id: String,
    active_task: Option<i64>,
    chamber_type: Option<i64>,
    left_sleep_number: Option<i64>,
    right_sleep_number: Option<i64>,
}

#[derive(Tabled)]
struct PumpRow {
    #[tabled(rename = "Bed")]
    bed_id: String,
    #[tabled(rename = "Active task")]
    active_task: String,
    #[tabled(rename = "Chamber")]
    chamber_type: String,
    #[tabled(rename = "Left")]
    left: String,
    #[tabled(rename = "Right")]
    right: String,
}

fn dash(value: Option<i64>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

impl From<&PumpStatus> for PumpRow {
    fn from(p: &PumpStatus) -> Self {
        Self {
            bed_id: p.bed_id.clone(),
            active_task: dash(p.active_task),
            chamber_type: dash(p.chamber_type),
            left: dash(p.left_sleep_number),
            right: dash(p.right_sleep_number),
        }
    }
}

pub async fn handle(config: BridgeConfig, args: PumpArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = util::connect(&config).await?;
    let account_id = client
        .registration()
        .await
        .map_err(CoreError::from)?
        .account_id;

    let status = client.family_status().await.map_err(CoreError::from)?;
    let beds = Bed::list_from(&status)?;
    let bed_ids = match args.bed {
        Some(id) => vec![util::pick_bed(&beds, Some(id))?],
        None => beds.into_iter().map(|b| b.bed_id).collect(),
    };

    let mut pumps = Vec::with_capacity(bed_ids.len());
    for bed_id in bed_ids {
        let pump = client.pump_status(&bed_id).await.map_err(CoreError::from)?;
        pumps.push(PumpStatus {
            account_id: account_id.clone(),
            bed_id,
            active_task: pump.active_task,
            chamber_type: pump.chamber_type,
            left_sleep_number: pump.left_side_sleep_number,
            right_sleep_number: pump.right_side_sleep_number,
        });
    }

    let out = output::render_list(&global.output, &pumps, |p| PumpRow::from(p), |p| {
        format!(
            "{} left={} right={}",
            p.bed_id,
            dash(p.left_sleep_number),
            dash(p.right_sleep_number)
        )
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pump_fields_render_as_dashes() {
        let row = PumpRow::from(&PumpStatus {
            account_id: "A1".into(),
            bed_id: "B1".into(),
            active_task: Some(0),
            chamber_type: None,
            left_sleep_number: Some(40),
            right_sleep_number: None,
        });
        assert_eq!(row.active_task, "0");
        assert_eq!(row.chamber_type, "-");
        assert_eq!(row.left, "40");
        assert_eq!(row.right, "-");
    }
}
