//! One-shot status: discover the account's facets, poll once, print them.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tracing::debug;

use sleepiq_core::{
    Accessory, Bridge, BridgeConfig, CharacteristicValue, CoreError, MemoryHost, TickOutcome,
};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

/// Poll attempts before giving up on fresh values.
const MAX_TICKS: usize = 3;

// ── Row types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct FacetStatus {
    name: String,
    bed_id: String,
    kind: String,
    side: Option<String>,
    values: BTreeMap<String, CharacteristicValue>,
}

impl From<&Arc<Accessory>> for FacetStatus {
    fn from(acc: &Arc<Accessory>) -> Self {
        let d = acc.descriptor();
        Self {
            name: acc.display_name().to_owned(),
            bed_id: d.bed_id.clone(),
            kind: d.kind.to_string(),
            side: d.side.map(|s| s.to_string()),
            values: acc
                .values()
                .into_iter()
                .map(|(c, v)| (c.to_string(), v))
                .collect(),
        }
    }
}

impl FacetStatus {
    fn value_summary(&self) -> String {
        self.values
            .iter()
            .map(|(c, v)| format!("{c}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Tabled)]
struct FacetRow {
    #[tabled(rename = "Accessory")]
    name: String,
    #[tabled(rename = "Bed")]
    bed_id: String,
    #[tabled(rename = "Facet")]
    kind: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&FacetStatus> for FacetRow {
    fn from(s: &FacetStatus) -> Self {
        Self {
            name: s.name.clone(),
            bed_id: s.bed_id.clone(),
            kind: s.kind.clone(),
            side: s.side.clone().unwrap_or_else(|| "-".into()),
            value: s.value_summary(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    mut config: BridgeConfig,
    args: StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    config.refresh_interval = Duration::ZERO;
    let bridge = Bridge::new(config, Arc::new(MemoryHost::new()))?;
    bridge.start().await?;

    let result = poll_once(&bridge).await;
    bridge.shutdown().await;
    result?;

    let facets: Vec<FacetStatus> = bridge
        .accessories()
        .iter()
        .filter(|a| args.bed.as_deref().is_none_or(|id| a.descriptor().bed_id == id))
        .map(FacetStatus::from)
        .collect();

    if let Some(ref id) = args.bed {
        if facets.is_empty() {
            return Err(CliError::NotFound {
                resource_type: "bed".into(),
                identifier: id.clone(),
            });
        }
    }

    let out = output::render_list(&global.output, &facets, |s| FacetRow::from(s), |s| {
        format!("{} {}", s.name, s.value_summary())
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Tick until accessory values are populated.
async fn poll_once(bridge: &Bridge) -> Result<(), CoreError> {
    for attempt in 1..=MAX_TICKS {
        let outcome = bridge.tick().await;
        debug!(attempt, ?outcome, "status poll");
        match outcome {
            TickOutcome::Updated => return Ok(()),
            TickOutcome::Disabled => return Err(CoreError::Disabled),
            TickOutcome::Reauthenticated | TickOutcome::Discovered | TickOutcome::Skipped => {}
        }
    }
    Err(CoreError::TransientUpstream {
        message: format!("no bed data after {MAX_TICKS} polls"),
    })
}
