//! Long-running bridge: poll until Ctrl-C, persisting accessories to disk.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use sleepiq_core::{AccessoryHost, Bridge, BridgeConfig};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::host::{Echo, FileHost};
use crate::output;

pub async fn handle(mut config: BridgeConfig, args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    if let Some(secs) = args.refresh {
        config.refresh_interval = Duration::from_secs(secs);
    }
    if config.refresh_interval.is_zero() {
        return Err(CliError::Validation {
            field: "refresh".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    let interval = config.refresh_interval;

    let cache = args
        .cache
        .unwrap_or_else(|| sleepiq_config::data_dir().join("accessories.json"));
    let echo = (!global.quiet).then(|| Echo {
        format: global.output.clone(),
        color: output::should_color(&global.color),
    });
    let host = Arc::new(FileHost::new(cache, echo));

    let bridge = Bridge::new(config, Arc::clone(&host) as Arc<dyn AccessoryHost>)?;
    bridge.start().await?;

    let count = bridge.accessories().len();
    info!(
        accessories = count,
        every = %humantime::format_duration(interval),
        cache = %host.path().display(),
        "bridge running"
    );
    if !global.quiet {
        eprintln!(
            "Bridging {count} accessories, polling every {}. Press Ctrl-C to stop.",
            humantime::format_duration(interval)
        );
    }

    let signal = tokio::signal::ctrl_c().await;
    info!("shutting down");
    bridge.shutdown().await;
    signal?;
    Ok(())
}
