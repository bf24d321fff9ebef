//! Shared helpers for command handlers.

use std::sync::Arc;

use sleepiq_core::{Bed, BridgeConfig, CoreError, SleepIqClient};

use crate::error::CliError;

/// Build a session client from `config` and log in.
pub async fn connect(config: &BridgeConfig) -> Result<Arc<SleepIqClient>, CliError> {
    let client = SleepIqClient::new(
        config.base_url.clone(),
        config.username.clone(),
        config.password.clone(),
        &config.transport(),
    )
    .map_err(CoreError::from)?;
    client.login().await.map_err(CoreError::from)?;
    Ok(Arc::new(client))
}

/// Resolve `--bed` against the account's beds, defaulting to the first.
pub async fn resolve_bed(
    client: &SleepIqClient,
    requested: Option<String>,
) -> Result<String, CliError> {
    let status = client.family_status().await.map_err(CoreError::from)?;
    let beds = Bed::list_from(&status)?;
    pick_bed(&beds, requested)
}

pub(crate) fn pick_bed(beds: &[Bed], requested: Option<String>) -> Result<String, CliError> {
    match requested {
        Some(id) if beds.iter().any(|b| b.bed_id == id) => Ok(id),
        Some(id) => Err(CliError::NotFound {
            resource_type: "bed".into(),
            identifier: id,
        }),
        None => beds
            .first()
            .map(|b| b.bed_id.clone())
            .ok_or_else(|| CliError::NotFound {
                resource_type: "bed".into(),
                identifier: "(any)".into(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleepiq_core::SideStatus;

    fn beds() -> Vec<Bed> {
        let side = SideStatus {
            is_in_bed: false,
            sleep_number: 50,
        };
        ["B1", "B2"]
            .into_iter()
            .map(|id| Bed {
                bed_id: id.into(),
                left: Some(side),
                right: Some(side),
                has_foundation: false,
            })
            .collect()
    }

    #[test]
    fn defaults_to_first_bed() {
        assert_eq!(pick_bed(&beds(), None).ok().as_deref(), Some("B1"));
    }

    #[test]
    fn explicit_bed_must_exist() {
        assert_eq!(
            pick_bed(&beds(), Some("B2".into())).ok().as_deref(),
            Some("B2")
        );
        assert!(matches!(
            pick_bed(&beds(), Some("B9".into())),
            Err(CliError::NotFound { .. })
        ));
        assert!(matches!(pick_bed(&[], None), Err(CliError::NotFound { .. })));
    }
}
