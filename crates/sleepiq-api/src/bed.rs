// Bed endpoints
//
// Family status (occupancy + sleep numbers for every bed on the account),
// privacy (pause) mode, sleep number writes, and pump control.

use serde_json::json;
use tracing::debug;

use crate::client::{SleepIqClient, decode};
use crate::error::Error;
use crate::models::{FamilyStatusResponse, PauseModeResponse, PumpStatusResponse, SideCode};

impl SleepIqClient {
    /// Occupancy and sleep number for every bed on the account.
    ///
    /// `GET /bed/familyStatus`
    ///
    /// Remembers the first bed as the session's current bed.
    pub async fn family_status(&self) -> Result<FamilyStatusResponse, Error> {
        debug!("fetching family status");
        let value = self
            .request(reqwest::Method::GET, "bed/familyStatus", &[], None)
            .await?;
        let status: FamilyStatusResponse = decode(value)?;

        if let Some(bed_id) = status
            .beds
            .as_ref()
            .and_then(|beds| beds.first())
            .and_then(|bed| bed.bed_id.clone())
        {
            self.update_session(|session| session.current_bed_id = bed_id);
        }

        Ok(status)
    }

    /// Read the privacy (pause) mode.
    ///
    /// `GET /bed/{id}/pauseMode`
    pub async fn bed_pause_mode(&self, bed_id: &str) -> Result<PauseModeResponse, Error> {
        debug!(bed_id, "fetching pause mode");
        self.get(&Self::bed_path(bed_id, "pauseMode"), &[]).await
    }

    /// Set the privacy (pause) mode; `mode` is `"on"` or `"off"`.
    ///
    /// `PUT /bed/{id}/pauseMode?mode=..`
    pub async fn set_bed_pause_mode(
        &self,
        bed_id: &str,
        mode: &str,
    ) -> Result<PauseModeResponse, Error> {
        debug!(bed_id, mode, "setting pause mode");
        let value = self
            .put(
                &Self::bed_path(bed_id, "pauseMode"),
                &[("mode", mode.to_owned())],
                None,
            )
            .await?;
        decode(value)
    }

    /// Set the sleep number for one side.
    ///
    /// `PUT /bed/{id}/sleepNumber` with `{"side", "sleepNumber"}`
    pub async fn set_sleep_number(
        &self,
        bed_id: &str,
        side: SideCode,
        sleep_number: u8,
    ) -> Result<(), Error> {
        debug!(bed_id, side = side.as_wire(), sleep_number, "setting sleep number");
        let body = json!({
            "side": side.as_wire(),
            "sleepNumber": sleep_number,
        });
        self.put(&Self::bed_path(bed_id, "sleepNumber"), &[], Some(&body))
            .await?;
        Ok(())
    }

    /// Pump state, including sleep numbers as the pump sees them.
    ///
    /// `GET /bed/{id}/pump/status`
    pub async fn pump_status(&self, bed_id: &str) -> Result<PumpStatusResponse, Error> {
        debug!(bed_id, "fetching pump status");
        self.get(&Self::bed_path(bed_id, "pump/status"), &[]).await
    }

    /// Stop the pump mid-adjustment.
    ///
    /// `PUT /bed/{id}/pump/forceIdle`
    pub async fn force_idle(&self, bed_id: &str) -> Result<(), Error> {
        debug!(bed_id, "forcing pump idle");
        self.put(&Self::bed_path(bed_id, "pump/forceIdle"), &[], None)
            .await?;
        Ok(())
    }
}
