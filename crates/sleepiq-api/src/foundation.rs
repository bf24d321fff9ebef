// Foundation endpoints
//
// Motorized base: head/foot positions, outlets 1-4 (1/2 are plugs, 3/4
// drive the under-bed light strips), and foot warming. Beds without a
// foundation answer every call here with `{"Error":{"Code":404}}`.

use serde_json::json;
use tracing::debug;

use crate::client::SleepIqClient;
use crate::error::Error;
use crate::models::{
    Actuator, FootWarmingStatusResponse, FoundationStatusResponse, OutletStatusResponse, SideCode,
};

impl SleepIqClient {
    /// Foundation motion and position state.
    ///
    /// `GET /bed/{id}/foundation/status`
    pub async fn foundation_status(&self, bed_id: &str) -> Result<FoundationStatusResponse, Error> {
        debug!(bed_id, "fetching foundation status");
        self.get(&Self::bed_path(bed_id, "foundation/status"), &[])
            .await
    }

    /// Move one actuator to `position` (0-100).
    ///
    /// `PUT /bed/{id}/foundation/adjustment/micro` with
    /// `{"speed", "side", "position", "actuator"}`
    pub async fn adjust(
        &self,
        bed_id: &str,
        side: SideCode,
        actuator: Actuator,
        position: u8,
    ) -> Result<(), Error> {
        debug!(
            bed_id,
            side = side.as_wire(),
            actuator = actuator.as_wire(),
            position,
            "adjusting foundation"
        );
        let body = json!({
            "speed": 0,
            "side": side.as_wire(),
            "position": position,
            "actuator": actuator.as_wire(),
        });
        self.put(
            &Self::bed_path(bed_id, "foundation/adjustment/micro"),
            &[],
            Some(&body),
        )
        .await?;
        Ok(())
    }

    /// Read one outlet (1-4).
    ///
    /// `GET /bed/{id}/foundation/outlet?outletId=N`
    pub async fn outlet_status(
        &self,
        bed_id: &str,
        outlet_id: u8,
    ) -> Result<OutletStatusResponse, Error> {
        debug!(bed_id, outlet_id, "fetching outlet status");
        self.get(
            &Self::bed_path(bed_id, "foundation/outlet"),
            &[("outletId", outlet_id.to_string())],
        )
        .await
    }

    /// Switch one outlet (1-4); `setting` is 0 or 1.
    ///
    /// `PUT /bed/{id}/foundation/outlet` with `{"outletId", "setting"}`
    pub async fn set_outlet(&self, bed_id: &str, outlet_id: u8, setting: u8) -> Result<(), Error> {
        debug!(bed_id, outlet_id, setting, "setting outlet");
        let body = json!({
            "outletId": outlet_id,
            "setting": setting,
        });
        self.put(&Self::bed_path(bed_id, "foundation/outlet"), &[], Some(&body))
            .await?;
        Ok(())
    }

    /// Foot warmer temperature codes and remaining timers for both sides.
    ///
    /// `GET /bed/{id}/foundation/footwarming`
    pub async fn foot_warming_status(
        &self,
        bed_id: &str,
    ) -> Result<FootWarmingStatusResponse, Error> {
        debug!(bed_id, "fetching foot warming status");
        self.get(&Self::bed_path(bed_id, "foundation/footwarming"), &[])
            .await
    }

    /// Set one side's foot warmer.
    ///
    /// `PUT /bed/{id}/foundation/footwarming?footWarmingTemp{Side}=..&footWarmingTimer{Side}=..`
    ///
    /// `temp` is a temperature code (0, 31, 57, 72); `timer_minutes` how
    /// long it stays on.
    pub async fn set_foot_warming(
        &self,
        bed_id: &str,
        side: SideCode,
        temp: u8,
        timer_minutes: u32,
    ) -> Result<(), Error> {
        debug!(bed_id, side = side.as_wire(), temp, timer_minutes, "setting foot warming");
        let suffix = side.footwarming_suffix();
        let temp_key = format!("footWarmingTemp{suffix}");
        let timer_key = format!("footWarmingTimer{suffix}");
        self.put(
            &Self::bed_path(bed_id, "foundation/footwarming"),
            &[
                (temp_key.as_str(), temp.to_string()),
                (timer_key.as_str(), timer_minutes.to_string()),
            ],
            None,
        )
        .await?;
        Ok(())
    }
}
