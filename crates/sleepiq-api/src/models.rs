// Wire types for the SleepIQ REST API.
//
// Field sets drift between bed generations, so nearly everything is
// optional here; `sleepiq-core` validates and converts into domain types.

use serde::{Deserialize, Serialize};

/// Bed side as the API spells it in request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SideCode {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl SideCode {
    /// `"L"` / `"R"`.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Right => "R",
        }
    }

    /// Suffix used by the foot-warming query parameters.
    pub fn footwarming_suffix(self) -> &'static str {
        match self {
            Self::Left => "Left",
            Self::Right => "Right",
        }
    }
}

/// Foundation actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actuator {
    #[serde(rename = "H")]
    Head,
    #[serde(rename = "F")]
    Foot,
}

impl Actuator {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Head => "H",
            Self::Foot => "F",
        }
    }
}

// ── Bed / family status ─────────────────────────────────────────────

/// `GET /bed/familyStatus`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FamilyStatusResponse {
    /// `None` when the account response lacks the array altogether.
    pub beds: Option<Vec<RawBedStatus>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBedStatus {
    pub bed_id: Option<String>,
    pub status: Option<i64>,
    pub left_side: Option<RawSideStatus>,
    pub right_side: Option<RawSideStatus>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSideStatus {
    pub is_in_bed: Option<bool>,
    pub sleep_number: Option<i64>,
    #[serde(default)]
    pub alert_id: Option<i64>,
    #[serde(default)]
    pub alert_detailed_message: Option<String>,
    #[serde(default)]
    pub last_link: Option<String>,
    #[serde(default)]
    pub pressure: Option<i64>,
}

/// `GET|PUT /bed/{id}/pauseMode`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseModeResponse {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub bed_id: Option<String>,
    /// `"on"` or `"off"`.
    pub pause_mode: String,
}

/// `GET /bed/{id}/pump/status`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpStatusResponse {
    #[serde(default)]
    pub active_task: Option<i64>,
    #[serde(default)]
    pub chamber_type: Option<i64>,
    #[serde(default)]
    pub left_side_sleep_number: Option<i64>,
    #[serde(default)]
    pub right_side_sleep_number: Option<i64>,
}

/// `GET /registration`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub account_id: String,
    #[serde(default)]
    pub registration_state: Option<serde_json::Value>,
}

// ── Foundation ──────────────────────────────────────────────────────

/// `GET /bed/{id}/foundation/status`
///
/// Positions are two-digit hex strings (`"0c"` = 12).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundationStatusResponse {
    #[serde(default)]
    pub fs_is_moving: Option<bool>,
    #[serde(default)]
    pub fs_left_head_position: Option<String>,
    #[serde(default)]
    pub fs_left_foot_position: Option<String>,
    #[serde(default)]
    pub fs_right_head_position: Option<String>,
    #[serde(default)]
    pub fs_right_foot_position: Option<String>,
    #[serde(default)]
    pub fs_type: Option<String>,
    #[serde(default)]
    pub fs_configured: Option<bool>,
    #[serde(default)]
    pub fs_outlets_on: Option<bool>,
    #[serde(default)]
    pub fs_needs_homing: Option<bool>,
}

/// `GET /bed/{id}/foundation/outlet?outletId=N`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutletStatusResponse {
    #[serde(default)]
    pub bed_id: Option<String>,
    #[serde(default)]
    pub outlet: Option<u8>,
    /// 0 = off, 1 = on.
    pub setting: u8,
    #[serde(default)]
    pub timer: Option<serde_json::Value>,
}

/// `GET /bed/{id}/foundation/footwarming`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FootWarmingStatusResponse {
    /// Temperature code: 0, 31, 57 or 72.
    #[serde(default)]
    pub foot_warming_status_left: u8,
    #[serde(default)]
    pub foot_warming_status_right: u8,
    /// Remaining minutes.
    #[serde(default)]
    pub foot_warming_timer_left: u32,
    #[serde(default)]
    pub foot_warming_timer_right: u32,
}

impl FootWarmingStatusResponse {
    pub fn temp(&self, side: SideCode) -> u8 {
        match side {
            SideCode::Left => self.foot_warming_status_left,
            SideCode::Right => self.foot_warming_status_right,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn family_status_tolerates_missing_fields() {
        let raw: FamilyStatusResponse = serde_json::from_value(json!({
            "beds": [{
                "status": 1,
                "bedId": "B1",
                "leftSide": { "isInBed": true, "sleepNumber": 30, "pressure": 1088 },
                "rightSide": { "isInBed": false }
            }]
        }))
        .unwrap();

        let beds = raw.beds.unwrap();
        assert_eq!(beds[0].bed_id.as_deref(), Some("B1"));
        assert_eq!(beds[0].left_side.as_ref().unwrap().sleep_number, Some(30));
        assert_eq!(beds[0].right_side.as_ref().unwrap().sleep_number, None);
    }

    #[test]
    fn foundation_status_reads_hex_positions_as_strings() {
        let raw: FoundationStatusResponse = serde_json::from_value(json!({
            "fsIsMoving": true,
            "fsLeftHeadPosition": "0c",
            "fsType": "Split King"
        }))
        .unwrap();
        assert_eq!(raw.fs_is_moving, Some(true));
        assert_eq!(raw.fs_left_head_position.as_deref(), Some("0c"));
        assert_eq!(raw.fs_right_foot_position, None);
    }

    #[test]
    fn side_codes_serialize_to_single_letters() {
        assert_eq!(serde_json::to_value(SideCode::Left).unwrap(), json!("L"));
        assert_eq!(serde_json::to_value(Actuator::Foot).unwrap(), json!("F"));
        assert_eq!(SideCode::Right.footwarming_suffix(), "Right");
    }
}
