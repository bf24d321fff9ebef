// ── Bed domain types ──
//
// Validated views of the family-status and foundation payloads. A bed
// may list either side or both. A record missing its id, or a listed side
// missing occupancy / sleep number, is malformed and the whole poll result
// is rejected.

use serde::Serialize;
use sleepiq_api::Actuator;
use sleepiq_api::models::{
    FamilyStatusResponse, FoundationStatusResponse, RawBedStatus, RawSideStatus,
};

use super::facet::Side;
use crate::error::CoreError;

pub const SLEEP_NUMBER_MIN: u8 = 5;
pub const SLEEP_NUMBER_MAX: u8 = 100;
pub const SLEEP_NUMBER_STEP: u8 = 5;

/// Foot-warmer temperature codes indexed by level (off, low, medium, high).
pub const FOOT_WARMER_CODES: [u8; 4] = [0, 31, 57, 72];

/// Per-side status, rebuilt every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SideStatus {
    pub is_in_bed: bool,
    /// 0..=100 as reported.
    pub sleep_number: u8,
}

impl TryFrom<&RawSideStatus> for SideStatus {
    type Error = CoreError;

    fn try_from(raw: &RawSideStatus) -> Result<Self, Self::Error> {
        let is_in_bed = raw.is_in_bed.ok_or_else(|| malformed("side missing isInBed"))?;
        let number = raw
            .sleep_number
            .ok_or_else(|| malformed("side missing sleepNumber"))?;
        let sleep_number = u8::try_from(number.clamp(0, 100))
            .map_err(|_| malformed("sleepNumber out of range"))?;
        Ok(Self {
            is_in_bed,
            sleep_number,
        })
    }
}

/// A bed as listed by the account's family status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bed {
    pub bed_id: String,
    pub left: Option<SideStatus>,
    pub right: Option<SideStatus>,
    /// Known foundation capability; filled from the bridge's capability map.
    pub has_foundation: bool,
}

impl Bed {
    pub fn side(&self, side: Side) -> Option<SideStatus> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// The sides this bed reports, left first.
    pub fn sides(&self) -> impl Iterator<Item = (Side, SideStatus)> + '_ {
        Side::ALL
            .into_iter()
            .filter_map(|side| self.side(side).map(|status| (side, status)))
    }

    /// OR over the reported sides.
    pub fn any_side_occupied(&self) -> bool {
        self.sides().any(|(_, s)| s.is_in_bed)
    }

    /// AND over the reported sides; false when none are reported.
    pub fn both_sides_occupied(&self) -> bool {
        self.sides().next().is_some() && self.sides().all(|(_, s)| s.is_in_bed)
    }

    /// Validate a whole family-status response.
    ///
    /// A missing `beds` array or any malformed record rejects the lot.
    pub fn list_from(resp: &FamilyStatusResponse) -> Result<Vec<Self>, CoreError> {
        let raw = resp
            .beds
            .as_ref()
            .ok_or_else(|| malformed("family status has no beds array"))?;
        raw.iter().map(Self::try_from).collect()
    }
}

impl TryFrom<&RawBedStatus> for Bed {
    type Error = CoreError;

    fn try_from(raw: &RawBedStatus) -> Result<Self, Self::Error> {
        let bed_id = raw
            .bed_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("bed record missing bedId"))?;
        Ok(Self {
            bed_id,
            left: raw.left_side.as_ref().map(SideStatus::try_from).transpose()?,
            right: raw.right_side.as_ref().map(SideStatus::try_from).transpose()?,
            has_foundation: false,
        })
    }
}

// ── Foundation ───────────────────────────────────────────────────────

/// Actuator positions and motion flag for a foundation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FoundationState {
    pub is_moving: bool,
    pub left_head: u8,
    pub left_foot: u8,
    pub right_head: u8,
    pub right_foot: u8,
}

impl FoundationState {
    pub fn position(&self, side: Side, actuator: Actuator) -> u8 {
        match (side, actuator) {
            (Side::Left, Actuator::Head) => self.left_head,
            (Side::Left, Actuator::Foot) => self.left_foot,
            (Side::Right, Actuator::Head) => self.right_head,
            (Side::Right, Actuator::Foot) => self.right_foot,
        }
    }
}

impl TryFrom<&FoundationStatusResponse> for FoundationState {
    type Error = CoreError;

    fn try_from(raw: &FoundationStatusResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            is_moving: raw.fs_is_moving.unwrap_or(false),
            left_head: decode_position(raw.fs_left_head_position.as_deref())?,
            left_foot: decode_position(raw.fs_left_foot_position.as_deref())?,
            right_head: decode_position(raw.fs_right_head_position.as_deref())?,
            right_foot: decode_position(raw.fs_right_foot_position.as_deref())?,
        })
    }
}

/// Positions arrive as hex strings (`"0c"` = 12). Missing reads as 0.
fn decode_position(raw: Option<&str>) -> Result<u8, CoreError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(0);
    };
    let value = u8::from_str_radix(raw, 16)
        .map_err(|e| malformed(&format!("bad foundation position {raw:?}: {e}")))?;
    Ok(value.min(100))
}

// ── Value domains ────────────────────────────────────────────────────

/// Clamp to 5..=100 and round to the nearest step of 5.
pub fn normalize_sleep_number(value: u8) -> u8 {
    let rounded = value.saturating_add(SLEEP_NUMBER_STEP / 2) / SLEEP_NUMBER_STEP * SLEEP_NUMBER_STEP;
    rounded.clamp(SLEEP_NUMBER_MIN, SLEEP_NUMBER_MAX)
}

/// Temperature code for a foot-warmer level (0..=3).
pub fn foot_warmer_code(level: u8) -> Result<u8, CoreError> {
    FOOT_WARMER_CODES
        .get(usize::from(level))
        .copied()
        .ok_or_else(|| CoreError::Validation {
            message: format!("foot warmer level must be 0-3, got {level}"),
        })
}

/// Highest level whose code the upstream value reaches.
pub fn foot_warmer_level(code: u8) -> u8 {
    let level = FOOT_WARMER_CODES.iter().rposition(|&c| code >= c).unwrap_or(0);
    u8::try_from(level).unwrap_or(0)
}

fn malformed(message: &str) -> CoreError {
    CoreError::MalformedResponse {
        message: message.to_owned(),
    }
}
