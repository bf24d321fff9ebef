// ── Facet identity ──
//
// A facet is one controllable or observable aspect of a bed: a side's
// sleep number, the bed's privacy switch, the left outlet. Its key is a
// deterministic string derived from the bed id, so the same physical
// control always resolves to the same host accessory across restarts.

use std::fmt;

use serde::{Deserialize, Serialize};
use sleepiq_api::SideCode;
use uuid::Uuid;

/// Namespace for host accessory UUIDs (v5 over the facet key).
const FACET_NAMESPACE: Uuid = Uuid::from_u128(0x5a1e_e71c_0b3d_4f5e_9c2a_7d41_e3b8_c6f0);

/// Bed side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    /// Key fragment as the family-status payload names the side.
    pub fn key(self) -> &'static str {
        match self {
            Self::Left => "leftSide",
            Self::Right => "rightSide",
        }
    }

    pub fn code(self) -> SideCode {
        match self {
            Self::Left => SideCode::Left,
            Self::Right => SideCode::Right,
        }
    }

    /// Foundation outlet index for this side's outlet.
    pub fn outlet_id(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Right => 2,
        }
    }

    /// Foundation outlet index for this side's under-bed light strip.
    pub fn light_strip_id(self) -> u8 {
        match self {
            Self::Left => 3,
            Self::Right => 4,
        }
    }
}

/// The fixed catalog of facets a bed can expose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FacetKind {
    Occupancy,
    AnySideOccupancy,
    BothSidesOccupancy,
    SleepNumber,
    Flex,
    Privacy,
    Outlet,
    LightStrip,
    FootWarmer,
}

impl FacetKind {
    /// Suffix appended to the facet key.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Occupancy | Self::AnySideOccupancy | Self::BothSidesOccupancy => "occupancy",
            Self::SleepNumber => "number",
            Self::Flex => "flex",
            Self::Privacy => "privacy",
            Self::Outlet => "outlet",
            Self::LightStrip => "lightstrip",
            Self::FootWarmer => "footwarmer",
        }
    }

    /// Whether one facet exists per side rather than per bed.
    pub fn is_per_side(self) -> bool {
        !matches!(
            self,
            Self::AnySideOccupancy | Self::BothSidesOccupancy | Self::Privacy
        )
    }

    /// Whether the facet only exists on beds with a foundation.
    pub fn requires_foundation(self) -> bool {
        matches!(
            self,
            Self::Flex | Self::Outlet | Self::LightStrip | Self::FootWarmer
        )
    }

    /// Whether host users can write this facet.
    pub fn is_writable(self) -> bool {
        !matches!(
            self,
            Self::Occupancy | Self::AnySideOccupancy | Self::BothSidesOccupancy
        )
    }
}

/// Deterministic facet identifier: `bedId + sideKey + suffix`.
///
/// `"B1leftSidenumber"`, `"B1anySideoccupancy"`, `"B1privacy"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetKey(String);

impl FacetKey {
    pub fn new(bed_id: &str, kind: FacetKind, side: Option<Side>) -> Self {
        let scope = match (kind, side) {
            (FacetKind::AnySideOccupancy, _) => "anySide",
            (FacetKind::BothSidesOccupancy, _) => "bothSides",
            (_, Some(side)) => side.key(),
            (_, None) => "",
        };
        Self(format!("{bed_id}{scope}{}", kind.suffix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host accessory UUID for this key.
    pub fn uuid(&self) -> Uuid {
        Uuid::new_v5(&FACET_NAMESPACE, self.0.as_bytes())
    }
}

impl fmt::Display for FacetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FacetKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Tagged metadata kept next to the opaque host handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDescriptor {
    pub kind: FacetKind,
    pub bed_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    pub key: FacetKey,
}

impl FacetDescriptor {
    pub fn new(kind: FacetKind, bed_id: impl Into<String>, side: Option<Side>) -> Self {
        let bed_id = bed_id.into();
        let key = FacetKey::new(&bed_id, kind, side);
        Self {
            kind,
            bed_id,
            side,
            key,
        }
    }

    /// Human-facing name: `bed0leftSidenumber`, `bed0privacy`.
    pub fn display_name(&self, bed_index: usize) -> String {
        let key = self.key.as_str();
        let rest = key.strip_prefix(self.bed_id.as_str()).unwrap_or(key);
        format!("bed{bed_index}{rest}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keys_follow_bed_side_suffix_layout() {
        assert_eq!(
            FacetKey::new("B1", FacetKind::SleepNumber, Some(Side::Left)).as_str(),
            "B1leftSidenumber"
        );
        assert_eq!(
            FacetKey::new("B1", FacetKind::AnySideOccupancy, None).as_str(),
            "B1anySideoccupancy"
        );
        assert_eq!(
            FacetKey::new("B1", FacetKind::BothSidesOccupancy, None).as_str(),
            "B1bothSidesoccupancy"
        );
        assert_eq!(FacetKey::new("B1", FacetKind::Privacy, None).as_str(), "B1privacy");
        assert_eq!(
            FacetKey::new("B1", FacetKind::LightStrip, Some(Side::Right)).as_str(),
            "B1rightSidelightstrip"
        );
    }

    #[test]
    fn uuid_is_stable_per_key() {
        let a = FacetKey::new("B1", FacetKind::Flex, Some(Side::Left));
        let b = FacetKey::new("B1", FacetKind::Flex, Some(Side::Left));
        let c = FacetKey::new("B1", FacetKind::Flex, Some(Side::Right));
        assert_eq!(a.uuid(), b.uuid());
        assert_ne!(a.uuid(), c.uuid());
    }

    #[test]
    fn display_name_replaces_bed_id_with_index() {
        let d = FacetDescriptor::new(FacetKind::Occupancy, "-9223372019958625412", Some(Side::Right));
        assert_eq!(d.display_name(0), "bed0rightSideoccupancy");
        let p = FacetDescriptor::new(FacetKind::Privacy, "B7", None);
        assert_eq!(p.display_name(2), "bed2privacy");
    }

    #[test]
    fn descriptor_serializes_tagged() {
        let d = FacetDescriptor::new(FacetKind::FootWarmer, "B1", Some(Side::Left));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "foot_warmer");
        assert_eq!(json["side"], "left");
        assert_eq!(json["key"], "B1leftSidefootwarmer");
    }
}
