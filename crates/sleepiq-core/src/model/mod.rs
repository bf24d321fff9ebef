// ── Domain model ──
//
// Validated bed state and the facet identity scheme shared by the
// registry, the reconciliation engine and the host seam.

pub mod bed;
pub mod facet;

// ── Re-exports ──────────────────────────────────────────────────────

pub use bed::{
    Bed, FOOT_WARMER_CODES, FoundationState, SideStatus, foot_warmer_code, foot_warmer_level,
    normalize_sleep_number,
};
pub use facet::{FacetDescriptor, FacetKey, FacetKind, Side};
