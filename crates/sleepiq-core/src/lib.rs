//! Polling bridge between the SleepIQ cloud and a smart-home host.
//!
//! This crate owns the domain model and the state-reconciliation logic:
//!
//! - **[`Bridge`]**: lifecycle facade. [`start()`](Bridge::start)
//!   authenticates, restores the host's accessory cache, discovers
//!   facets and spawns the periodic poll task. [`tick()`](Bridge::tick)
//!   runs one poll cycle and never fails.
//!
//! - **[`DeviceRegistry`]**: `FacetKey -> Accessory` map on `DashMap`,
//!   with stale marks and a pending-removal list drained by maintenance.
//!
//! - **[`Accessory`]**: one state object per facet. Values live in
//!   `watch` channels; `set_*` writes go upstream without touching the
//!   cache, sleep-number writes through the [`WriteDebouncer`].
//!
//! - **[`AccessoryHost`]**: the seam to the host framework, with an
//!   in-memory [`MemoryHost`] implementation.

pub mod accessory;
pub mod bridge;
pub mod command;
pub mod config;
pub mod debounce;
pub mod error;
pub mod host;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod state;

// ── Primary re-exports ──────────────────────────────────────────────
pub use accessory::{
    Accessory, FlexAccessory, FlexPosition, FootWarmerAccessory, OccupancyAccessory,
    OutletAccessory, PrivacyAccessory, SleepNumberAccessory,
};
pub use bridge::{Bridge, BridgePhase, TickOutcome};
pub use command::{Command, CommandExecutor};
pub use config::BridgeConfig;
pub use debounce::WriteDebouncer;
pub use error::CoreError;
pub use host::{
    AccessoryHandle, AccessoryHost, CachedAccessory, Characteristic, CharacteristicValue,
    MemoryHost, Notification,
};
pub use model::{Bed, FacetDescriptor, FacetKey, FacetKind, FoundationState, Side, SideStatus};
pub use reconcile::{DiscoveryReport, RestoreReport};
pub use registry::DeviceRegistry;
pub use state::{FoundationProbe, PlatformState};

pub use sleepiq_api::{Actuator, SleepIqClient, TlsMode};
