// ── Host framework seam ──
//
// The smart-home host owns the user-visible accessories. The bridge only
// registers, unregisters and pushes characteristic values through this
// trait, and receives the host's persisted accessory cache at startup.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::FacetDescriptor;

/// Opaque host-side accessory identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryHandle {
    pub uuid: Uuid,
    pub display_name: String,
}

/// An accessory as the host persists it between runs.
///
/// `descriptor` is `None` for entries written by older schemas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccessory {
    pub handle: AccessoryHandle,
    #[serde(default)]
    pub descriptor: Option<FacetDescriptor>,
}

/// Characteristic pushed to the host on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Characteristic {
    OccupancyDetected,
    SleepNumber,
    FlexHead,
    FlexFoot,
    Privacy,
    On,
    FootWarmerLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CharacteristicValue {
    Bool(bool),
    Number(u8),
}

impl std::fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Number(v) => write!(f, "{v}"),
        }
    }
}

/// Host framework operations the bridge depends on.
pub trait AccessoryHost: Send + Sync {
    /// Accessories persisted by a previous run.
    fn restore(&self) -> Vec<CachedAccessory> {
        Vec::new()
    }

    fn register(&self, accessory: &CachedAccessory);

    fn unregister(&self, handle: &AccessoryHandle);

    fn notify(
        &self,
        handle: &AccessoryHandle,
        characteristic: Characteristic,
        value: CharacteristicValue,
    );
}

// ── In-memory host ───────────────────────────────────────────────────

/// A recorded `notify` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub handle: AccessoryHandle,
    pub characteristic: Characteristic,
    pub value: CharacteristicValue,
}

#[derive(Default)]
struct MemoryHostState {
    cache: Vec<CachedAccessory>,
    registered: Vec<CachedAccessory>,
    unregistered: Vec<AccessoryHandle>,
    notifications: Vec<Notification>,
}

/// Host that keeps everything in memory. Used for one-shot CLI runs and
/// tests.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<MemoryHostState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that hands `cache` back from [`AccessoryHost::restore`].
    pub fn with_cache(cache: Vec<CachedAccessory>) -> Self {
        let host = Self::default();
        host.lock().cache = cache;
        host
    }

    /// Currently registered accessories.
    pub fn registered(&self) -> Vec<CachedAccessory> {
        self.lock().registered.clone()
    }

    pub fn is_registered(&self, uuid: Uuid) -> bool {
        self.lock().registered.iter().any(|a| a.handle.uuid == uuid)
    }

    /// Every handle passed to `unregister`, in order.
    pub fn unregistered(&self) -> Vec<AccessoryHandle> {
        self.lock().unregistered.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryHostState> {
        self.state.lock().expect("memory host lock poisoned")
    }
}

impl AccessoryHost for MemoryHost {
    fn restore(&self) -> Vec<CachedAccessory> {
        let mut state = self.lock();
        let cache = std::mem::take(&mut state.cache);
        state.registered.extend(cache.iter().cloned());
        cache
    }

    fn register(&self, accessory: &CachedAccessory) {
        let mut state = self.lock();
        state
            .registered
            .retain(|a| a.handle.uuid != accessory.handle.uuid);
        state.registered.push(accessory.clone());
    }

    fn unregister(&self, handle: &AccessoryHandle) {
        let mut state = self.lock();
        state.registered.retain(|a| a.handle.uuid != handle.uuid);
        state.unregistered.push(handle.clone());
    }

    fn notify(
        &self,
        handle: &AccessoryHandle,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) {
        self.lock().notifications.push(Notification {
            handle: handle.clone(),
            characteristic,
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FacetKind, Side};

    fn cached(name: &str) -> CachedAccessory {
        let descriptor = FacetDescriptor::new(FacetKind::SleepNumber, "B1", Some(Side::Left));
        CachedAccessory {
            handle: AccessoryHandle {
                uuid: descriptor.key.uuid(),
                display_name: name.into(),
            },
            descriptor: Some(descriptor),
        }
    }

    #[test]
    fn restored_cache_counts_as_registered() {
        let host = MemoryHost::with_cache(vec![cached("bed0leftSidenumber")]);
        let restored = host.restore();
        assert_eq!(restored.len(), 1);
        assert!(host.is_registered(restored[0].handle.uuid));
        assert!(host.restore().is_empty());
    }

    #[test]
    fn unregister_drops_and_records() {
        let host = MemoryHost::new();
        let acc = cached("bed0leftSidenumber");
        host.register(&acc);
        host.register(&acc);
        assert_eq!(host.registered().len(), 1);

        host.unregister(&acc.handle);
        assert!(host.registered().is_empty());
        assert_eq!(host.unregistered(), vec![acc.handle]);
    }
}
