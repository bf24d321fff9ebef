// ── Device registry ──
//
// Concurrent `FacetKey -> Accessory` map plus the bookkeeping for
// removals: facets marked stale by discovery, and restored cache entries
// rejected before they were ever inserted. Both are drained by the next
// maintenance pass.

use std::sync::{Arc, Mutex};

use dashmap::{DashMap, DashSet};
use tokio::sync::watch;

use crate::accessory::Accessory;
use crate::host::AccessoryHandle;
use crate::model::FacetKey;

pub struct DeviceRegistry {
    accessories: DashMap<FacetKey, Arc<Accessory>>,
    stale: DashSet<FacetKey>,
    pending_removal: Mutex<Vec<AccessoryHandle>>,
    /// Bumped on insert / remove.
    version: watch::Sender<u64>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            accessories: DashMap::new(),
            stale: DashSet::new(),
            pending_removal: Mutex::new(Vec::new()),
            version: watch::Sender::new(0),
        }
    }

    /// Insert an accessory under its own key. Returns `true` if the key
    /// was new.
    pub fn insert(&self, accessory: Accessory) -> bool {
        let key = accessory.key().clone();
        self.stale.remove(&key);
        let is_new = self.accessories.insert(key, Arc::new(accessory)).is_none();
        self.bump_version();
        is_new
    }

    pub fn remove(&self, key: &FacetKey) -> Option<Arc<Accessory>> {
        self.stale.remove(key);
        let removed = self.accessories.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    pub fn get(&self, key: &FacetKey) -> Option<Arc<Accessory>> {
        self.accessories.get(key).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, key: &FacetKey) -> bool {
        self.accessories.contains_key(key)
    }

    pub fn keys(&self) -> Vec<FacetKey> {
        self.accessories.iter().map(|r| r.key().clone()).collect()
    }

    /// All accessories, sorted by key.
    pub fn snapshot(&self) -> Vec<Arc<Accessory>> {
        let mut all: Vec<Arc<Accessory>> =
            self.accessories.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by(|a, b| a.key().cmp(b.key()));
        all
    }

    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }

    pub fn has_display_name(&self, name: &str) -> bool {
        self.accessories.iter().any(|r| r.value().display_name() == name)
    }

    /// Subscribe to registry changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ── Removal bookkeeping ──────────────────────────────────────────

    /// Mark a registered facet for removal on the next maintenance pass.
    pub fn mark_stale(&self, key: &FacetKey) -> bool {
        self.accessories.contains_key(key) && self.stale.insert(key.clone())
    }

    pub fn unmark_stale(&self, key: &FacetKey) {
        self.stale.remove(key);
    }

    pub fn is_stale(&self, key: &FacetKey) -> bool {
        self.stale.contains(key)
    }

    pub fn stale_keys(&self) -> Vec<FacetKey> {
        self.stale.iter().map(|k| k.clone()).collect()
    }

    /// Remove and return every stale accessory.
    pub fn take_stale(&self) -> Vec<Arc<Accessory>> {
        self.stale_keys()
            .iter()
            .filter_map(|key| self.remove(key))
            .collect()
    }

    /// Queue a restored host handle that must never be re-added.
    pub fn flag_for_removal(&self, handle: AccessoryHandle) {
        self.lock_pending().push(handle);
    }

    pub fn pending_removals(&self) -> Vec<AccessoryHandle> {
        self.lock_pending().clone()
    }

    pub fn take_pending_removals(&self) -> Vec<AccessoryHandle> {
        std::mem::take(&mut *self.lock_pending())
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<AccessoryHandle>> {
        self.pending_removal
            .lock()
            .expect("pending removal lock poisoned")
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Weak;
    use std::time::Duration;

    use super::*;
    use crate::accessory::AccessoryContext;
    use crate::debounce::WriteDebouncer;
    use crate::host::{AccessoryHost, MemoryHost};
    use crate::model::{FacetDescriptor, FacetKind, Side};

    fn accessory(kind: FacetKind, side: Option<Side>) -> Accessory {
        let ctx = AccessoryContext {
            host: Arc::new(MemoryHost::new()) as Arc<dyn AccessoryHost>,
            commands: Weak::new(),
            debouncer: Arc::new(WriteDebouncer::new()),
            send_delay: Duration::from_secs(2),
        };
        let descriptor = FacetDescriptor::new(kind, "B1", side);
        let handle = AccessoryHandle {
            uuid: descriptor.key.uuid(),
            display_name: descriptor.display_name(0),
        };
        Accessory::build(descriptor, handle, &ctx).unwrap()
    }

    #[test]
    fn insert_reports_new_keys() {
        let reg = DeviceRegistry::new();
        assert!(reg.insert(accessory(FacetKind::Privacy, None)));
        assert!(!reg.insert(accessory(FacetKind::Privacy, None)));
        assert_eq!(reg.len(), 1);
        assert!(reg.has_display_name("bed0privacy"));
    }

    #[test]
    fn stale_marks_only_registered_keys() {
        let reg = DeviceRegistry::new();
        reg.insert(accessory(FacetKind::SleepNumber, Some(Side::Left)));
        let known = FacetKey::new("B1", FacetKind::SleepNumber, Some(Side::Left));
        let unknown = FacetKey::new("B1", FacetKind::SleepNumber, Some(Side::Right));

        assert!(reg.mark_stale(&known));
        assert!(!reg.mark_stale(&unknown));
        assert!(reg.is_stale(&known));

        let removed = reg.take_stale();
        assert_eq!(removed.len(), 1);
        assert!(reg.is_empty());
        assert!(reg.stale_keys().is_empty());
    }

    #[test]
    fn reinsert_clears_stale_mark() {
        let reg = DeviceRegistry::new();
        reg.insert(accessory(FacetKind::Flex, Some(Side::Left)));
        let key = FacetKey::new("B1", FacetKind::Flex, Some(Side::Left));
        reg.mark_stale(&key);
        reg.insert(accessory(FacetKind::Flex, Some(Side::Left)));
        assert!(!reg.is_stale(&key));
    }

    #[test]
    fn pending_removals_drain_once() {
        let reg = DeviceRegistry::new();
        let handle = AccessoryHandle {
            uuid: uuid::Uuid::new_v4(),
            display_name: "bed0leftSide".into(),
        };
        reg.flag_for_removal(handle.clone());
        assert_eq!(reg.pending_removals(), vec![handle.clone()]);
        assert_eq!(reg.take_pending_removals(), vec![handle]);
        assert!(reg.take_pending_removals().is_empty());
    }

    #[test]
    fn version_bumps_on_change() {
        let reg = DeviceRegistry::new();
        let rx = reg.subscribe();
        reg.insert(accessory(FacetKind::Privacy, None));
        reg.remove(&FacetKey::new("B1", FacetKind::Privacy, None));
        assert_eq!(*rx.borrow(), 2);
    }
}
