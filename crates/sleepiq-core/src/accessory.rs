// ── Accessory state objects ──
//
// One object per facet. Each caches the last polled value in a `watch`
// channel: getters read the cache and never call upstream, `update_*`
// (poll loop only) overwrites it and notifies the host, and `set_*`
// issues the upstream write without touching the cache. The next poll
// is what makes a write visible.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use sleepiq_api::Actuator;
use tokio::sync::watch;
use tracing::debug;

use crate::command::{Command, CommandExecutor};
use crate::debounce::WriteDebouncer;
use crate::error::CoreError;
use crate::host::{AccessoryHandle, AccessoryHost, CachedAccessory, Characteristic, CharacteristicValue};
use crate::model::{FacetDescriptor, FacetKey, FacetKind, Side, normalize_sleep_number};

/// Shared collaborators handed to every accessory at construction.
#[derive(Clone)]
pub(crate) struct AccessoryContext {
    pub host: Arc<dyn AccessoryHost>,
    pub commands: Weak<CommandExecutor>,
    pub debouncer: Arc<WriteDebouncer>,
    pub send_delay: Duration,
}

struct Base {
    descriptor: FacetDescriptor,
    handle: AccessoryHandle,
    host: Arc<dyn AccessoryHost>,
    commands: Weak<CommandExecutor>,
}

impl Base {
    fn notify(&self, characteristic: Characteristic, value: CharacteristicValue) {
        debug!(
            accessory = %self.handle.display_name,
            %characteristic,
            %value,
            "characteristic updated"
        );
        self.host.notify(&self.handle, characteristic, value);
    }

    async fn execute(&self, cmd: Command) -> Result<(), CoreError> {
        let executor = self.commands.upgrade().ok_or(CoreError::SessionClosed)?;
        executor.execute(cmd).await
    }

    fn bed_id(&self) -> String {
        self.descriptor.bed_id.clone()
    }

    fn side(&self) -> Side {
        self.descriptor.side.unwrap_or(Side::Left)
    }
}

/// Store `value`, returning `true` if it differs from the cache.
fn store<T: PartialEq + Copy>(tx: &watch::Sender<Option<T>>, value: T) -> bool {
    tx.send_if_modified(|current| {
        if *current == Some(value) {
            false
        } else {
            *current = Some(value);
            true
        }
    })
}

fn cached<T: Copy + Default>(tx: &watch::Sender<Option<T>>) -> T {
    tx.borrow().unwrap_or_default()
}

// ── Occupancy ────────────────────────────────────────────────────────

/// Per-side occupancy or an any/both-sides aggregate. Read-only.
pub struct OccupancyAccessory {
    base: Base,
    occupied: watch::Sender<Option<bool>>,
}

impl OccupancyAccessory {
    pub fn occupied(&self) -> bool {
        cached(&self.occupied)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<bool>> {
        self.occupied.subscribe()
    }

    pub fn update_occupied(&self, occupied: bool) {
        if store(&self.occupied, occupied) {
            self.base.notify(
                Characteristic::OccupancyDetected,
                CharacteristicValue::Bool(occupied),
            );
        }
    }
}

// ── Sleep number ─────────────────────────────────────────────────────

/// Side firmness, 5..=100 in steps of 5. Writes are debounced.
pub struct SleepNumberAccessory {
    base: Base,
    value: watch::Sender<Option<u8>>,
    debouncer: Arc<WriteDebouncer>,
    send_delay: Duration,
}

impl SleepNumberAccessory {
    pub fn sleep_number(&self) -> u8 {
        cached(&self.value)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<u8>> {
        self.value.subscribe()
    }

    pub fn update_sleep_number(&self, value: u8) {
        if store(&self.value, value) {
            self.base
                .notify(Characteristic::SleepNumber, CharacteristicValue::Number(value));
        }
    }

    /// Schedule a write after the send delay. Returns the snapped value.
    pub fn set_sleep_number(&self, value: u8) -> u8 {
        let value = normalize_sleep_number(value);
        let commands = self.base.commands.clone();
        let cmd = Command::SetSleepNumber {
            bed_id: self.base.bed_id(),
            side: self.base.side(),
            value,
        };
        debug!(accessory = %self.base.handle.display_name, value, "scheduling sleep number");
        self.debouncer
            .debounce(self.base.descriptor.key.clone(), self.send_delay, async move {
                let executor = commands.upgrade().ok_or(CoreError::SessionClosed)?;
                executor.execute(cmd).await
            });
        value
    }
}

// ── Flex foundation ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlexPosition {
    pub head: u8,
    pub foot: u8,
}

/// Head and foot actuator positions for one side.
pub struct FlexAccessory {
    base: Base,
    position: watch::Sender<Option<FlexPosition>>,
}

impl FlexAccessory {
    pub fn position(&self) -> FlexPosition {
        cached(&self.position)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<FlexPosition>> {
        self.position.subscribe()
    }

    pub fn update_position(&self, position: FlexPosition) {
        let previous = *self.position.borrow();
        if store(&self.position, position) {
            if previous.map(|p| p.head) != Some(position.head) {
                self.base
                    .notify(Characteristic::FlexHead, CharacteristicValue::Number(position.head));
            }
            if previous.map(|p| p.foot) != Some(position.foot) {
                self.base
                    .notify(Characteristic::FlexFoot, CharacteristicValue::Number(position.foot));
            }
        }
    }

    pub async fn set_head(&self, position: u8) -> Result<(), CoreError> {
        self.adjust(Actuator::Head, position).await
    }

    pub async fn set_foot(&self, position: u8) -> Result<(), CoreError> {
        self.adjust(Actuator::Foot, position).await
    }

    async fn adjust(&self, actuator: Actuator, position: u8) -> Result<(), CoreError> {
        self.base
            .execute(Command::Adjust {
                bed_id: self.base.bed_id(),
                side: self.base.side(),
                actuator,
                position,
            })
            .await
    }
}

// ── Privacy ──────────────────────────────────────────────────────────

/// Bed pause mode.
pub struct PrivacyAccessory {
    base: Base,
    enabled: watch::Sender<Option<bool>>,
}

impl PrivacyAccessory {
    pub fn enabled(&self) -> bool {
        cached(&self.enabled)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<bool>> {
        self.enabled.subscribe()
    }

    pub fn update_enabled(&self, enabled: bool) {
        if store(&self.enabled, enabled) {
            self.base
                .notify(Characteristic::Privacy, CharacteristicValue::Bool(enabled));
        }
    }

    /// Apply the upstream `pauseMode` string.
    pub fn update_mode(&self, mode: &str) {
        self.update_enabled(mode.eq_ignore_ascii_case("on"));
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<(), CoreError> {
        self.base
            .execute(Command::SetPrivacy {
                bed_id: self.base.bed_id(),
                enabled,
            })
            .await
    }
}

// ── Outlets and light strips ─────────────────────────────────────────

/// A foundation outlet: side outlets 1/2, light strips 3/4.
pub struct OutletAccessory {
    base: Base,
    outlet_id: u8,
    on: watch::Sender<Option<bool>>,
}

impl OutletAccessory {
    pub fn outlet_id(&self) -> u8 {
        self.outlet_id
    }

    pub fn is_on(&self) -> bool {
        cached(&self.on)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<bool>> {
        self.on.subscribe()
    }

    pub fn update_on(&self, on: bool) {
        if store(&self.on, on) {
            self.base.notify(Characteristic::On, CharacteristicValue::Bool(on));
        }
    }

    pub async fn set_on(&self, on: bool) -> Result<(), CoreError> {
        self.base
            .execute(Command::SetOutlet {
                bed_id: self.base.bed_id(),
                outlet_id: self.outlet_id,
                on,
            })
            .await
    }
}

// ── Foot warmer ──────────────────────────────────────────────────────

/// Foot warmer level 0..=3 (off, low, medium, high).
pub struct FootWarmerAccessory {
    base: Base,
    level: watch::Sender<Option<u8>>,
}

impl FootWarmerAccessory {
    pub fn level(&self) -> u8 {
        cached(&self.level)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<u8>> {
        self.level.subscribe()
    }

    pub fn update_level(&self, level: u8) {
        if store(&self.level, level) {
            self.base
                .notify(Characteristic::FootWarmerLevel, CharacteristicValue::Number(level));
        }
    }

    pub async fn set_level(&self, level: u8) -> Result<(), CoreError> {
        self.base
            .execute(Command::SetFootWarmer {
                bed_id: self.base.bed_id(),
                side: self.base.side(),
                level,
            })
            .await
    }
}

// ── Accessory ────────────────────────────────────────────────────────

/// A facet's state object, by kind.
pub enum Accessory {
    /// Also used for the any-side and both-sides aggregates.
    Occupancy(OccupancyAccessory),
    SleepNumber(SleepNumberAccessory),
    Flex(FlexAccessory),
    Privacy(PrivacyAccessory),
    /// Also used for light strips.
    Outlet(OutletAccessory),
    FootWarmer(FootWarmerAccessory),
}

impl Accessory {
    /// Build the state object for `descriptor`, bound to `handle`.
    pub(crate) fn build(
        descriptor: FacetDescriptor,
        handle: AccessoryHandle,
        ctx: &AccessoryContext,
    ) -> Result<Self, CoreError> {
        if descriptor.kind.is_per_side() && descriptor.side.is_none() {
            return Err(CoreError::Validation {
                message: format!("{} facet {} has no side", descriptor.kind, descriptor.key),
            });
        }

        let kind = descriptor.kind;
        let side = descriptor.side;
        let base = Base {
            descriptor,
            handle,
            host: Arc::clone(&ctx.host),
            commands: ctx.commands.clone(),
        };

        Ok(match kind {
            FacetKind::Occupancy | FacetKind::AnySideOccupancy | FacetKind::BothSidesOccupancy => {
                Self::Occupancy(OccupancyAccessory {
                    base,
                    occupied: watch::Sender::new(None),
                })
            }
            FacetKind::SleepNumber => Self::SleepNumber(SleepNumberAccessory {
                base,
                value: watch::Sender::new(None),
                debouncer: Arc::clone(&ctx.debouncer),
                send_delay: ctx.send_delay,
            }),
            FacetKind::Flex => Self::Flex(FlexAccessory {
                base,
                position: watch::Sender::new(None),
            }),
            FacetKind::Privacy => Self::Privacy(PrivacyAccessory {
                base,
                enabled: watch::Sender::new(None),
            }),
            FacetKind::Outlet | FacetKind::LightStrip => {
                let side = side.unwrap_or(Side::Left);
                let outlet_id = if kind == FacetKind::Outlet {
                    side.outlet_id()
                } else {
                    side.light_strip_id()
                };
                Self::Outlet(OutletAccessory {
                    base,
                    outlet_id,
                    on: watch::Sender::new(None),
                })
            }
            FacetKind::FootWarmer => Self::FootWarmer(FootWarmerAccessory {
                base,
                level: watch::Sender::new(None),
            }),
        })
    }

    fn base(&self) -> &Base {
        match self {
            Self::Occupancy(a) => &a.base,
            Self::SleepNumber(a) => &a.base,
            Self::Flex(a) => &a.base,
            Self::Privacy(a) => &a.base,
            Self::Outlet(a) => &a.base,
            Self::FootWarmer(a) => &a.base,
        }
    }

    pub fn descriptor(&self) -> &FacetDescriptor {
        &self.base().descriptor
    }

    pub fn handle(&self) -> &AccessoryHandle {
        &self.base().handle
    }

    pub fn key(&self) -> &FacetKey {
        &self.base().descriptor.key
    }

    pub fn kind(&self) -> FacetKind {
        self.base().descriptor.kind
    }

    pub fn display_name(&self) -> &str {
        &self.base().handle.display_name
    }

    /// The host cache entry for this accessory.
    pub fn to_cached(&self) -> CachedAccessory {
        CachedAccessory {
            handle: self.handle().clone(),
            descriptor: Some(self.descriptor().clone()),
        }
    }

    /// Cached characteristic values; empty until the first poll.
    pub fn values(&self) -> Vec<(Characteristic, CharacteristicValue)> {
        use CharacteristicValue::{Bool, Number};
        match self {
            Self::Occupancy(a) => (*a.occupied.borrow())
                .map(|v| vec![(Characteristic::OccupancyDetected, Bool(v))])
                .unwrap_or_default(),
            Self::SleepNumber(a) => (*a.value.borrow())
                .map(|v| vec![(Characteristic::SleepNumber, Number(v))])
                .unwrap_or_default(),
            Self::Flex(a) => (*a.position.borrow())
                .map(|p| {
                    vec![
                        (Characteristic::FlexHead, Number(p.head)),
                        (Characteristic::FlexFoot, Number(p.foot)),
                    ]
                })
                .unwrap_or_default(),
            Self::Privacy(a) => (*a.enabled.borrow())
                .map(|v| vec![(Characteristic::Privacy, Bool(v))])
                .unwrap_or_default(),
            Self::Outlet(a) => (*a.on.borrow())
                .map(|v| vec![(Characteristic::On, Bool(v))])
                .unwrap_or_default(),
            Self::FootWarmer(a) => (*a.level.borrow())
                .map(|v| vec![(Characteristic::FootWarmerLevel, Number(v))])
                .unwrap_or_default(),
        }
    }

    pub fn as_occupancy(&self) -> Option<&OccupancyAccessory> {
        match self {
            Self::Occupancy(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_sleep_number(&self) -> Option<&SleepNumberAccessory> {
        match self {
            Self::SleepNumber(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_flex(&self) -> Option<&FlexAccessory> {
        match self {
            Self::Flex(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_privacy(&self) -> Option<&PrivacyAccessory> {
        match self {
            Self::Privacy(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_outlet(&self) -> Option<&OutletAccessory> {
        match self {
            Self::Outlet(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_foot_warmer(&self) -> Option<&FootWarmerAccessory> {
        match self {
            Self::FootWarmer(a) => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use pretty_assertions::assert_eq;

    fn context(host: &Arc<MemoryHost>) -> AccessoryContext {
        AccessoryContext {
            host: Arc::clone(host) as Arc<dyn AccessoryHost>,
            commands: Weak::new(),
            debouncer: Arc::new(WriteDebouncer::new()),
            send_delay: Duration::from_millis(10),
        }
    }

    fn build(kind: FacetKind, side: Option<Side>, host: &Arc<MemoryHost>) -> Accessory {
        let descriptor = FacetDescriptor::new(kind, "B1", side);
        let handle = AccessoryHandle {
            uuid: descriptor.key.uuid(),
            display_name: descriptor.display_name(0),
        };
        Accessory::build(descriptor, handle, &context(host)).unwrap()
    }

    #[test]
    fn update_notifies_only_on_change() {
        let host = Arc::new(MemoryHost::new());
        let acc = build(FacetKind::Occupancy, Some(Side::Left), &host);
        let occ = acc.as_occupancy().unwrap();

        assert!(acc.values().is_empty());
        occ.update_occupied(false);
        occ.update_occupied(false);
        occ.update_occupied(true);

        assert!(occ.occupied());
        let values: Vec<_> = host.notifications().iter().map(|n| n.value).collect();
        assert_eq!(
            values,
            vec![CharacteristicValue::Bool(false), CharacteristicValue::Bool(true)]
        );
    }

    #[test]
    fn flex_notifies_changed_actuator_only() {
        let host = Arc::new(MemoryHost::new());
        let acc = build(FacetKind::Flex, Some(Side::Right), &host);
        let flex = acc.as_flex().unwrap();

        flex.update_position(FlexPosition { head: 10, foot: 0 });
        flex.update_position(FlexPosition { head: 30, foot: 0 });

        let chars: Vec<_> = host.notifications().iter().map(|n| n.characteristic).collect();
        assert_eq!(
            chars,
            vec![
                Characteristic::FlexHead,
                Characteristic::FlexFoot,
                Characteristic::FlexHead
            ]
        );
        assert_eq!(flex.position(), FlexPosition { head: 30, foot: 0 });
    }

    #[test]
    fn light_strips_use_outlets_three_and_four() {
        let host = Arc::new(MemoryHost::new());
        let left = build(FacetKind::LightStrip, Some(Side::Left), &host);
        let right = build(FacetKind::Outlet, Some(Side::Right), &host);
        assert_eq!(left.as_outlet().unwrap().outlet_id(), 3);
        assert_eq!(right.as_outlet().unwrap().outlet_id(), 2);
    }

    #[test]
    fn per_side_kind_without_side_is_rejected() {
        let host = Arc::new(MemoryHost::new());
        let descriptor = FacetDescriptor::new(FacetKind::SleepNumber, "B1", None);
        let handle = AccessoryHandle {
            uuid: descriptor.key.uuid(),
            display_name: "bed0number".into(),
        };
        assert!(Accessory::build(descriptor, handle, &context(&host)).is_err());
    }

    #[test]
    fn privacy_reads_pause_mode_strings() {
        let host = Arc::new(MemoryHost::new());
        let acc = build(FacetKind::Privacy, None, &host);
        let privacy = acc.as_privacy().unwrap();
        privacy.update_mode("on");
        assert!(privacy.enabled());
        privacy.update_mode("off");
        assert!(!privacy.enabled());
    }

    #[tokio::test]
    async fn write_after_executor_dropped_is_session_closed() {
        let host = Arc::new(MemoryHost::new());
        let acc = build(FacetKind::Privacy, None, &host);
        let err = acc.as_privacy().unwrap().set_enabled(true).await.unwrap_err();
        assert!(matches!(err, CoreError::SessionClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_number_set_does_not_touch_cache() {
        let host = Arc::new(MemoryHost::new());
        let acc = build(FacetKind::SleepNumber, Some(Side::Left), &host);
        let number = acc.as_sleep_number().unwrap();

        number.update_sleep_number(30);
        assert_eq!(number.set_sleep_number(47), 45);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(number.sleep_number(), 30);
    }
}
