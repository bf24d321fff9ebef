// ── Platform state ──
//
// Everything the polling loop and the reconciliation engine share,
// constructed once per bridge.

use std::sync::Arc;

use dashmap::DashMap;
use sleepiq_api::SleepIqClient;

use crate::accessory::{Accessory, AccessoryContext};
use crate::command::CommandExecutor;
use crate::config::BridgeConfig;
use crate::debounce::WriteDebouncer;
use crate::host::AccessoryHost;
use crate::model::{FacetKey, FacetKind, Side};
use crate::registry::DeviceRegistry;

/// Outcome of probing a bed for a foundation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoundationProbe {
    Present,
    /// The foundation endpoint answered 404.
    Absent,
    /// Any other failure; the previously known capability stands.
    Unknown,
}

/// Capability as last recorded for one bed.
#[derive(Debug, Clone, Copy)]
struct FoundationRecord {
    has_foundation: bool,
    /// False while the value is only a guess from an `Unknown` probe.
    settled: bool,
}

pub struct PlatformState {
    pub config: BridgeConfig,
    pub client: Arc<SleepIqClient>,
    pub commands: Arc<CommandExecutor>,
    pub registry: DeviceRegistry,
    pub host: Arc<dyn AccessoryHost>,
    pub debouncer: Arc<WriteDebouncer>,
    /// bed id -> foundation capability.
    foundations: DashMap<String, FoundationRecord>,
}

impl PlatformState {
    pub fn new(config: BridgeConfig, client: SleepIqClient, host: Arc<dyn AccessoryHost>) -> Self {
        let client = Arc::new(client);
        let commands = Arc::new(CommandExecutor::new(Arc::clone(&client), &config));
        Self {
            config,
            client,
            commands,
            registry: DeviceRegistry::new(),
            host,
            debouncer: Arc::new(WriteDebouncer::new()),
            foundations: DashMap::new(),
        }
    }

    pub(crate) fn accessory_context(&self) -> AccessoryContext {
        AccessoryContext {
            host: Arc::clone(&self.host),
            commands: Arc::downgrade(&self.commands),
            debouncer: Arc::clone(&self.debouncer),
            send_delay: self.config.send_delay,
        }
    }

    /// Last known foundation capability for `bed_id`.
    pub fn has_foundation(&self, bed_id: &str) -> bool {
        self.foundations.get(bed_id).is_some_and(|r| r.has_foundation)
    }

    /// Whether the recorded capability for `bed_id` came from a failed
    /// probe and should be probed again.
    pub fn foundation_pending(&self, bed_id: &str) -> bool {
        self.foundations.get(bed_id).is_some_and(|r| !r.settled)
    }

    /// Fold a probe result into the capability map and return the
    /// resulting capability.
    ///
    /// An `Unknown` probe keeps the recorded value and leaves the bed
    /// pending; with nothing recorded yet, foundation facets already in the
    /// registry (restored from the host cache) count as evidence of a
    /// foundation.
    pub(crate) fn record_foundation(&self, bed_id: &str, probe: FoundationProbe) -> bool {
        let record = match probe {
            FoundationProbe::Present => FoundationRecord {
                has_foundation: true,
                settled: true,
            },
            FoundationProbe::Absent => FoundationRecord {
                has_foundation: false,
                settled: true,
            },
            FoundationProbe::Unknown => {
                let known = self.foundations.get(bed_id).map(|r| r.has_foundation);
                FoundationRecord {
                    has_foundation: known.unwrap_or_else(|| self.registry_has_foundation_facets(bed_id)),
                    settled: false,
                }
            }
        };
        self.foundations.insert(bed_id.to_owned(), record);
        record.has_foundation
    }

    fn registry_has_foundation_facets(&self, bed_id: &str) -> bool {
        self.registry.snapshot().iter().any(|a| {
            let d = a.descriptor();
            d.bed_id == bed_id && d.kind.requires_foundation()
        })
    }

    /// Look up the accessory for one facet.
    pub fn facet(&self, bed_id: &str, kind: FacetKind, side: Option<Side>) -> Option<Arc<Accessory>> {
        self.registry.get(&FacetKey::new(bed_id, kind, side))
    }
}
