// ── Reconciliation engine ──
//
// Derives the facet set implied by the authoritative bed list, creates
// accessories for facets the registry lacks, and marks registry entries
// nothing derives anymore as stale. Also owns the startup restore path
// and the maintenance pass that unregisters stale and rejected entries.

use std::collections::HashSet;

use sleepiq_api::SleepIqClient;
use tracing::{debug, info, warn};

use crate::accessory::Accessory;
use crate::error::CoreError;
use crate::host::{AccessoryHandle, CachedAccessory};
use crate::model::{Bed, FacetDescriptor, FacetKey, FacetKind, Side};
use crate::state::{FoundationProbe, PlatformState};

/// What a discovery cycle changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub beds: usize,
    pub added: Vec<FacetKey>,
    pub stale: Vec<FacetKey>,
}

/// What the restore path did with the host cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    pub rejected: usize,
}

/// Every facet a bed exposes, given its reported sides and known
/// foundation capability.
pub fn derive_facets(bed: &Bed) -> Vec<FacetDescriptor> {
    let sides: Vec<Side> = bed.sides().map(|(side, _)| side).collect();
    let mut facets = Vec::with_capacity(16);
    for &side in &sides {
        facets.push(FacetDescriptor::new(FacetKind::Occupancy, &bed.bed_id, Some(side)));
        facets.push(FacetDescriptor::new(FacetKind::SleepNumber, &bed.bed_id, Some(side)));
    }
    facets.push(FacetDescriptor::new(FacetKind::Privacy, &bed.bed_id, None));
    facets.push(FacetDescriptor::new(FacetKind::AnySideOccupancy, &bed.bed_id, None));
    facets.push(FacetDescriptor::new(FacetKind::BothSidesOccupancy, &bed.bed_id, None));

    if bed.has_foundation {
        for &side in &sides {
            for kind in [
                FacetKind::Flex,
                FacetKind::Outlet,
                FacetKind::LightStrip,
                FacetKind::FootWarmer,
            ] {
                facets.push(FacetDescriptor::new(kind, &bed.bed_id, Some(side)));
            }
        }
    }
    facets
}

/// Probe one bed for a foundation.
pub async fn probe_foundation(client: &SleepIqClient, bed_id: &str) -> FoundationProbe {
    match client.foundation_status(bed_id).await {
        Ok(_) => FoundationProbe::Present,
        Err(e) if e.is_not_found() => {
            info!(bed = %bed_id, "no foundation detected");
            FoundationProbe::Absent
        }
        Err(e) => {
            warn!(bed = %bed_id, error = %e, "foundation probe failed, keeping previous capability");
            FoundationProbe::Unknown
        }
    }
}

/// Fill `has_foundation` from the capability map.
pub(crate) fn apply_capability(state: &PlatformState, beds: &mut [Bed]) {
    for bed in beds {
        bed.has_foundation = state.has_foundation(&bed.bed_id);
    }
}

/// Facet keys implied by `beds` that the registry does not hold.
pub fn missing_facets(state: &PlatformState, beds: &[Bed]) -> Vec<FacetKey> {
    beds.iter()
        .flat_map(derive_facets)
        .map(|d| d.key)
        .filter(|key| !state.registry.contains(key))
        .collect()
}

/// Registry entries `beds` no longer imply that are not yet marked stale.
pub fn extra_facets(state: &PlatformState, beds: &[Bed]) -> Vec<FacetKey> {
    let derived: HashSet<FacetKey> = beds.iter().flat_map(derive_facets).map(|d| d.key).collect();
    state
        .registry
        .keys()
        .into_iter()
        .filter(|key| !derived.contains(key) && !state.registry.is_stale(key))
        .collect()
}

/// Fetch the bed list and reconcile the registry against it.
///
/// A malformed or empty bed list makes the cycle a no-op.
pub async fn discover(state: &PlatformState) -> Result<DiscoveryReport, CoreError> {
    let status = state.client.family_status().await?;
    let beds = match Bed::list_from(&status) {
        Ok(beds) => beds,
        Err(e) => {
            warn!(error = %e, "discovery skipped: bed list malformed");
            return Ok(DiscoveryReport::default());
        }
    };
    Ok(reconcile(state, beds).await)
}

/// Probe foundations, then reconcile the registry against an already
/// validated bed list.
pub async fn reconcile(state: &PlatformState, mut beds: Vec<Bed>) -> DiscoveryReport {
    if beds.is_empty() {
        warn!("discovery skipped: account lists no beds");
        return DiscoveryReport::default();
    }

    for bed in &mut beds {
        let probe = probe_foundation(&state.client, &bed.bed_id).await;
        bed.has_foundation = state.record_foundation(&bed.bed_id, probe);
    }

    sync_registry(state, &beds)
}

/// Probe again every bed whose capability came from a failed probe.
/// Returns true when any bed's capability changed.
pub async fn reprobe_pending(state: &PlatformState, beds: &mut [Bed]) -> bool {
    let mut changed = false;
    for bed in beds.iter_mut().filter(|b| state.foundation_pending(&b.bed_id)) {
        let probe = probe_foundation(&state.client, &bed.bed_id).await;
        let has = state.record_foundation(&bed.bed_id, probe);
        if has != bed.has_foundation {
            info!(bed = %bed.bed_id, has_foundation = has, "foundation capability changed");
            bed.has_foundation = has;
            changed = true;
        }
    }
    changed
}

/// Register facets the beds imply but the registry lacks, and mark
/// registry entries nothing derives anymore as stale. Capabilities are
/// taken from `beds` as given.
pub fn sync_registry(state: &PlatformState, beds: &[Bed]) -> DiscoveryReport {
    let ctx = state.accessory_context();
    let mut report = DiscoveryReport {
        beds: beds.len(),
        ..DiscoveryReport::default()
    };
    let mut derived: HashSet<FacetKey> = HashSet::new();

    for (index, bed) in beds.iter().enumerate() {
        for descriptor in derive_facets(bed) {
            derived.insert(descriptor.key.clone());
            if state.registry.contains(&descriptor.key) {
                state.registry.unmark_stale(&descriptor.key);
                continue;
            }

            let handle = AccessoryHandle {
                uuid: descriptor.key.uuid(),
                display_name: descriptor.display_name(index),
            };
            let key = descriptor.key.clone();
            match Accessory::build(descriptor, handle, &ctx) {
                Ok(accessory) => {
                    info!(key = %key, name = %accessory.display_name(), "found new accessory");
                    state.host.register(&accessory.to_cached());
                    state.registry.insert(accessory);
                    report.added.push(key);
                }
                Err(e) => warn!(key = %key, error = %e, "could not build accessory"),
            }
        }
    }

    for key in state.registry.keys() {
        if !derived.contains(&key) && state.registry.mark_stale(&key) {
            info!(key = %key, "accessory no longer reported, marked stale");
            report.stale.push(key);
        }
    }

    report.added.sort();
    report.stale.sort();
    debug!(
        beds = report.beds,
        added = report.added.len(),
        stale = report.stale.len(),
        "discovery finished"
    );
    report
}

/// Unregister stale accessories and rejected cache entries. Returns how
/// many host accessories were removed.
pub fn maintain(state: &PlatformState) -> usize {
    let mut removed = 0;

    for handle in state.registry.take_pending_removals() {
        info!(name = %handle.display_name, "removing rejected cached accessory");
        state.host.unregister(&handle);
        removed += 1;
    }

    for accessory in state.registry.take_stale() {
        info!(name = %accessory.display_name(), "removing stale accessory");
        state.debouncer.cancel(accessory.key());
        state.host.unregister(accessory.handle());
        removed += 1;
    }

    removed
}

/// Rebuild accessories from the host cache before the first discovery.
///
/// Entries without a descriptor, with a legacy `...Side` name, whose UUID
/// does not match their key, or whose name is already taken are flagged
/// for removal and never re-added.
pub fn restore_cached(state: &PlatformState, cached: Vec<CachedAccessory>) -> RestoreReport {
    let ctx = state.accessory_context();
    let mut report = RestoreReport::default();

    for entry in cached {
        debug!(name = %entry.handle.display_name, uuid = %entry.handle.uuid, "restoring cached accessory");

        let rejection = match &entry.descriptor {
            None => Some("no descriptor"),
            Some(_) if entry.handle.display_name.ends_with("Side") => Some("legacy side accessory"),
            Some(d) if d.key.uuid() != entry.handle.uuid => Some("uuid does not match key"),
            Some(_) if state.registry.has_display_name(&entry.handle.display_name) => {
                Some("duplicate display name")
            }
            Some(_) => None,
        };

        let built = match (rejection, entry.descriptor) {
            (None, Some(descriptor)) => {
                Accessory::build(descriptor, entry.handle.clone(), &ctx).map_err(|e| e.to_string())
            }
            (reason, _) => Err(reason.unwrap_or("no descriptor").to_owned()),
        };

        match built {
            Ok(accessory) => {
                state.registry.insert(accessory);
                report.restored += 1;
            }
            Err(reason) => {
                warn!(name = %entry.handle.display_name, %reason, "cached accessory marked for removal");
                state.registry.flag_for_removal(entry.handle);
                report.rejected += 1;
            }
        }
    }

    if report.restored + report.rejected > 0 {
        info!(
            restored = report.restored,
            rejected = report.rejected,
            "accessory cache restored"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SideStatus;

    fn bed(has_foundation: bool) -> Bed {
        let side = SideStatus {
            is_in_bed: false,
            sleep_number: 50,
        };
        Bed {
            bed_id: "B1".into(),
            left: Some(side),
            right: Some(side),
            has_foundation,
        }
    }

    #[test]
    fn plain_bed_has_seven_facets() {
        let facets = derive_facets(&bed(false));
        assert_eq!(facets.len(), 7);
        assert!(facets.iter().all(|f| !f.kind.requires_foundation()));
    }

    #[test]
    fn foundation_adds_eight_per_side_facets() {
        let facets = derive_facets(&bed(true));
        assert_eq!(facets.len(), 15);
        let keys: HashSet<_> = facets.iter().map(|f| f.key.clone()).collect();
        assert_eq!(keys.len(), 15);
        assert!(keys.contains(&FacetKey::new("B1", FacetKind::FootWarmer, Some(Side::Right))));
    }

    #[test]
    fn missing_side_drops_its_facets() {
        let mut bed = bed(true);
        bed.right = None;
        let facets = derive_facets(&bed);
        // left occupancy + number, privacy, two aggregates, four foundation facets
        assert_eq!(facets.len(), 9);
        assert!(facets.iter().all(|f| f.side != Some(Side::Right)));
    }
}
