// ── Bridge abstraction ──
//
// Lifecycle for one SleepIQ account: authenticate, restore the host
// cache, discover facets, then poll on an interval and push fresh state
// into the accessory objects. No tick error escapes the poll task; the
// worst case is a skipped tick.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use sleepiq_api::models::OutletStatusResponse;
use sleepiq_api::{Actuator, Error as ApiError, SleepIqClient};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::accessory::{Accessory, FlexPosition};
use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::host::AccessoryHost;
use crate::model::{Bed, FacetKind, FoundationState, Side, foot_warmer_level};
use crate::reconcile::{self, DiscoveryReport};
use crate::state::{FoundationProbe, PlatformState};

// ── BridgePhase ──────────────────────────────────────────────────────

/// Lifecycle phase, observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BridgePhase {
    Idle,
    Authenticating,
    Discovering,
    Polling,
    /// Terminal: the initial login was rejected.
    Disabled,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Accessory values were refreshed.
    Updated,
    /// The session was renewed; nothing was updated.
    Reauthenticated,
    /// New facets appeared; discovery ran instead of an update.
    Discovered,
    /// Transient or malformed upstream data; nothing changed.
    Skipped,
    Disabled,
}

// ── Bridge ───────────────────────────────────────────────────────────

/// The polling bridge. Cheaply cloneable via `Arc<BridgeInner>`.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    state: PlatformState,
    phase: watch::Sender<BridgePhase>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    last_poll: RwLock<Option<DateTime<Utc>>>,
    /// Serializes ticks between the poll task and manual callers.
    tick_lock: Mutex<()>,
}

impl Bridge {
    /// Create a bridge with an HTTP client built from `config`. Does NOT
    /// connect; call [`start()`](Self::start).
    pub fn new(config: BridgeConfig, host: Arc<dyn AccessoryHost>) -> Result<Self, CoreError> {
        let client = SleepIqClient::new(
            config.base_url.clone(),
            config.username.clone(),
            config.password.clone(),
            &config.transport(),
        )?;
        Ok(Self::with_client(config, client, host))
    }

    /// Create a bridge around an existing session client.
    pub fn with_client(
        config: BridgeConfig,
        client: SleepIqClient,
        host: Arc<dyn AccessoryHost>,
    ) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                state: PlatformState::new(config, client, host),
                phase: watch::Sender::new(BridgePhase::Idle),
                cancel: CancellationToken::new(),
                task: Mutex::new(None),
                last_poll: RwLock::new(None),
                tick_lock: Mutex::new(()),
            }),
        }
    }

    pub fn state(&self) -> &PlatformState {
        &self.inner.state
    }

    pub fn phase(&self) -> BridgePhase {
        *self.inner.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<BridgePhase> {
        self.inner.phase.subscribe()
    }

    /// UTC time of the last tick that updated accessories.
    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_poll.read().expect("last_poll lock poisoned")
    }

    fn set_phase(&self, phase: BridgePhase) {
        let previous = self.inner.phase.send_replace(phase);
        if previous != phase {
            debug!(from = %previous, to = %phase, "bridge phase changed");
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Log in, restore the host cache, discover, and spawn the poll task.
    ///
    /// Rejected credentials disable the bridge: the error is returned
    /// once and nothing is scheduled. Calling `start` on a bridge that is
    /// already running does nothing.
    pub async fn start(&self) -> Result<(), CoreError> {
        match self.phase() {
            BridgePhase::Idle => {}
            BridgePhase::Disabled => return Err(CoreError::Disabled),
            phase => {
                debug!(%phase, "bridge already started");
                return Ok(());
            }
        }
        let state = self.state();

        self.set_phase(BridgePhase::Authenticating);
        if let Err(e) = state.client.login().await {
            warn!(error = %e, "failed to authenticate with SleepIQ, disabling bridge");
            self.set_phase(BridgePhase::Disabled);
            return Err(CoreError::from(e));
        }
        info!(user = %state.client.username(), "authenticated with SleepIQ");

        let cached = state.host.restore();
        reconcile::restore_cached(state, cached);

        self.set_phase(BridgePhase::Discovering);
        match reconcile::discover(state).await {
            Ok(report) => log_discovery(&report),
            Err(e) => warn!(error = %e, "initial discovery failed, will retry on next tick"),
        }
        reconcile::maintain(state);
        self.set_phase(BridgePhase::Polling);

        let interval = state.config.refresh_interval;
        if !interval.is_zero() {
            let bridge = self.clone();
            let cancel = self.inner.cancel.child_token();
            *self.inner.task.lock().await = Some(tokio::spawn(poll_task(bridge, interval, cancel)));
        }
        Ok(())
    }

    /// Stop the poll task and drop pending writes.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.task.lock().await.take() {
            let _ = handle.await;
        }
        self.state().debouncer.cancel_all();
        if self.phase() != BridgePhase::Disabled {
            self.set_phase(BridgePhase::Idle);
        }
        debug!("bridge stopped");
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Run one poll cycle. Never fails; see [`TickOutcome`].
    pub async fn tick(&self) -> TickOutcome {
        let _guard = self.inner.tick_lock.lock().await;
        let state = self.state();

        if self.phase() == BridgePhase::Disabled {
            return TickOutcome::Disabled;
        }

        reconcile::maintain(state);

        if self.phase() == BridgePhase::Authenticating {
            if let Err(e) = state.client.login().await {
                warn!(error = %e, "re-authentication failed, will retry");
                return TickOutcome::Skipped;
            }
            info!("re-authenticated with SleepIQ");
            self.set_phase(BridgePhase::Polling);
        }

        let status = match state.client.family_status().await {
            Ok(status) => status,
            Err(e) if e.is_auth_expired() => return self.reauthenticate(&e).await,
            Err(e) => {
                warn!(error = %e, "failed to fetch family status, skipping tick");
                return TickOutcome::Skipped;
            }
        };

        let mut beds = match Bed::list_from(&status) {
            Ok(beds) if beds.is_empty() => {
                warn!("account lists no beds, skipping tick");
                return TickOutcome::Skipped;
            }
            Ok(beds) => beds,
            Err(e) => {
                warn!(error = %e, "family status malformed, skipping tick");
                return TickOutcome::Skipped;
            }
        };
        reconcile::apply_capability(state, &mut beds);
        let capability_changed = reconcile::reprobe_pending(state, &mut beds).await;

        let missing = reconcile::missing_facets(state, &beds);
        let extra = reconcile::extra_facets(state, &beds);
        if capability_changed || !missing.is_empty() || !extra.is_empty() {
            info!(
                missing = missing.len(),
                extra = extra.len(),
                capability_changed,
                "facet set changed, running discovery"
            );
            self.set_phase(BridgePhase::Discovering);
            let report = reconcile::reconcile(state, beds).await;
            log_discovery(&report);
            self.set_phase(BridgePhase::Polling);
            return TickOutcome::Discovered;
        }

        let mut foundation_lost = false;
        for bed in &mut beds {
            if self.update_bed(bed).await {
                bed.has_foundation = false;
                foundation_lost = true;
            }
        }
        if foundation_lost {
            log_discovery(&reconcile::sync_registry(state, &beds));
        }

        *self.inner.last_poll.write().expect("last_poll lock poisoned") = Some(Utc::now());
        TickOutcome::Updated
    }

    /// Clear the dead key and log in exactly once.
    async fn reauthenticate(&self, cause: &ApiError) -> TickOutcome {
        let state = self.state();
        debug!(error = %cause, "session expired, re-authenticating");
        self.set_phase(BridgePhase::Authenticating);
        state.client.clear_session();

        match state.client.login().await {
            Ok(()) => {
                info!("re-authenticated with SleepIQ");
                self.set_phase(BridgePhase::Polling);
            }
            Err(e) => warn!(error = %e, "re-authentication failed, will retry next tick"),
        }
        TickOutcome::Reauthenticated
    }

    /// Push one bed's fresh state into its accessories. Returns true when
    /// the bed's foundation stopped being reported.
    async fn update_bed(&self, bed: &Bed) -> bool {
        let state = self.state();
        let id = bed.bed_id.as_str();

        match state.client.bed_pause_mode(id).await {
            Ok(resp) => {
                if let Some(privacy) = state
                    .facet(id, FacetKind::Privacy, None)
                    .as_deref()
                    .and_then(Accessory::as_privacy)
                {
                    privacy.update_mode(&resp.pause_mode);
                }
            }
            Err(e) => warn!(bed = %id, error = %e, "failed to fetch pause mode"),
        }

        for (side, status) in bed.sides() {
            debug!(
                bed = %id,
                %side,
                occupied = status.is_in_bed,
                sleep_number = status.sleep_number,
                "side status"
            );
            if let Some(occ) = state
                .facet(id, FacetKind::Occupancy, Some(side))
                .as_deref()
                .and_then(Accessory::as_occupancy)
            {
                occ.update_occupied(status.is_in_bed);
            }
            if let Some(number) = state
                .facet(id, FacetKind::SleepNumber, Some(side))
                .as_deref()
                .and_then(Accessory::as_sleep_number)
            {
                number.update_sleep_number(status.sleep_number);
            }
        }

        if let Some(any) = state
            .facet(id, FacetKind::AnySideOccupancy, None)
            .as_deref()
            .and_then(Accessory::as_occupancy)
        {
            any.update_occupied(bed.any_side_occupied());
        }
        if let Some(both) = state
            .facet(id, FacetKind::BothSidesOccupancy, None)
            .as_deref()
            .and_then(Accessory::as_occupancy)
        {
            both.update_occupied(bed.both_sides_occupied());
        }

        bed.has_foundation && !self.update_foundation(id).await
    }

    /// Refresh flex, outlet and foot-warmer facets. Returns false when the
    /// foundation answered 404.
    async fn update_foundation(&self, id: &str) -> bool {
        let state = self.state();

        match state.client.foundation_status(id).await {
            Ok(raw) => match FoundationState::try_from(&raw) {
                Ok(foundation) => {
                    for side in Side::ALL {
                        if let Some(flex) = state
                            .facet(id, FacetKind::Flex, Some(side))
                            .as_deref()
                            .and_then(Accessory::as_flex)
                        {
                            flex.update_position(FlexPosition {
                                head: foundation.position(side, Actuator::Head),
                                foot: foundation.position(side, Actuator::Foot),
                            });
                        }
                    }
                }
                Err(e) => warn!(bed = %id, error = %e, "foundation status malformed"),
            },
            Err(e) if e.is_not_found() => {
                info!(bed = %id, "foundation no longer reported");
                state.record_foundation(id, FoundationProbe::Absent);
                return false;
            }
            Err(e) => warn!(bed = %id, error = %e, "failed to fetch foundation status"),
        }

        let outlets = join_all((1..=4u8).map(|n| state.client.outlet_status(id, n))).await;
        for (outlet_id, result) in (1..=4u8).zip(outlets) {
            match result {
                Ok(status) => apply_outlet(state, id, outlet_id, &status),
                Err(e) => debug!(bed = %id, outlet_id, error = %e, "outlet status unavailable"),
            }
        }

        match state.client.foot_warming_status(id).await {
            Ok(status) => {
                for side in Side::ALL {
                    if let Some(warmer) = state
                        .facet(id, FacetKind::FootWarmer, Some(side))
                        .as_deref()
                        .and_then(Accessory::as_foot_warmer)
                    {
                        warmer.update_level(foot_warmer_level(status.temp(side.code())));
                    }
                }
            }
            Err(e) => debug!(bed = %id, error = %e, "foot warming status unavailable"),
        }
        true
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// All registered accessories, sorted by key.
    pub fn accessories(&self) -> Vec<Arc<Accessory>> {
        self.state().registry.snapshot()
    }

    /// Run discovery on demand.
    pub async fn discover(&self) -> Result<DiscoveryReport, CoreError> {
        let _guard = self.inner.tick_lock.lock().await;
        reconcile::discover(self.state()).await
    }
}

fn apply_outlet(state: &PlatformState, bed_id: &str, outlet_id: u8, status: &OutletStatusResponse) {
    let (kind, side) = match outlet_id {
        1 => (FacetKind::Outlet, Side::Left),
        2 => (FacetKind::Outlet, Side::Right),
        3 => (FacetKind::LightStrip, Side::Left),
        _ => (FacetKind::LightStrip, Side::Right),
    };
    if let Some(outlet) = state
        .facet(bed_id, kind, Some(side))
        .as_deref()
        .and_then(Accessory::as_outlet)
    {
        outlet.update_on(status.setting != 0);
    }
}

fn log_discovery(report: &DiscoveryReport) {
    if !report.added.is_empty() || !report.stale.is_empty() {
        info!(
            beds = report.beds,
            added = report.added.len(),
            stale = report.stale.len(),
            "discovery complete"
        );
    }
}

// ── Background task ──────────────────────────────────────────────────

/// Periodically tick the bridge until cancelled or disabled.
async fn poll_task(bridge: Bridge, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if bridge.tick().await == TickOutcome::Disabled {
                    break;
                }
            }
        }
    }
}
