// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The device manager.
//!
//! [`DeviceManager`] is the single owner of every piece of interface state:
//! the chip lifecycle, the live chips, the interface registry, the RTT
//! controller and the static capability cache. It is mutated through
//! `&mut self` only, so callers serialize access (see
//! [`DeviceManagerService`](crate::DeviceManagerService)).
//!
//! Listener notifications raised during an operation are queued and
//! delivered when the operation returns, or handed to the service when
//! dispatch is deferred.

use crate::arbitration::{Arbiter, ChipView, IfaceRequest, LiveIface, Proposal};
use crate::cache::{self, CachedChip, CapabilityCache};
use crate::chip::Chip;
use crate::config::ManagerConfig;
use crate::dispatch::{self, Outbox, PendingCall};
use crate::error::CreateError;
use crate::lifecycle::ChipLifecycle;
use crate::registry::{InterfaceHandle, InterfaceRegistry};
use crate::rtt::RttLifecycle;
use ifmux_core::capability::ChipCapabilities;
use ifmux_core::combination::ModeId;
use ifmux_core::event::EventBus;
use ifmux_core::exec::ExecutionContext;
use ifmux_core::hal::{
    ChipId, DeathRecipient, HalError, HalEvent, HalEventSink, RttControllerId, ServiceDiscovery,
    WifiHal,
};
use ifmux_core::iface::{HalIfaceKind, IfaceCounts, IfaceType};
use ifmux_core::listener::{
    BridgedApDowngradeHandler, InterfaceDestroyedListener, ListenerProxy, ManagerStatusListener,
    RttControllerLifecycleListener,
};
use ifmux_core::requestor::{PriorityClass, PriorityResolver, Requestor};
use ifmux_core::static_info::StaticChipInfoStore;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

/// Hook invoked after a HAL event has been queued, from the reporting thread.
pub type EventWaker = Arc<dyn Fn() + Send + Sync>;

/// One interface a request would destroy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpactEntry {
    /// Type of the interface.
    pub iface_type: IfaceType,
    /// Its current owner.
    pub requestor: Requestor,
}

/// Parameters of an interface creation.
#[derive(Clone)]
pub struct CreateRequest {
    /// Requested type.
    pub iface_type: IfaceType,
    /// Capability bits the hosting chip must advertise.
    pub required_capabilities: ChipCapabilities,
    /// Requesting identity.
    pub requestor: Requestor,
    /// Notified when the interface is torn down.
    pub destroyed_listener: Option<Arc<dyn InterfaceDestroyedListener>>,
    /// Context the destroy listener runs on. Only internal requestors may
    /// leave it unset.
    pub context: Option<ExecutionContext>,
    /// Picks the instance to shed if the interface, a bridged AP, is later
    /// downgraded. Called synchronously by the manager.
    pub downgrade_handler: Option<Arc<dyn BridgedApDowngradeHandler>>,
}

impl CreateRequest {
    /// A request without listener or capability requirements.
    pub fn new(iface_type: IfaceType, requestor: Requestor) -> Self {
        Self {
            iface_type,
            required_capabilities: ChipCapabilities::NONE,
            requestor,
            destroyed_listener: None,
            context: None,
            downgrade_handler: None,
        }
    }

    /// Restricts candidate chips to those advertising `required`.
    pub fn with_capabilities(mut self, required: ChipCapabilities) -> Self {
        self.required_capabilities = required;
        self
    }

    /// Registers a destroy listener running on `context`.
    pub fn on_destroyed(
        mut self,
        listener: Arc<dyn InterfaceDestroyedListener>,
        context: ExecutionContext,
    ) -> Self {
        self.destroyed_listener = Some(listener);
        self.context = Some(context);
        self
    }

    /// Sets the caller's execution context without a destroy listener.
    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets the bridged AP downgrade handler.
    pub fn with_downgrade_handler(mut self, handler: Arc<dyn BridgedApDowngradeHandler>) -> Self {
        self.downgrade_handler = Some(handler);
        self
    }
}

enum RefreshError {
    Hal(HalError),
    Mismatch(String),
}

impl From<HalError> for RefreshError {
    fn from(e: HalError) -> Self {
        RefreshError::Hal(e)
    }
}

/// Arbitrates interface requests on the chips of one HAL service.
pub struct DeviceManager {
    config: ManagerConfig,
    resolver: Arc<dyn PriorityResolver>,
    lifecycle: ChipLifecycle,
    chips: Vec<Chip>,
    registry: InterfaceRegistry,
    arbiter: Arbiter,
    rtt: RttLifecycle,
    cache: CapabilityCache,
    inbox: EventBus<HalEvent>,
    waker: Arc<RwLock<Option<EventWaker>>>,
    outbox: Outbox,
    deferred: bool,
}

impl DeviceManager {
    /// Creates a manager. Nothing talks to the HAL until
    /// [`initialize`](Self::initialize).
    pub fn new(
        config: ManagerConfig,
        discovery: Arc<dyn ServiceDiscovery>,
        resolver: Arc<dyn PriorityResolver>,
    ) -> Self {
        let arbiter = Arbiter::new(config.policy(), config.bridged_ap_downgrade);
        Self {
            lifecycle: ChipLifecycle::new(discovery, config.start_retry_budget),
            config,
            resolver,
            chips: Vec::new(),
            registry: InterfaceRegistry::new(),
            arbiter,
            rtt: RttLifecycle::new(),
            cache: CapabilityCache::empty(),
            inbox: EventBus::new(),
            waker: Arc::new(RwLock::new(None)),
            outbox: Outbox::default(),
            deferred: false,
        }
    }

    /// Loads the static chip records from `store` and writes live data back
    /// to it once the chip starts.
    pub fn with_static_store(mut self, store: Arc<dyn StaticChipInfoStore>) -> Self {
        self.cache = CapabilityCache::load(store, self.config.persist_static_chip_info);
        self
    }

    /// The configuration in force.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Sets the hook called whenever a HAL event is queued.
    pub fn set_event_waker(&mut self, waker: EventWaker) {
        match self.waker.write() {
            Ok(mut slot) => *slot = Some(waker),
            Err(poisoned) => *poisoned.into_inner() = Some(waker),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Subscribes to service registrations and binds the service if present.
    pub fn initialize(&mut self) -> bool {
        log::info!("DeviceManager: Initializing");
        let registered = self.lifecycle.register_for_notifications(self.event_sink());
        self.bind();
        self.finish();
        registered
    }

    /// Whether the HAL service is bound.
    pub fn is_ready(&self) -> bool {
        self.lifecycle.is_ready()
    }

    /// Whether the chip is powered on.
    pub fn is_started(&self) -> bool {
        self.lifecycle.is_started()
    }

    /// Powers the chip on.
    pub fn start(&mut self) -> bool {
        self.lifecycle.set_start_requested(true);
        let started = self.start_internal();
        self.finish();
        started
    }

    /// Powers the chip off and forgets every interface.
    pub fn stop(&mut self) {
        log::info!("DeviceManager: Stopping");
        self.lifecycle.set_start_requested(false);
        self.lifecycle.power_off();
        self.teardown_state();
        self.lifecycle.publish_status(&mut self.outbox);
        self.finish();
    }

    /// Registers a status listener. Duplicates are ignored.
    pub fn register_status_listener(
        &mut self,
        listener: Arc<dyn ManagerStatusListener>,
        context: ExecutionContext,
    ) -> bool {
        self.lifecycle.add_listener(listener, context)
    }

    /// Unregisters a status listener.
    pub fn unregister_status_listener(
        &mut self,
        listener: &Arc<dyn ManagerStatusListener>,
    ) -> bool {
        self.lifecycle.remove_listener(listener)
    }

    /// Handles every queued HAL event.
    pub fn process_pending_events(&mut self) {
        for event in self.inbox.drain() {
            match event {
                HalEvent::Registered => self.on_registered(),
                HalEvent::Died { generation } => self.on_death(generation),
            }
        }
        self.finish();
    }

    fn event_sink(&self) -> HalEventSink {
        let sender = self.inbox.sender();
        let waker = Arc::clone(&self.waker);
        Arc::new(move |event| {
            if sender.send(event).is_err() {
                log::warn!("DeviceManager: Dropping {:?}, manager is gone", event);
                return;
            }
            let hook = match waker.read() {
                Ok(slot) => slot.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };
            if let Some(hook) = hook {
                hook();
            }
        })
    }

    fn bind(&mut self) -> bool {
        let sink = self.event_sink();
        let bound = self.lifecycle.bind(move |generation| -> DeathRecipient {
            Arc::new(move || sink(HalEvent::Died { generation }))
        });
        self.lifecycle.publish_status(&mut self.outbox);
        bound
    }

    fn start_internal(&mut self) -> bool {
        if self.lifecycle.is_started() {
            return true;
        }
        if !self.lifecycle.power_on() {
            self.lifecycle.publish_status(&mut self.outbox);
            return false;
        }

        match self.lifecycle.query_chips() {
            Ok(chips) => {
                log::info!("DeviceManager: {} chip(s) online", chips.len());
                self.chips = chips;
                self.cache.refresh(&self.chips);
            }
            Err(e) => {
                log::error!("DeviceManager: Chip query failed after start: {}", e);
                self.chips.clear();
            }
        }

        self.lifecycle.publish_status(&mut self.outbox);
        self.reconcile_rtt();
        true
    }

    fn on_registered(&mut self) {
        if self.lifecycle.hal().is_some() {
            log::debug!("DeviceManager: Service registration while bound, ignoring");
            return;
        }
        log::info!("DeviceManager: HAL service registered");
        if self.bind() && self.lifecycle.start_requested() {
            self.start_internal();
        }
    }

    fn on_death(&mut self, generation: u64) {
        if self.lifecycle.on_death(generation) {
            self.teardown_state();
            self.lifecycle.publish_status(&mut self.outbox);
        }
    }

    /// Forgets all interfaces, notifying their destroy listeners.
    fn teardown_state(&mut self) {
        for record in self.registry.drain() {
            record.notify_destroyed(&mut self.outbox);
        }
        self.chips.clear();
        self.rtt.destroy(&mut self.outbox);
    }

    /// The registry and the HAL disagree, or the chip could not be configured.
    fn fatal_teardown(&mut self, reason: &str) {
        log::error!("DeviceManager: Fatal: {}. Forcing stop", reason);
        self.lifecycle.set_start_requested(false);
        self.lifecycle.power_off();
        self.teardown_state();
        self.lifecycle.publish_status(&mut self.outbox);
    }

    // ── Capability queries ───────────────────────────────────────────────

    fn capability_chips(&self) -> Vec<CachedChip> {
        if self.lifecycle.is_started() && !self.chips.is_empty() {
            self.chips.iter().map(CachedChip::from).collect()
        } else {
            self.cache.chips().to_vec()
        }
    }

    /// Types any mode can host, on every chip or on `chip` only.
    pub fn supported_types(&self, chip: Option<ChipId>) -> BTreeSet<IfaceType> {
        cache::supported_types(&self.capability_chips(), chip)
    }

    /// Whether some mode of some chip can hold `counts`, regardless of what
    /// is currently running.
    pub fn can_support(&self, counts: &IfaceCounts) -> bool {
        cache::can_support(&self.capability_chips(), counts)
    }

    /// Whether a station and an access point can run together.
    pub fn is_sta_ap_concurrency_supported(&self) -> bool {
        self.can_support(&IfaceCounts::from_pairs([(IfaceType::Sta, 1), (IfaceType::Ap, 1)]))
    }

    /// Whether a bridged access point can run.
    pub fn is_bridged_ap_supported(&self) -> bool {
        self.can_support(&IfaceCounts::from_pairs([(IfaceType::ApBridged, 1)]))
    }

    /// Whether a station and a bridged access point can run together.
    pub fn is_sta_bridged_ap_supported(&self) -> bool {
        self.can_support(&IfaceCounts::from_pairs([
            (IfaceType::Sta, 1),
            (IfaceType::ApBridged, 1),
        ]))
    }

    // ── Arbitration ──────────────────────────────────────────────────────

    /// Interfaces that creating `iface_type` for `requestor` would destroy.
    ///
    /// `None` means the request cannot be satisfied; an empty list means it
    /// can be satisfied without destroying anything.
    pub fn report_impact(
        &mut self,
        iface_type: IfaceType,
        required: ChipCapabilities,
        requestor: &Requestor,
    ) -> Option<Vec<ImpactEntry>> {
        if !self.lifecycle.is_started() {
            return None;
        }
        if self.registry.find_owned(iface_type, requestor).is_some() {
            return Some(Vec::new());
        }

        let views = match self.refresh(iface_type) {
            Ok(views) => views,
            Err(RefreshError::Hal(e)) => {
                log::warn!("DeviceManager: Impact query aborted: {}", e);
                return None;
            }
            Err(RefreshError::Mismatch(reason)) => {
                log::error!("DeviceManager: Impact query aborted: {}", reason);
                return None;
            }
        };

        let request = self.request(iface_type, required, requestor.clone());
        let proposal = self.arbiter.solve(&views, &request)?;
        Some(
            proposal
                .removals
                .into_iter()
                .map(|iface| ImpactEntry {
                    iface_type: iface.effective_type,
                    requestor: iface.requestor,
                })
                .collect(),
        )
    }

    /// Whether a request for `iface_type` could be satisfied now.
    pub fn can_create_interface(
        &mut self,
        iface_type: IfaceType,
        required: ChipCapabilities,
        requestor: &Requestor,
    ) -> bool {
        self.report_impact(iface_type, required, requestor).is_some()
    }

    /// Creates an interface, tearing down or shrinking others as needed.
    ///
    /// A request without an execution context is refused unless it comes
    /// from an internal requestor and carries no destroy listener. A
    /// requestor already holding an interface of the type gets that
    /// interface back, untouched.
    pub fn create_interface(
        &mut self,
        request: CreateRequest,
    ) -> Result<InterfaceHandle, CreateError> {
        if request.context.is_none() && !self.allows_contextless(&request) {
            log::warn!(
                "DeviceManager: Rejecting {} for {}: no execution context",
                request.iface_type,
                request.requestor
            );
            return Err(CreateError::MissingExecutionContext);
        }

        let result = self.create_internal(request);
        self.reconcile_rtt();
        self.finish();
        result
    }

    fn allows_contextless(&self, request: &CreateRequest) -> bool {
        request.destroyed_listener.is_none()
            && self.resolver.priority_class(&request.requestor) == PriorityClass::Internal
    }

    fn create_internal(
        &mut self,
        request: CreateRequest,
    ) -> Result<InterfaceHandle, CreateError> {
        // ── 1. Preconditions ─────────────────────────────────────────────
        if !self.lifecycle.is_started() {
            return Err(CreateError::NotStarted);
        }
        let Some(hal) = self.lifecycle.hal().cloned() else {
            return Err(CreateError::NotStarted);
        };
        // Same answer as `report_impact`: already satisfied, nothing changes.
        if let Some(held) = self
            .registry
            .find_owned(request.iface_type, &request.requestor)
        {
            log::info!(
                "DeviceManager: {} already holds {}, returning it",
                request.requestor,
                held.handle
            );
            return Ok(held.handle.clone());
        }

        // ── 2. Refresh and validate ──────────────────────────────────────
        let views = match self.refresh(request.iface_type) {
            Ok(views) => views,
            Err(RefreshError::Hal(e)) => return Err(CreateError::Hal(e)),
            Err(RefreshError::Mismatch(reason)) => {
                self.fatal_teardown(&reason);
                return Err(CreateError::Inconsistent(reason));
            }
        };

        // ── 3. Solve ─────────────────────────────────────────────────────
        let solver_request = self.request(
            request.iface_type,
            request.required_capabilities,
            request.requestor.clone(),
        );
        let Some(proposal) = self.arbiter.solve(&views, &solver_request) else {
            return Err(CreateError::Infeasible {
                iface_type: request.iface_type,
                requestor: request.requestor,
            });
        };

        // ── 4. Make room ─────────────────────────────────────────────────
        self.execute_downgrades(hal.as_ref(), &proposal)?;
        if proposal.mode_change {
            self.switch_mode(hal.as_ref(), proposal.chip, proposal.mode)?;
        } else {
            for victim in &proposal.removals {
                self.remove_best_effort(hal.as_ref(), proposal.chip, &victim.name);
            }
        }

        // ── 5. Create and register ───────────────────────────────────────
        let ops = self
            .chips
            .iter()
            .find(|c| c.id() == proposal.chip)
            .map(|c| c.ops)
            .ok_or_else(|| HalError::UnknownObject(proposal.chip.to_string()))?;
        let name = ops.create_iface(hal.as_ref(), request.iface_type)?;

        let handle = InterfaceHandle {
            chip: proposal.chip,
            name,
            iface_type: request.iface_type,
        };
        let destroyed_listener = request
            .destroyed_listener
            .zip(request.context)
            .map(|(listener, context)| ListenerProxy::new(listener, context));
        if let Err(e) = self.registry.insert(
            handle.clone(),
            request.requestor,
            destroyed_listener,
            request.downgrade_handler,
        ) {
            log::error!("DeviceManager: {}. Removing the untracked {}", e, handle);
            if let Err(undo) =
                hal.remove_iface(handle.chip, request.iface_type.hal_kind(), &handle.name)
            {
                log::warn!("DeviceManager: Could not remove {}: {}", handle, undo);
            }
            return Err(e.into());
        }

        log::info!(
            "DeviceManager: Created {} (removed {}, downgraded {}, mode_change={})",
            handle,
            proposal.removals.len(),
            proposal.downgrades.len(),
            proposal.mode_change
        );
        Ok(handle)
    }

    fn request(
        &self,
        iface_type: IfaceType,
        required: ChipCapabilities,
        requestor: Requestor,
    ) -> IfaceRequest {
        let class = self.resolver.priority_class(&requestor);
        IfaceRequest {
            iface_type,
            required,
            rank: self.arbiter.policy().rank(class),
            requestor,
        }
    }

    /// Re-reads modes and interfaces from the HAL and checks them against the
    /// registry.
    fn refresh(&mut self, iface_type: IfaceType) -> Result<Vec<ChipView>, RefreshError> {
        let hal = self
            .lifecycle
            .hal()
            .cloned()
            .ok_or(RefreshError::Hal(HalError::Disconnected))?;
        let policy = *self.arbiter.policy();
        let mut views = Vec::with_capacity(self.chips.len());

        for chip in &mut self.chips {
            let id = chip.id();
            chip.current_mode = hal.current_mode(id)?;

            let mut ifaces = Vec::new();
            for kind in HalIfaceKind::ALL {
                let mut reported = hal.iface_names(id, kind)?;
                reported.sort();
                let tracked: Vec<_> = self
                    .registry
                    .on_chip(id)
                    .filter(|r| r.handle.iface_type.hal_kind() == kind)
                    .collect();
                let tracked_names: Vec<&str> =
                    tracked.iter().map(|r| r.handle.name.as_str()).collect();
                if reported != tracked_names {
                    return Err(RefreshError::Mismatch(format!(
                        "{} {:?} interfaces: HAL reports {:?}, registry tracks {:?}",
                        id, kind, reported, tracked_names
                    )));
                }

                for record in tracked {
                    let declared = record.handle.iface_type;
                    let instances = if declared == IfaceType::ApBridged
                        && chip.ops.supports_bridged_ap()
                    {
                        hal.bridged_ap_instances(id, &record.handle.name)?.len()
                    } else {
                        1
                    };
                    let effective_type = if declared == IfaceType::ApBridged && instances < 2 {
                        IfaceType::Ap
                    } else {
                        declared
                    };
                    let class = self.resolver.priority_class(&record.requestor);
                    ifaces.push(LiveIface {
                        name: record.handle.name.clone(),
                        effective_type,
                        requestor: record.requestor.clone(),
                        rank: policy.rank(class),
                        seq: record.seq,
                        instances,
                    });
                }
            }

            views.push(ChipView {
                chip: id,
                capabilities: chip.capabilities_for(iface_type),
                model: chip.model.clone(),
                current_mode: chip.current_mode,
                can_downgrade: chip.ops.supports_bridged_ap(),
                ifaces,
            });
        }

        Ok(views)
    }

    fn execute_downgrades(
        &mut self,
        hal: &dyn WifiHal,
        proposal: &Proposal,
    ) -> Result<(), CreateError> {
        for ap in &proposal.downgrades {
            let fail = |source: HalError| CreateError::Downgrade {
                iface: ap.name.clone(),
                source,
            };

            let instances = hal.bridged_ap_instances(proposal.chip, &ap.name).map_err(fail)?;
            let handler = self
                .registry
                .get(proposal.chip, &ap.name)
                .and_then(|r| r.downgrade_handler.clone());
            let chosen = handler
                .and_then(|h| h.select_instance_for_removal(&ap.name, &instances))
                .filter(|i| instances.contains(i))
                .or_else(|| instances.last().cloned())
                .ok_or_else(|| fail(HalError::Failure("no instance to remove".into())))?;

            hal.remove_bridged_ap_instance(proposal.chip, &ap.name, &chosen)
                .map_err(fail)?;
            log::info!(
                "DeviceManager: Downgraded bridged AP {} by removing instance {}",
                ap.name,
                chosen
            );
        }
        Ok(())
    }

    fn switch_mode(
        &mut self,
        hal: &dyn WifiHal,
        chip: ChipId,
        mode: ModeId,
    ) -> Result<(), CreateError> {
        let names: Vec<String> = self
            .registry
            .on_chip(chip)
            .map(|r| r.handle.name.clone())
            .collect();
        for name in names {
            self.remove_best_effort(hal, chip, &name);
        }

        if let Err(source) = hal.configure_chip(chip, mode) {
            let reason = format!("configuring {} into {} failed: {}", chip, mode, source);
            self.fatal_teardown(&reason);
            return Err(CreateError::ModeConfiguration { chip, mode, source });
        }

        // Reconfiguration destroys whatever survived the removals.
        let leftovers: Vec<String> = self
            .registry
            .on_chip(chip)
            .map(|r| r.handle.name.clone())
            .collect();
        for name in leftovers {
            if let Some(record) = self.registry.remove(chip, &name) {
                record.notify_destroyed(&mut self.outbox);
            }
        }

        if let Some(state) = self.chips.iter_mut().find(|c| c.id() == chip) {
            state.current_mode = Some(mode);
        }
        log::info!("DeviceManager: {} configured into {}", chip, mode);
        Ok(())
    }

    /// Removes an interface through the HAL.
    ///
    /// On failure the HAL is asked again: the record is dropped only if the
    /// interface is no longer listed. Returns `true` if the record was dropped.
    fn remove_best_effort(&mut self, hal: &dyn WifiHal, chip: ChipId, name: &str) -> bool {
        let Some(record) = self.registry.get(chip, name) else {
            return false;
        };
        let kind = record.handle.iface_type.hal_kind();

        if let Err(e) = hal.remove_iface(chip, kind, name) {
            log::warn!("DeviceManager: Removing {} on {} failed: {}", name, chip, e);
            match hal.iface_names(chip, kind) {
                Ok(listed) if !listed.iter().any(|n| n == name) => {
                    log::info!("DeviceManager: {} is gone regardless", name);
                }
                Ok(_) => {
                    log::warn!("DeviceManager: {} is still listed, keeping it", name);
                    return false;
                }
                Err(e) => {
                    log::warn!("DeviceManager: Cannot confirm removal of {}: {}", name, e);
                    return false;
                }
            }
        }

        if let Some(record) = self.registry.remove(chip, name) {
            record.notify_destroyed(&mut self.outbox);
        }
        true
    }

    /// Removes an interface on behalf of its owner.
    pub fn remove_interface(&mut self, handle: &InterfaceHandle) -> bool {
        let known = self.registry.resolve(handle).is_some();
        let removed = match self.lifecycle.hal().cloned() {
            Some(hal) if known => self.remove_best_effort(hal.as_ref(), handle.chip, &handle.name),
            _ => {
                log::warn!("DeviceManager: Cannot remove unknown interface {}", handle);
                false
            }
        };
        self.reconcile_rtt();
        self.finish();
        removed
    }

    /// Hands an interface over to another requestor without touching the HAL.
    pub fn replace_requestor(&mut self, handle: &InterfaceHandle, requestor: Requestor) -> bool {
        match self.registry.set_requestor(handle, requestor.clone()) {
            Ok(previous) => {
                log::info!(
                    "DeviceManager: {} handed over from {} to {}",
                    handle,
                    previous,
                    requestor
                );
                true
            }
            Err(e) => {
                log::warn!("DeviceManager: {}", e);
                false
            }
        }
    }

    /// Handles of every live interface.
    pub fn interfaces(&self) -> Vec<InterfaceHandle> {
        self.registry.iter().map(|r| r.handle.clone()).collect()
    }

    /// Current owner of a live interface.
    pub fn interface_owner(&self, handle: &InterfaceHandle) -> Option<Requestor> {
        self.registry.resolve(handle).map(|r| r.requestor.clone())
    }

    // ── RTT ──────────────────────────────────────────────────────────────

    /// Registers an RTT controller observer. Duplicates are ignored.
    pub fn register_rtt_observer(
        &mut self,
        listener: Arc<dyn RttControllerLifecycleListener>,
        context: ExecutionContext,
    ) {
        if self.rtt.add_observer(listener, context, &mut self.outbox) {
            self.reconcile_rtt();
        }
        self.finish();
    }

    /// Unregisters an RTT controller observer.
    pub fn unregister_rtt_observer(
        &mut self,
        listener: &Arc<dyn RttControllerLifecycleListener>,
    ) -> bool {
        self.rtt.remove_observer(listener)
    }

    /// The live RTT controller, if any.
    pub fn rtt_controller(&self) -> Option<RttControllerId> {
        self.rtt.controller()
    }

    fn reconcile_rtt(&mut self) {
        self.rtt.reconcile(
            self.lifecycle.hal(),
            &self.chips,
            &self.registry,
            &mut self.outbox,
        );
    }

    // ── Dispatch ─────────────────────────────────────────────────────────

    /// Keeps notifications queued after each operation instead of delivering
    /// them.
    pub(crate) fn set_deferred_dispatch(&mut self, deferred: bool) {
        self.deferred = deferred;
    }

    /// Takes the notifications queued so far.
    pub(crate) fn take_pending(&mut self) -> Vec<PendingCall> {
        self.outbox.take()
    }

    fn finish(&mut self) {
        if !self.deferred {
            dispatch::deliver(self.outbox.take());
        }
    }
}
