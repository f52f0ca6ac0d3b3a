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

//! Shared fixtures for the device manager integration tests.

#![allow(dead_code)]

use ifmux_control::{CreateError, CreateRequest, DeviceManager, InterfaceHandle, ManagerConfig};
use ifmux_core::combination::{ChipMode, Combination, ComboLimit};
use ifmux_core::exec::Looper;
use ifmux_core::hal::{HalRevision, RttControllerId};
use ifmux_core::iface::IfaceType;
use ifmux_core::listener::{
    BridgedApDowngradeHandler, InterfaceDestroyedListener, ManagerStatusListener,
    RttControllerLifecycleListener,
};
use ifmux_core::requestor::{PriorityClass, Requestor};
use ifmux_core::static_info::StaticChipInfoStore;
use ifmux_infra::{SimulatedChip, SimulatedDiscovery, SimulatedHal, StaticPriorityTable};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use IfaceType::*;

// ─────────────────────────────────────────────────────────────────────────────
// Requestors
// ─────────────────────────────────────────────────────────────────────────────

pub fn privileged() -> Requestor {
    Requestor::new(1000, "settings")
}

pub fn system() -> Requestor {
    Requestor::new(1010, "wifi_service")
}

/// The framework's own client; its requests may come without a context.
pub fn internal() -> Requestor {
    Requestor::new(1020, "wifi_stack")
}

pub fn foreground(n: u32) -> Requestor {
    Requestor::new(10_000 + n, &format!("fg_app_{n}"))
}

pub fn background(n: u32) -> Requestor {
    Requestor::new(20_000 + n, &format!("bg_app_{n}"))
}

pub fn priority_table() -> StaticPriorityTable {
    let table = StaticPriorityTable::new(PriorityClass::Foreground)
        .with(privileged(), PriorityClass::Privileged)
        .with(system(), PriorityClass::System)
        .with(internal(), PriorityClass::Internal);
    for n in 0..8 {
        table.set_class(foreground(n), PriorityClass::Foreground);
        table.set_class(background(n), PriorityClass::Background);
    }
    table
}

// ─────────────────────────────────────────────────────────────────────────────
// Chips
// ─────────────────────────────────────────────────────────────────────────────

pub const MODE_A: u32 = 0;
pub const MODE_B: u32 = 1;

/// Mode A = {1 STA + 1 of P2P/NAN}, mode B = {1 AP}.
pub fn two_mode_chip(revision: HalRevision) -> SimulatedChip {
    SimulatedChip::new(0, revision)
        .with_mode(ChipMode::new(
            MODE_A,
            vec![Combination::new(vec![
                ComboLimit::new(1, vec![Sta]),
                ComboLimit::new(1, vec![P2p, Nan]),
            ])],
        ))
        .with_mode(ChipMode::new(
            MODE_B,
            vec![Combination::new(vec![ComboLimit::new(1, vec![Ap])])],
        ))
}

/// A single mode with room for one station.
pub fn single_sta_chip(id: u32) -> SimulatedChip {
    SimulatedChip::new(id, HalRevision::V1_6).with_mode(ChipMode::new(
        MODE_A,
        vec![Combination::new(vec![ComboLimit::new(1, vec![Sta])])],
    ))
}

/// A single mode with room for two stations and one P2P.
pub fn dual_sta_chip() -> SimulatedChip {
    SimulatedChip::new(0, HalRevision::V1_6).with_mode(ChipMode::new(
        MODE_A,
        vec![Combination::new(vec![
            ComboLimit::new(2, vec![Sta]),
            ComboLimit::new(1, vec![P2p]),
        ])],
    ))
}

/// A single mode holding either one bridged AP or two plain APs.
pub fn bridged_ap_chip(revision: HalRevision) -> SimulatedChip {
    SimulatedChip::new(0, revision).with_mode(ChipMode::new(
        MODE_A,
        vec![
            Combination::new(vec![ComboLimit::new(1, vec![ApBridged])]),
            Combination::new(vec![ComboLimit::new(2, vec![Ap])]),
        ],
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Recording listeners
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct DestroyRecorder {
    names: Mutex<Vec<String>>,
}

impl DestroyRecorder {
    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

impl InterfaceDestroyedListener for DestroyRecorder {
    fn on_destroyed(&self, iface_name: &str) {
        self.names.lock().unwrap().push(iface_name.to_string());
    }
}

#[derive(Default)]
pub struct StatusRecorder {
    count: AtomicUsize,
}

impl StatusRecorder {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl ManagerStatusListener for StatusRecorder {
    fn on_status_changed(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RttEvent {
    New(RttControllerId),
    Destroyed,
}

#[derive(Default)]
pub struct RttRecorder {
    events: Mutex<Vec<RttEvent>>,
}

impl RttRecorder {
    pub fn events(&self) -> Vec<RttEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl RttControllerLifecycleListener for RttRecorder {
    fn on_new_rtt_controller(&self, controller: RttControllerId) {
        self.events.lock().unwrap().push(RttEvent::New(controller));
    }

    fn on_rtt_controller_destroyed(&self) {
        self.events.lock().unwrap().push(RttEvent::Destroyed);
    }
}

/// Always gives up the first instance and remembers what it was offered.
#[derive(Default)]
pub struct FirstInstancePicker {
    offered: Mutex<Vec<Vec<String>>>,
}

impl FirstInstancePicker {
    pub fn offered(&self) -> Vec<Vec<String>> {
        self.offered.lock().unwrap().clone()
    }
}

impl BridgedApDowngradeHandler for FirstInstancePicker {
    fn select_instance_for_removal(&self, _iface_name: &str, instances: &[String]) -> Option<String> {
        self.offered.lock().unwrap().push(instances.to_vec());
        instances.first().cloned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

/// A bare manager over a simulated HAL, for tests that own it elsewhere.
pub fn simulated_manager(chips: Vec<SimulatedChip>) -> (Arc<SimulatedDiscovery>, DeviceManager) {
    let _ = env_logger::builder().is_test(true).try_init();

    let hal = Arc::new(SimulatedHal::new(chips));
    let discovery = Arc::new(SimulatedDiscovery::new(hal));
    let manager = DeviceManager::new(
        ManagerConfig::default(),
        discovery.clone(),
        Arc::new(priority_table()),
    );
    (discovery, manager)
}

/// A manager wired to a simulated HAL, with a hand-pumped listener looper.
pub struct Harness {
    pub hal: Arc<SimulatedHal>,
    pub discovery: Arc<SimulatedDiscovery>,
    pub priorities: Arc<StaticPriorityTable>,
    pub manager: DeviceManager,
    pub looper: Looper,
}

impl Harness {
    /// A manager that has not been initialized yet.
    pub fn new(chips: Vec<SimulatedChip>) -> Self {
        Self::with_config(chips, ManagerConfig::default(), None)
    }

    pub fn with_config(
        chips: Vec<SimulatedChip>,
        config: ManagerConfig,
        store: Option<Arc<dyn StaticChipInfoStore>>,
    ) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let hal = Arc::new(SimulatedHal::new(chips));
        let discovery = Arc::new(SimulatedDiscovery::new(Arc::clone(&hal)));
        let priorities = Arc::new(priority_table());
        let mut manager = DeviceManager::new(config, discovery.clone(), priorities.clone());
        if let Some(store) = store {
            manager = manager.with_static_store(store);
        }
        Self {
            hal,
            discovery,
            priorities,
            manager,
            looper: Looper::new("test-listeners"),
        }
    }

    /// An initialized and started manager.
    pub fn started(chips: Vec<SimulatedChip>) -> Self {
        let mut harness = Self::new(chips);
        assert!(harness.manager.initialize());
        assert!(harness.manager.start());
        harness
    }

    pub fn create(&mut self, ty: IfaceType, requestor: Requestor) -> Result<InterfaceHandle, CreateError> {
        let request = CreateRequest::new(ty, requestor).with_context(self.looper.context());
        self.manager.create_interface(request)
    }

    /// Creates an interface whose destruction is reported to `listener`.
    pub fn create_watched(
        &mut self,
        ty: IfaceType,
        requestor: Requestor,
        listener: &Arc<DestroyRecorder>,
    ) -> Result<InterfaceHandle, CreateError> {
        let listener: Arc<dyn InterfaceDestroyedListener> = listener.clone();
        let request = CreateRequest::new(ty, requestor).on_destroyed(listener, self.looper.context());
        self.manager.create_interface(request)
    }

    /// Runs the listener callbacks queued so far.
    pub fn pump(&self) -> usize {
        self.looper.dispatch_pending()
    }

    /// Types of the live interfaces, sorted.
    pub fn live_types(&self) -> Vec<IfaceType> {
        let mut types: Vec<IfaceType> = self
            .manager
            .interfaces()
            .into_iter()
            .map(|h| h.iface_type)
            .collect();
        types.sort();
        types
    }
}
