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

//! Serialized access to a [`DeviceManager`].
//!
//! The service owns the manager and a dedicated looper thread. Every public
//! call is marshalled onto that thread and blocks until it completes, so
//! all operations are serialized. HAL events wake the same thread.
//!
//! Notifications are delivered after the manager is released: a listener
//! bound to [`context`](DeviceManagerService::context) runs inline on the
//! manager thread and may call back into the service.

use crate::dispatch;
use crate::error::CreateError;
use crate::manager::{CreateRequest, DeviceManager, EventWaker, ImpactEntry};
use crate::registry::InterfaceHandle;
use ifmux_core::capability::ChipCapabilities;
use ifmux_core::exec::{ExecutionContext, Looper, LooperThread};
use ifmux_core::hal::{ChipId, RttControllerId};
use ifmux_core::iface::{IfaceCounts, IfaceType};
use ifmux_core::listener::{ManagerStatusListener, RttControllerLifecycleListener};
use ifmux_core::requestor::Requestor;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// Runs `call` with the manager locked, then delivers its notifications.
fn run_locked<R>(manager: &Mutex<DeviceManager>, call: impl FnOnce(&mut DeviceManager) -> R) -> R {
    let (result, pending) = {
        let mut guard = match manager.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("DeviceManagerService: Manager lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        let result = call(&mut guard);
        (result, guard.take_pending())
    };
    dispatch::deliver(pending);
    result
}

/// A [`DeviceManager`] running on its own thread.
pub struct DeviceManagerService {
    manager: Arc<Mutex<DeviceManager>>,
    looper: LooperThread,
}

impl DeviceManagerService {
    /// Moves `manager` onto a new looper thread.
    pub fn spawn(mut manager: DeviceManager) -> std::io::Result<Self> {
        let looper = Looper::spawn("ifmux-manager")?;
        let context = looper.context();

        manager.set_deferred_dispatch(true);
        let manager = Arc::new(Mutex::new(manager));

        let weak = Arc::downgrade(&manager);
        let waker: EventWaker = Arc::new(move || {
            let weak = weak.clone();
            context.post(move || {
                if let Some(manager) = weak.upgrade() {
                    run_locked(&manager, DeviceManager::process_pending_events);
                }
            });
        });
        run_locked(&manager, |m| m.set_event_waker(waker));

        log::info!("DeviceManagerService: Started");
        Ok(Self { manager, looper })
    }

    /// Context of the manager thread.
    pub fn context(&self) -> ExecutionContext {
        self.looper.context()
    }

    fn call<R, F>(&self, call: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut DeviceManager) -> R + Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        let result = self
            .looper
            .context()
            .run_blocking(move || run_locked(&manager, call));
        if result.is_none() {
            log::error!("DeviceManagerService: Manager thread is gone");
        }
        result
    }

    /// See [`DeviceManager::initialize`].
    pub fn initialize(&self) -> bool {
        self.call(DeviceManager::initialize).unwrap_or(false)
    }

    /// See [`DeviceManager::start`].
    pub fn start(&self) -> bool {
        self.call(DeviceManager::start).unwrap_or(false)
    }

    /// See [`DeviceManager::stop`].
    pub fn stop(&self) {
        self.call(DeviceManager::stop);
    }

    /// See [`DeviceManager::is_ready`].
    pub fn is_ready(&self) -> bool {
        self.call(|m| m.is_ready()).unwrap_or(false)
    }

    /// See [`DeviceManager::is_started`].
    pub fn is_started(&self) -> bool {
        self.call(|m| m.is_started()).unwrap_or(false)
    }

    /// See [`DeviceManager::register_status_listener`].
    pub fn register_status_listener(
        &self,
        listener: Arc<dyn ManagerStatusListener>,
        context: ExecutionContext,
    ) -> bool {
        self.call(move |m| m.register_status_listener(listener, context))
            .unwrap_or(false)
    }

    /// See [`DeviceManager::unregister_status_listener`].
    pub fn unregister_status_listener(&self, listener: Arc<dyn ManagerStatusListener>) -> bool {
        self.call(move |m| m.unregister_status_listener(&listener))
            .unwrap_or(false)
    }

    /// See [`DeviceManager::supported_types`].
    pub fn supported_types(&self, chip: Option<ChipId>) -> BTreeSet<IfaceType> {
        self.call(move |m| m.supported_types(chip))
            .unwrap_or_default()
    }

    /// See [`DeviceManager::can_support`].
    pub fn can_support(&self, counts: IfaceCounts) -> bool {
        self.call(move |m| m.can_support(&counts)).unwrap_or(false)
    }

    /// See [`DeviceManager::is_sta_ap_concurrency_supported`].
    pub fn is_sta_ap_concurrency_supported(&self) -> bool {
        self.call(|m| m.is_sta_ap_concurrency_supported())
            .unwrap_or(false)
    }

    /// See [`DeviceManager::is_bridged_ap_supported`].
    pub fn is_bridged_ap_supported(&self) -> bool {
        self.call(|m| m.is_bridged_ap_supported()).unwrap_or(false)
    }

    /// See [`DeviceManager::is_sta_bridged_ap_supported`].
    pub fn is_sta_bridged_ap_supported(&self) -> bool {
        self.call(|m| m.is_sta_bridged_ap_supported())
            .unwrap_or(false)
    }

    /// See [`DeviceManager::report_impact`].
    pub fn report_impact(
        &self,
        iface_type: IfaceType,
        required: ChipCapabilities,
        requestor: Requestor,
    ) -> Option<Vec<ImpactEntry>> {
        self.call(move |m| m.report_impact(iface_type, required, &requestor))
            .flatten()
    }

    /// See [`DeviceManager::can_create_interface`].
    pub fn can_create_interface(
        &self,
        iface_type: IfaceType,
        required: ChipCapabilities,
        requestor: Requestor,
    ) -> bool {
        self.call(move |m| m.can_create_interface(iface_type, required, &requestor))
            .unwrap_or(false)
    }

    /// See [`DeviceManager::create_interface`].
    pub fn create_interface(&self, request: CreateRequest) -> Result<InterfaceHandle, CreateError> {
        self.call(move |m| m.create_interface(request))
            .unwrap_or(Err(CreateError::Shutdown))
    }

    /// See [`DeviceManager::remove_interface`].
    pub fn remove_interface(&self, handle: InterfaceHandle) -> bool {
        self.call(move |m| m.remove_interface(&handle))
            .unwrap_or(false)
    }

    /// See [`DeviceManager::replace_requestor`].
    pub fn replace_requestor(&self, handle: InterfaceHandle, requestor: Requestor) -> bool {
        self.call(move |m| m.replace_requestor(&handle, requestor))
            .unwrap_or(false)
    }

    /// See [`DeviceManager::interfaces`].
    pub fn interfaces(&self) -> Vec<InterfaceHandle> {
        self.call(|m| m.interfaces()).unwrap_or_default()
    }

    /// See [`DeviceManager::interface_owner`].
    pub fn interface_owner(&self, handle: InterfaceHandle) -> Option<Requestor> {
        self.call(move |m| m.interface_owner(&handle)).flatten()
    }

    /// See [`DeviceManager::register_rtt_observer`].
    pub fn register_rtt_observer(
        &self,
        listener: Arc<dyn RttControllerLifecycleListener>,
        context: ExecutionContext,
    ) {
        self.call(move |m| m.register_rtt_observer(listener, context));
    }

    /// See [`DeviceManager::unregister_rtt_observer`].
    pub fn unregister_rtt_observer(&self, listener: Arc<dyn RttControllerLifecycleListener>) -> bool {
        self.call(move |m| m.unregister_rtt_observer(&listener))
            .unwrap_or(false)
    }

    /// See [`DeviceManager::rtt_controller`].
    pub fn rtt_controller(&self) -> Option<RttControllerId> {
        self.call(|m| m.rtt_controller()).flatten()
    }

    /// Stops the manager thread after the work already queued.
    pub fn shutdown(mut self) {
        self.looper.quit();
        log::info!("DeviceManagerService: Shut down");
    }
}
