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

//! Chip lifecycle: binding to the HAL service, power control and status.

use crate::chip::Chip;
use crate::dispatch::Outbox;
use ifmux_core::exec::ExecutionContext;
use ifmux_core::hal::{DeathRecipient, HalError, HalEventSink, ServiceDiscovery, WifiHal};
use ifmux_core::listener::{ListenerProxy, ManagerStatusListener};
use std::sync::Arc;

/// Connection and power state of the HAL service.
pub struct ChipLifecycle {
    discovery: Arc<dyn ServiceDiscovery>,
    hal: Option<Arc<dyn WifiHal>>,
    generation: u64,
    ready: bool,
    started: bool,
    start_requested: bool,
    retry_budget: u32,
    listeners: Vec<ListenerProxy<dyn ManagerStatusListener>>,
    reported: (bool, bool),
}

impl ChipLifecycle {
    /// Creates an unbound lifecycle.
    pub fn new(discovery: Arc<dyn ServiceDiscovery>, retry_budget: u32) -> Self {
        Self {
            discovery,
            hal: None,
            generation: 0,
            ready: false,
            started: false,
            start_requested: false,
            retry_budget,
            listeners: Vec::new(),
            reported: (false, false),
        }
    }

    /// The bound service, if any.
    pub fn hal(&self) -> Option<&Arc<dyn WifiHal>> {
        self.hal.as_ref()
    }

    /// Generation of the current binding.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the service is bound.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the chip is powered on.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether a start is pending or in effect.
    pub fn start_requested(&self) -> bool {
        self.start_requested
    }

    /// Records or cancels the caller's wish to have the chip started.
    pub fn set_start_requested(&mut self, requested: bool) {
        self.start_requested = requested;
    }

    /// Subscribes to registration notifications of the service.
    pub fn register_for_notifications(&self, sink: HalEventSink) -> bool {
        match self.discovery.register_for_notifications(sink) {
            Ok(()) => true,
            Err(e) => {
                log::error!("ChipLifecycle: Service notification registration failed: {}", e);
                false
            }
        }
    }

    /// Binds the service if it is registered.
    ///
    /// `death_recipient` receives the generation stamped on this binding.
    /// The service is stopped right away to start from a known state.
    pub fn bind<F>(&mut self, death_recipient: F) -> bool
    where
        F: FnOnce(u64) -> DeathRecipient,
    {
        if self.hal.is_some() {
            log::debug!("ChipLifecycle: Already bound (generation={})", self.generation);
            return true;
        }

        let generation = self.generation + 1;
        let Some(hal) = self.discovery.connect(death_recipient(generation)) else {
            log::warn!("ChipLifecycle: HAL service is not registered yet");
            return false;
        };
        self.generation = generation;

        if let Err(e) = hal.stop() {
            log::warn!("ChipLifecycle: Initial stop failed: {}", e);
        }
        self.hal = Some(hal);
        self.ready = true;
        self.started = false;
        log::info!("ChipLifecycle: Bound HAL service (generation={})", generation);
        true
    }

    /// Powers the chip on, retrying while the service is not available yet.
    pub fn power_on(&mut self) -> bool {
        let Some(hal) = self.hal.clone() else {
            log::warn!("ChipLifecycle: Cannot start, no HAL service bound");
            return false;
        };
        if self.started {
            return true;
        }

        let mut attempt = 0;
        loop {
            match hal.start() {
                Ok(()) => break,
                Err(HalError::NotAvailable) if attempt < self.retry_budget => {
                    attempt += 1;
                    log::warn!(
                        "ChipLifecycle: HAL not available, retrying ({}/{})",
                        attempt,
                        self.retry_budget
                    );
                }
                Err(e) => {
                    log::error!("ChipLifecycle: Start failed after {} retries: {}", attempt, e);
                    return false;
                }
            }
        }

        self.started = true;
        log::info!("ChipLifecycle: Chip started");
        true
    }

    /// Queries every chip of the service.
    pub fn query_chips(&self) -> Result<Vec<Chip>, HalError> {
        let hal = self.hal.as_ref().ok_or(HalError::Disconnected)?;
        let mut chips = Vec::new();
        for id in hal.chip_ids()? {
            chips.push(Chip::query(hal.as_ref(), id)?);
        }
        Ok(chips)
    }

    /// Powers the chip off. The binding is kept.
    pub fn power_off(&mut self) {
        if let Some(hal) = &self.hal {
            if let Err(e) = hal.stop() {
                log::warn!("ChipLifecycle: Stop failed: {}", e);
            }
        }
        if self.started {
            log::info!("ChipLifecycle: Chip stopped");
        }
        self.started = false;
    }

    /// Handles the death of the binding stamped with `generation`.
    ///
    /// Returns `false` for notifications about an older binding.
    pub fn on_death(&mut self, generation: u64) -> bool {
        if self.hal.is_none() || generation != self.generation {
            log::debug!(
                "ChipLifecycle: Ignoring stale death (generation={}, current={})",
                generation,
                self.generation
            );
            return false;
        }
        log::error!("ChipLifecycle: HAL service died (generation={})", generation);
        self.hal = None;
        self.ready = false;
        self.started = false;
        true
    }

    /// Adds a status listener. Returns `false` if it was already registered.
    pub fn add_listener(
        &mut self,
        listener: Arc<dyn ManagerStatusListener>,
        context: ExecutionContext,
    ) -> bool {
        if self.listeners.iter().any(|p| p.is_same(&listener)) {
            return false;
        }
        self.listeners.push(ListenerProxy::new(listener, context));
        true
    }

    /// Removes a status listener. Returns `false` if it was unknown.
    pub fn remove_listener(&mut self, listener: &Arc<dyn ManagerStatusListener>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|p| !p.is_same(listener));
        self.listeners.len() != before
    }

    /// Queues a status notification if `(ready, started)` changed since the
    /// last one.
    pub fn publish_status(&mut self, outbox: &mut Outbox) {
        let now = (self.ready, self.started);
        if now == self.reported {
            return;
        }
        log::debug!(
            "ChipLifecycle: Status ready={} started={} -> {} listener(s)",
            now.0,
            now.1,
            self.listeners.len()
        );
        self.reported = now;
        for listener in &self.listeners {
            outbox.notify(listener, |l| l.on_status_changed());
        }
    }
}
