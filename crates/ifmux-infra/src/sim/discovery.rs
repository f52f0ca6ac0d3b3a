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

//! Service discovery for the simulated HAL.

use super::hal::SimulatedHal;
use ifmux_core::hal::{DeathRecipient, HalEvent, HalEventSink, HalResult, ServiceDiscovery, WifiHal};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Registry {
    registered: bool,
    sinks: Vec<HalEventSink>,
    death_recipient: Option<DeathRecipient>,
    connects: usize,
}

/// Registers a [`SimulatedHal`] and lets tests kill and restart it.
pub struct SimulatedDiscovery {
    hal: Arc<SimulatedHal>,
    registry: Mutex<Registry>,
}

impl SimulatedDiscovery {
    /// Discovery with `hal` already registered.
    pub fn new(hal: Arc<SimulatedHal>) -> Self {
        Self {
            hal,
            registry: Mutex::new(Registry {
                registered: true,
                ..Registry::default()
            }),
        }
    }

    /// Discovery where `hal` registers only on [`announce`](Self::announce).
    pub fn unregistered(hal: Arc<SimulatedHal>) -> Self {
        Self {
            hal,
            registry: Mutex::new(Registry::default()),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The simulated service.
    pub fn hal(&self) -> &Arc<SimulatedHal> {
        &self.hal
    }

    /// Number of successful connections so far.
    pub fn connect_count(&self) -> usize {
        self.registry().connects
    }

    /// Kills the service: calls fail with a disconnect and the death
    /// recipient of the current connection fires.
    pub fn kill(&self) {
        let recipient = {
            let mut registry = self.registry();
            registry.registered = false;
            registry.death_recipient.take()
        };
        self.hal.set_alive(false);
        log::info!("SimDiscovery: Service killed");
        if let Some(recipient) = recipient {
            recipient();
        }
    }

    /// (Re)registers the service, powered off and with no interfaces, and
    /// notifies every registration sink.
    pub fn announce(&self) {
        let sinks = {
            let mut registry = self.registry();
            registry.registered = true;
            registry.sinks.clone()
        };
        self.hal.set_alive(true);
        log::info!("SimDiscovery: Service registered");
        for sink in sinks {
            sink(HalEvent::Registered);
        }
    }

    /// The death recipient linked to the current connection. Calling it
    /// again later simulates a late notification.
    pub fn death_recipient(&self) -> Option<DeathRecipient> {
        self.registry().death_recipient.clone()
    }
}

impl ServiceDiscovery for SimulatedDiscovery {
    fn register_for_notifications(&self, sink: HalEventSink) -> HalResult<()> {
        self.registry().sinks.push(sink);
        Ok(())
    }

    fn connect(&self, on_death: DeathRecipient) -> Option<Arc<dyn WifiHal>> {
        let mut registry = self.registry();
        if !registry.registered {
            return None;
        }
        registry.death_recipient = Some(on_death);
        registry.connects += 1;
        let hal: Arc<dyn WifiHal> = self.hal.clone();
        Some(hal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_connect_requires_registration() {
        let hal = Arc::new(SimulatedHal::new(Vec::new()));
        let discovery = SimulatedDiscovery::unregistered(hal);
        assert!(discovery.connect(Arc::new(|| {})).is_none());

        discovery.announce();
        assert!(discovery.connect(Arc::new(|| {})).is_some());
        assert_eq!(discovery.connect_count(), 1);
    }

    #[test]
    fn test_kill_fires_death_recipient_once() {
        let hal = Arc::new(SimulatedHal::new(Vec::new()));
        let discovery = SimulatedDiscovery::new(hal);
        let deaths = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&deaths);
        let connected = discovery
            .connect(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("registered");

        discovery.kill();
        discovery.kill();
        assert_eq!(deaths.load(Ordering::SeqCst), 1);
        assert!(connected.chip_ids().is_err());
    }

    #[test]
    fn test_announce_notifies_sinks() {
        let hal = Arc::new(SimulatedHal::new(Vec::new()));
        let discovery = SimulatedDiscovery::unregistered(hal);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        discovery
            .register_for_notifications(Arc::new(move |e| sink_events.lock().unwrap().push(e)))
            .unwrap();

        discovery.announce();
        assert_eq!(*events.lock().unwrap(), vec![HalEvent::Registered]);
    }
}
