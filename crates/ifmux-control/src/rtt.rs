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

//! RTT controller lifecycle.
//!
//! At most one controller exists. It lives on a chip sitting in its
//! RTT-eligible mode and is bound to one of that chip's live interfaces.
//! [`RttLifecycle::reconcile`] is the single re-evaluation pass run after
//! every mutating operation.

use crate::chip::Chip;
use crate::dispatch::Outbox;
use crate::registry::InterfaceRegistry;
use ifmux_core::exec::ExecutionContext;
use ifmux_core::hal::{ChipId, RttControllerId, WifiHal};
use ifmux_core::listener::{ListenerProxy, RttControllerLifecycleListener};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Binding {
    id: RttControllerId,
    chip: ChipId,
    iface: String,
}

/// The RTT controller and its observers.
#[derive(Default)]
pub struct RttLifecycle {
    controller: Option<Binding>,
    observers: Vec<ListenerProxy<dyn RttControllerLifecycleListener>>,
}

impl RttLifecycle {
    /// Creates an absent controller with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// The live controller, if any.
    pub fn controller(&self) -> Option<RttControllerId> {
        self.controller.as_ref().map(|b| b.id)
    }

    /// Adds an observer.
    ///
    /// Returns `true` when the caller must run [`reconcile`](Self::reconcile):
    /// no controller exists yet. When one exists, only the new observer is
    /// told about it.
    pub fn add_observer(
        &mut self,
        listener: Arc<dyn RttControllerLifecycleListener>,
        context: ExecutionContext,
        outbox: &mut Outbox,
    ) -> bool {
        if self.observers.iter().any(|p| p.is_same(&listener)) {
            return false;
        }
        let proxy = ListenerProxy::new(listener, context);
        let needs_pass = match &self.controller {
            Some(binding) => {
                let id = binding.id;
                outbox.notify(&proxy, move |l| l.on_new_rtt_controller(id));
                false
            }
            None => true,
        };
        self.observers.push(proxy);
        needs_pass
    }

    /// Removes an observer. Returns `false` if it was unknown.
    pub fn remove_observer(&mut self, listener: &Arc<dyn RttControllerLifecycleListener>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|p| !p.is_same(listener));
        self.observers.len() != before
    }

    /// Drops the controller and tells every observer.
    pub fn destroy(&mut self, outbox: &mut Outbox) {
        if let Some(binding) = self.controller.take() {
            log::info!(
                "RTT: Controller {:?} on {} ({}) destroyed",
                binding.id,
                binding.chip,
                binding.iface
            );
            for observer in &self.observers {
                outbox.notify(observer, |l| l.on_rtt_controller_destroyed());
            }
        }
    }

    /// Re-evaluates whether a controller should exist.
    ///
    /// A controller that fails its liveness probe, or whose chip left its
    /// RTT-eligible mode, is destroyed. Then, if none exists, one is created
    /// on the first started chip in its RTT-eligible mode that hosts a live
    /// interface, bound to the oldest of them.
    pub fn reconcile(
        &mut self,
        hal: Option<&Arc<dyn WifiHal>>,
        chips: &[Chip],
        registry: &InterfaceRegistry,
        outbox: &mut Outbox,
    ) {
        if let Some(binding) = &self.controller {
            let alive = hal.is_some_and(|h| h.rtt_controller_bound_iface(binding.id).is_ok());
            let eligible = chips
                .iter()
                .find(|c| c.id() == binding.chip)
                .is_some_and(Chip::in_rtt_mode);
            if !alive || !eligible {
                log::debug!("RTT: Controller stale (alive={}, eligible={})", alive, eligible);
                self.destroy(outbox);
            }
        }

        if self.controller.is_some() {
            return;
        }
        let Some(hal) = hal else {
            return;
        };

        for chip in chips.iter().filter(|c| c.in_rtt_mode()) {
            let Some(anchor) = registry.oldest_on(chip.id()) else {
                continue;
            };
            match chip.ops.create_rtt_controller(hal.as_ref(), &anchor.handle.name) {
                Ok(id) => {
                    log::info!(
                        "RTT: Controller {:?} created on {} bound to {} ({:?})",
                        id,
                        chip.id(),
                        anchor.handle.name,
                        chip.ops.rtt_api()
                    );
                    self.controller = Some(Binding {
                        id,
                        chip: chip.id(),
                        iface: anchor.handle.name.clone(),
                    });
                    for observer in &self.observers {
                        outbox.notify(observer, move |l| l.on_new_rtt_controller(id));
                    }
                    return;
                }
                Err(e) => {
                    log::warn!("RTT: Controller creation on {} failed: {}", chip.id(), e);
                }
            }
        }
    }
}
