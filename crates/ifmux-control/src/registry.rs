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

//! The authoritative set of live interfaces.

use crate::dispatch::Outbox;
use crate::error::RegistryError;
use ifmux_core::hal::ChipId;
use ifmux_core::iface::IfaceType;
use ifmux_core::listener::{BridgedApDowngradeHandler, InterfaceDestroyedListener, ListenerProxy};
use ifmux_core::requestor::Requestor;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Caller-facing reference to a live interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceHandle {
    /// Chip hosting the interface.
    pub chip: ChipId,
    /// Hardware-assigned interface name.
    pub name: String,
    /// Type the interface was created as.
    pub iface_type: IfaceType,
}

impl fmt::Display for InterfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}@{})", self.name, self.iface_type, self.chip)
    }
}

/// Registry entry of a live interface.
pub struct InterfaceRecord {
    /// Identity of the interface.
    pub handle: InterfaceHandle,
    /// Current owner.
    pub requestor: Requestor,
    /// Wall-clock creation time.
    pub created_at: Instant,
    /// Monotonic creation sequence number; higher is younger.
    pub seq: u64,
    /// Notified when the interface is torn down.
    pub destroyed_listener: Option<ListenerProxy<dyn InterfaceDestroyedListener>>,
    /// Picks the instance to shed when a bridged AP is downgraded.
    pub downgrade_handler: Option<Arc<dyn BridgedApDowngradeHandler>>,
}

impl InterfaceRecord {
    /// Queues the destroy notification of this interface, if any.
    pub(crate) fn notify_destroyed(&self, outbox: &mut Outbox) {
        if let Some(listener) = &self.destroyed_listener {
            let name = self.handle.name.clone();
            outbox.notify(listener, move |l| l.on_destroyed(&name));
        }
    }
}

impl fmt::Debug for InterfaceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceRecord")
            .field("handle", &self.handle)
            .field("requestor", &self.requestor)
            .field("seq", &self.seq)
            .field("has_destroyed_listener", &self.destroyed_listener.is_some())
            .finish_non_exhaustive()
    }
}

/// Live interfaces keyed by `(chip, name)`.
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    records: BTreeMap<(ChipId, String), InterfaceRecord>,
    next_seq: u64,
}

impl InterfaceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracks a freshly created interface and stamps its creation order.
    pub fn insert(
        &mut self,
        handle: InterfaceHandle,
        requestor: Requestor,
        destroyed_listener: Option<ListenerProxy<dyn InterfaceDestroyedListener>>,
        downgrade_handler: Option<Arc<dyn BridgedApDowngradeHandler>>,
    ) -> Result<&InterfaceRecord, RegistryError> {
        let key = (handle.chip, handle.name.clone());
        if self.records.contains_key(&key) {
            return Err(RegistryError::DuplicateName {
                chip: handle.chip,
                name: handle.name,
            });
        }

        self.next_seq += 1;
        log::debug!(
            "Registry: Tracking {} for {} (seq={})",
            handle,
            requestor,
            self.next_seq
        );
        let record = InterfaceRecord {
            handle,
            requestor,
            created_at: Instant::now(),
            seq: self.next_seq,
            destroyed_listener,
            downgrade_handler,
        };
        Ok(&*self.records.entry(key).or_insert(record))
    }

    /// Stops tracking an interface.
    pub fn remove(&mut self, chip: ChipId, name: &str) -> Option<InterfaceRecord> {
        let record = self.records.remove(&(chip, name.to_string()));
        if let Some(record) = &record {
            log::debug!("Registry: Dropped {}", record.handle);
        }
        record
    }

    /// Looks up an interface by chip and name.
    pub fn get(&self, chip: ChipId, name: &str) -> Option<&InterfaceRecord> {
        self.records.get(&(chip, name.to_string()))
    }

    /// Looks up the record a handle designates. The type must match too.
    pub fn resolve(&self, handle: &InterfaceHandle) -> Option<&InterfaceRecord> {
        self.get(handle.chip, &handle.name)
            .filter(|r| r.handle.iface_type == handle.iface_type)
    }

    /// Reassigns ownership and returns the previous owner.
    pub fn set_requestor(
        &mut self,
        handle: &InterfaceHandle,
        requestor: Requestor,
    ) -> Result<Requestor, RegistryError> {
        match self.records.get_mut(&(handle.chip, handle.name.clone())) {
            Some(record) if record.handle.iface_type == handle.iface_type => {
                Ok(std::mem::replace(&mut record.requestor, requestor))
            }
            _ => Err(RegistryError::UnknownInterface {
                chip: handle.chip,
                name: handle.name.clone(),
            }),
        }
    }

    /// Live interfaces of a chip, ordered by name.
    pub fn on_chip(&self, chip: ChipId) -> impl Iterator<Item = &InterfaceRecord> {
        self.records
            .range((chip, String::new())..)
            .take_while(move |((c, _), _)| *c == chip)
            .map(|(_, record)| record)
    }

    /// Oldest live interface of a chip.
    pub fn oldest_on(&self, chip: ChipId) -> Option<&InterfaceRecord> {
        self.on_chip(chip).min_by_key(|r| r.seq)
    }

    /// An interface of `ty` owned by `requestor`, if one is live.
    pub fn find_owned(&self, ty: IfaceType, requestor: &Requestor) -> Option<&InterfaceRecord> {
        self.records
            .values()
            .find(|r| r.handle.iface_type == ty && &r.requestor == requestor)
    }

    /// Every live interface, ordered by chip then name.
    pub fn iter(&self) -> impl Iterator<Item = &InterfaceRecord> {
        self.records.values()
    }

    /// Stops tracking everything and returns the records, oldest first.
    pub fn drain(&mut self) -> Vec<InterfaceRecord> {
        let mut records: Vec<InterfaceRecord> =
            std::mem::take(&mut self.records).into_values().collect();
        records.sort_by_key(|r| r.seq);
        records
    }

    /// Number of live interfaces.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is live.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(chip: u32, name: &str, ty: IfaceType) -> InterfaceHandle {
        InterfaceHandle {
            chip: ChipId(chip),
            name: name.to_string(),
            iface_type: ty,
        }
    }

    fn registry_with(entries: &[(u32, &str, IfaceType, &str)]) -> InterfaceRegistry {
        let mut registry = InterfaceRegistry::new();
        for (i, (chip, name, ty, owner)) in entries.iter().enumerate() {
            registry
                .insert(
                    handle(*chip, name, *ty),
                    Requestor::new(i as u32, owner),
                    None,
                    None,
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let registry = registry_with(&[
            (0, "wlan0", IfaceType::Sta, "a"),
            (0, "p2p0", IfaceType::P2p, "b"),
        ]);
        let first = registry.get(ChipId(0), "wlan0").unwrap().seq;
        let second = registry.get(ChipId(0), "p2p0").unwrap().seq;
        assert!(first < second);
        assert_eq!(registry.oldest_on(ChipId(0)).unwrap().handle.name, "wlan0");
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = registry_with(&[(0, "wlan0", IfaceType::Sta, "a")]);
        let err = registry
            .insert(handle(0, "wlan0", IfaceType::Sta), Requestor::new(9, "b"), None, None)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateName {
                chip: ChipId(0),
                name: "wlan0".into()
            }
        );
        // Same name on another chip is fine.
        assert!(registry
            .insert(handle(1, "wlan0", IfaceType::Sta), Requestor::new(9, "b"), None, None)
            .is_ok());
    }

    #[test]
    fn test_on_chip_only_yields_that_chip() {
        let registry = registry_with(&[
            (0, "wlan0", IfaceType::Sta, "a"),
            (1, "wlan1", IfaceType::Sta, "a"),
            (1, "ap0", IfaceType::Ap, "b"),
            (2, "nan0", IfaceType::Nan, "c"),
        ]);
        let names: Vec<&str> = registry
            .on_chip(ChipId(1))
            .map(|r| r.handle.name.as_str())
            .collect();
        assert_eq!(names, vec!["ap0", "wlan1"]);
    }

    #[test]
    fn test_set_requestor_keeps_interface() {
        let mut registry = registry_with(&[(0, "wlan0", IfaceType::Sta, "a")]);
        let h = handle(0, "wlan0", IfaceType::Sta);
        let previous = registry.set_requestor(&h, Requestor::new(5, "b")).unwrap();
        assert_eq!(previous.name, "a");
        assert_eq!(registry.resolve(&h).unwrap().requestor, Requestor::new(5, "b"));

        let wrong_type = handle(0, "wlan0", IfaceType::Ap);
        assert!(registry.set_requestor(&wrong_type, Requestor::new(6, "c")).is_err());
        assert!(registry.resolve(&wrong_type).is_none());
    }

    #[test]
    fn test_find_owned_matches_type_and_owner() {
        let registry = registry_with(&[
            (0, "wlan0", IfaceType::Sta, "a"),
            (0, "ap0", IfaceType::Ap, "b"),
        ]);
        assert!(registry.find_owned(IfaceType::Sta, &Requestor::new(0, "a")).is_some());
        assert!(registry.find_owned(IfaceType::Sta, &Requestor::new(1, "b")).is_none());
        assert!(registry.find_owned(IfaceType::Ap, &Requestor::new(1, "b")).is_some());
    }

    #[test]
    fn test_drain_empties_oldest_first() {
        let mut registry = registry_with(&[
            (0, "z-old", IfaceType::Sta, "a"),
            (0, "a-new", IfaceType::P2p, "b"),
        ]);
        let drained: Vec<String> = registry.drain().into_iter().map(|r| r.handle.name).collect();
        assert_eq!(drained, vec!["z-old".to_string(), "a-new".to_string()]);
        assert!(registry.is_empty());
    }
}
