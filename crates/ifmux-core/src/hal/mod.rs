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

//! The hardware abstraction layer boundary.
//!
//! The manager never talks to a transport directly. It drives a [`WifiHal`]
//! implementation obtained from a [`ServiceDiscovery`], and resolves a
//! [`ChipOps`] routing table once per chip so that revision-specific calls
//! go to the newest variant the chip supports.

mod ops;

pub use ops::{ChipOps, RttApi};

use crate::capability::ChipCapabilities;
use crate::combination::{ChipMode, ModeId};
use crate::iface::HalIfaceKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Hardware identifier of a chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChipId(pub u32);

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chip#{}", self.0)
    }
}

/// Identifier of an RTT controller object handed out by the HAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RttControllerId(pub u64);

/// Protocol revisions a chip object may implement.
///
/// Ordered: a chip implementing a revision implements every older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HalRevision {
    /// Base protocol.
    V1_0,
    /// Adds RTT controller revision 1.4.
    V1_4,
    /// Adds bridged access points, instance removal and 1.5 capabilities.
    V1_5,
    /// Adds RTT controller revision 1.6.
    V1_6,
}

/// Errors reported by a HAL call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HalError {
    /// The service is up but not ready yet; the call may be retried.
    #[error("HAL service not available yet")]
    NotAvailable,
    /// The service connection is gone.
    #[error("HAL service is disconnected")]
    Disconnected,
    /// The chip or object addressed by the call does not exist.
    #[error("unknown HAL object: {0}")]
    UnknownObject(String),
    /// The call is not implemented by the chip's protocol revision.
    #[error("operation not supported by {0:?}")]
    NotSupported(HalRevision),
    /// The call was rejected or failed.
    #[error("HAL call failed: {0}")]
    Failure(String),
}

/// Result alias for HAL calls.
pub type HalResult<T> = Result<T, HalError>;

/// Remote-procedure surface of the Wi-Fi HAL service.
///
/// Every call is synchronous and treated as atomic by the manager.
pub trait WifiHal: Send + Sync {
    /// Powers the service on.
    fn start(&self) -> HalResult<()>;

    /// Powers the service off. Every chip loses its interfaces and mode.
    fn stop(&self) -> HalResult<()>;

    /// Enumerates the chips exposed by the service.
    fn chip_ids(&self) -> HalResult<Vec<ChipId>>;

    /// Newest protocol revision implemented by a chip object.
    fn chip_revision(&self, chip: ChipId) -> HalResult<HalRevision>;

    /// Capability bits reported by the given revision of the chip object.
    fn chip_capabilities(&self, chip: ChipId, revision: HalRevision)
        -> HalResult<ChipCapabilities>;

    /// Modes offered by the chip.
    fn available_modes(&self, chip: ChipId) -> HalResult<Vec<ChipMode>>;

    /// Currently configured mode, if any.
    fn current_mode(&self, chip: ChipId) -> HalResult<Option<ModeId>>;

    /// Configures the chip into a mode. Existing interfaces are destroyed.
    fn configure_chip(&self, chip: ChipId, mode: ModeId) -> HalResult<()>;

    /// Names of the live interface objects of one kind.
    fn iface_names(&self, chip: ChipId, kind: HalIfaceKind) -> HalResult<Vec<String>>;

    /// Creates an interface object and returns its hardware-assigned name.
    fn create_iface(&self, chip: ChipId, kind: HalIfaceKind) -> HalResult<String>;

    /// Creates a bridged access point (revision 1.5 and newer).
    fn create_bridged_ap_iface(&self, chip: ChipId) -> HalResult<String>;

    /// Physical instances backing an access point object.
    fn bridged_ap_instances(&self, chip: ChipId, name: &str) -> HalResult<Vec<String>>;

    /// Removes one physical instance from a bridged access point.
    fn remove_bridged_ap_instance(&self, chip: ChipId, name: &str, instance: &str)
        -> HalResult<()>;

    /// Removes an interface object.
    fn remove_iface(&self, chip: ChipId, kind: HalIfaceKind, name: &str) -> HalResult<()>;

    /// Creates an RTT controller bound to `bound_iface` through `api`.
    fn create_rtt_controller(
        &self,
        chip: ChipId,
        bound_iface: &str,
        api: RttApi,
    ) -> HalResult<RttControllerId>;

    /// Liveness probe: the interface the controller is bound to.
    fn rtt_controller_bound_iface(&self, id: RttControllerId) -> HalResult<String>;
}

/// Notifications coming from the service discovery and death plumbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalEvent {
    /// The HAL service (re)registered with service discovery.
    Registered,
    /// The service bound under `generation` died.
    Died {
        /// Generation stamped on the connection when it was bound.
        generation: u64,
    },
}

/// Callback used by service discovery to report [`HalEvent`]s.
pub type HalEventSink = Arc<dyn Fn(HalEvent) + Send + Sync>;

/// Callback invoked once when a bound service connection dies.
pub type DeathRecipient = Arc<dyn Fn() + Send + Sync>;

/// Service-discovery mechanism for the HAL.
pub trait ServiceDiscovery: Send + Sync {
    /// Registers for registration notifications of the HAL service.
    fn register_for_notifications(&self, sink: HalEventSink) -> HalResult<()>;

    /// Connects to the service if it is registered, linking `on_death` to the
    /// connection's death notification.
    fn connect(&self, on_death: DeathRecipient) -> Option<Arc<dyn WifiHal>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revisions_are_ordered() {
        assert!(HalRevision::V1_0 < HalRevision::V1_4);
        assert!(HalRevision::V1_4 < HalRevision::V1_5);
        assert!(HalRevision::V1_5 < HalRevision::V1_6);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            HalError::NotAvailable.to_string(),
            "HAL service not available yet"
        );
        assert_eq!(
            HalError::NotSupported(HalRevision::V1_0).to_string(),
            "operation not supported by V1_0"
        );
    }
}
