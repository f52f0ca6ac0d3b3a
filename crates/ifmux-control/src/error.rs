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

//! Error types of the device manager.

use ifmux_core::combination::ModeId;
use ifmux_core::hal::{ChipId, HalError};
use ifmux_core::iface::IfaceType;
use ifmux_core::requestor::Requestor;

/// Reasons an interface creation is refused or fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateError {
    /// A destroy listener was supplied without an execution context.
    #[error("a destroy listener requires an execution context")]
    MissingExecutionContext,
    /// The chip is not powered on.
    #[error("the chip is not started")]
    NotStarted,
    /// The HAL reported interfaces the manager does not know about, or lost
    /// interfaces it tracks. The session was torn down.
    #[error("interface registry disagrees with the HAL: {0}")]
    Inconsistent(String),
    /// No mode of any chip can hold the request without evicting an
    /// interface the requestor is not allowed to evict.
    #[error("cannot create {iface_type} for {requestor}")]
    Infeasible {
        /// Requested interface type.
        iface_type: IfaceType,
        /// Requesting identity.
        requestor: Requestor,
    },
    /// Shrinking a bridged access point failed. Nothing was destroyed.
    #[error("failed to downgrade bridged AP {iface}: {source}")]
    Downgrade {
        /// The bridged access point being shrunk.
        iface: String,
        /// HAL failure.
        source: HalError,
    },
    /// Switching the chip mode failed. The session was torn down.
    #[error("failed to configure {chip} into {mode}: {source}")]
    ModeConfiguration {
        /// Chip being configured.
        chip: ChipId,
        /// Target mode.
        mode: ModeId,
        /// HAL failure.
        source: HalError,
    },
    /// A HAL call failed. Removals already performed are not rolled back.
    #[error(transparent)]
    Hal(#[from] HalError),
    /// The manager service has shut down.
    #[error("the device manager service is shut down")]
    Shutdown,
    /// The HAL handed out a name the registry already tracks.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised by the interface registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// An interface with this name is already live on the chip.
    #[error("{chip} already has an interface named {name}")]
    DuplicateName {
        /// Owning chip.
        chip: ChipId,
        /// Interface name.
        name: String,
    },
    /// No live interface matches the handle.
    #[error("{chip} has no interface named {name}")]
    UnknownInterface {
        /// Owning chip.
        chip: ChipId,
        /// Interface name.
        name: String,
    },
}
