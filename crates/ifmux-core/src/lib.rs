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

//! # ifmux Core
//!
//! Foundational crate containing the types, traits and interface contracts
//! shared by the interface manager: interface types, the chip combination
//! model, requestor priorities, the HAL boundary, execution contexts used for
//! listener dispatch, and the persisted static chip record.

#![warn(missing_docs)]

pub mod capability;
pub mod combination;
pub mod event;
pub mod exec;
pub mod hal;
pub mod iface;
pub mod listener;
pub mod requestor;
pub mod static_info;

pub use capability::ChipCapabilities;
pub use combination::{ChipMode, Combination, CombinationModel, ComboLimit, ModeId};
pub use event::EventBus;
pub use exec::{ExecutionContext, Looper, LooperThread};
pub use hal::{
    ChipId, ChipOps, DeathRecipient, HalError, HalEvent, HalEventSink, HalResult, HalRevision,
    RttApi, RttControllerId, ServiceDiscovery, WifiHal,
};
pub use iface::{HalIfaceKind, IfaceCounts, IfaceType};
pub use listener::{
    BridgedApDowngradeHandler, InterfaceDestroyedListener, ListenerProxy, ManagerStatusListener,
    RttControllerLifecycleListener,
};
pub use requestor::{
    InternalPriority, PriorityClass, PriorityPolicy, PriorityRank, PriorityResolver, Requestor,
};
pub use static_info::{StaticChipInfo, StaticChipInfoStore, StaticInfoError};
