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

//! # ifmux Infra
//!
//! Concrete implementations of the collaborators the device manager talks
//! to: a simulated HAL service with its discovery, stores for the static
//! chip record, and a table-driven priority resolver.

#![warn(missing_docs)]

pub mod priority;
pub mod sim;
pub mod store;

pub use priority::{PriorityEntry, StaticPriorityTable};
pub use sim::{HalCall, RemovalFault, SimulatedChip, SimulatedDiscovery, SimulatedHal};
pub use store::{FileChipInfoStore, MemoryChipInfoStore};
