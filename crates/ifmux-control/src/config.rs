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

//! Manager configuration.

use ifmux_core::requestor::{InternalPriority, PriorityPolicy};
use serde::{Deserialize, Serialize};

/// Tunables of the [`DeviceManager`](crate::DeviceManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Additional power-on attempts made while the HAL reports itself not
    /// available yet.
    pub start_retry_budget: u32,
    /// Placement of internal requestors in the priority order.
    pub internal_priority: InternalPriority,
    /// Writes live chip capabilities back to the static chip store.
    pub persist_static_chip_info: bool,
    /// Allows shrinking bridged access points to make room for a request.
    pub bridged_ap_downgrade: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            start_retry_budget: 3,
            internal_priority: InternalPriority::WithSystem,
            persist_static_chip_info: true,
            bridged_ap_downgrade: true,
        }
    }
}

impl ManagerConfig {
    /// Parses a JSON configuration. Missing fields keep their default.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The eviction policy described by this configuration.
    pub fn policy(&self) -> PriorityPolicy {
        PriorityPolicy::new(self.internal_priority)
    }
}
