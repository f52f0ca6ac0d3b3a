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

//! Request scripts replayed by `ifmux simulate`.
//!
//! A script is a JSON object with an optional priority table and a list of
//! steps, each tagged by `op`:
//!
//! ```json
//! {
//!   "priorities": {
//!     "fallback": "foreground",
//!     "entries": [{ "uid": 1000, "name": "settings", "class": "privileged" }]
//!   },
//!   "steps": [
//!     { "op": "start" },
//!     { "op": "create", "label": "client", "type": "sta",
//!       "requestor": { "uid": 1000, "name": "settings" } },
//!     { "op": "status" }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use ifmux_core::capability::ChipCapabilities;
use ifmux_core::iface::IfaceType;
use ifmux_core::requestor::{PriorityClass, Requestor};
use ifmux_infra::PriorityEntry;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub priorities: PriorityConfig,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid script {}", path.display()))
    }
}

/// Priority classes of the requestors used by a script.
#[derive(Debug, Deserialize)]
pub struct PriorityConfig {
    /// Class of requestors missing from `entries`.
    #[serde(default = "default_fallback")]
    pub fallback: PriorityClass,
    #[serde(default)]
    pub entries: Vec<PriorityEntry>,
}

fn default_fallback() -> PriorityClass {
    PriorityClass::Foreground
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            fallback: default_fallback(),
            entries: Vec::new(),
        }
    }
}

/// Failure injected into the simulated HAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// The next power-on fails outright.
    Start,
    /// The next `count` power-ons report the service as not available yet.
    NotAvailable,
    /// The next mode configuration fails.
    Configure,
    /// The next interface creation fails.
    Create,
    /// The next removal fails and leaves the interface listed.
    Removal,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Start,
    Stop,
    /// Kills the HAL service.
    Kill,
    /// Brings the HAL service back and announces it.
    Announce,
    Create {
        /// Name later steps use to refer to the interface.
        #[serde(default)]
        label: Option<String>,
        #[serde(rename = "type")]
        iface_type: IfaceType,
        requestor: Requestor,
        #[serde(default)]
        capabilities: ChipCapabilities,
    },
    Impact {
        #[serde(rename = "type")]
        iface_type: IfaceType,
        requestor: Requestor,
        #[serde(default)]
        capabilities: ChipCapabilities,
    },
    Remove {
        label: String,
    },
    Handover {
        label: String,
        requestor: Requestor,
    },
    SetPriority {
        requestor: Requestor,
        class: PriorityClass,
    },
    Fail {
        fault: Fault,
        #[serde(default = "one")]
        count: u32,
    },
    /// Removes a labelled interface behind the manager's back.
    RemoveExternally {
        label: String,
    },
    /// Prints the manager state.
    Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_script() {
        let script = Script::parse(
            r#"{
                "priorities": {
                    "fallback": "background",
                    "entries": [{ "uid": 1000, "name": "settings", "class": "privileged" }]
                },
                "steps": [
                    { "op": "start" },
                    { "op": "create", "label": "c", "type": "ap_bridged",
                      "requestor": { "uid": 1000, "name": "settings" }, "capabilities": 4 },
                    { "op": "fail", "fault": "not_available", "count": 2 },
                    { "op": "set_priority", "requestor": { "uid": 7, "name": "x" },
                      "class": "system" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(script.priorities.fallback, PriorityClass::Background);
        assert_eq!(script.priorities.entries.len(), 1);
        assert_eq!(script.steps[0], Step::Start);
        assert_eq!(
            script.steps[1],
            Step::Create {
                label: Some("c".to_string()),
                iface_type: IfaceType::ApBridged,
                requestor: Requestor::new(1000, "settings"),
                capabilities: ChipCapabilities::BRIDGED_AP,
            }
        );
        assert_eq!(
            script.steps[2],
            Step::Fail {
                fault: Fault::NotAvailable,
                count: 2
            }
        );
        assert_eq!(
            script.steps[3],
            Step::SetPriority {
                requestor: Requestor::new(7, "x"),
                class: PriorityClass::System,
            }
        );
    }

    #[test]
    fn test_optional_fields_default() {
        let script = Script::parse(
            r#"{ "steps": [
                { "op": "create", "type": "sta", "requestor": { "uid": 1, "name": "a" } },
                { "op": "fail", "fault": "create" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(script.priorities.fallback, PriorityClass::Foreground);
        assert!(script.priorities.entries.is_empty());
        assert_eq!(
            script.steps[0],
            Step::Create {
                label: None,
                iface_type: IfaceType::Sta,
                requestor: Requestor::new(1, "a"),
                capabilities: ChipCapabilities::NONE,
            }
        );
        assert_eq!(
            script.steps[1],
            Step::Fail {
                fault: Fault::Create,
                count: 1
            }
        );
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        assert!(Script::parse(r#"{ "steps": [{ "op": "reboot" }] }"#).is_err());
    }
}
