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

//! Subcommands and the file loaders they share.

pub mod check;
pub mod simulate;

use anyhow::{bail, Context, Result};
use ifmux_control::ManagerConfig;
use ifmux_core::iface::{IfaceCounts, IfaceType};
use ifmux_core::static_info::{self, StaticChipInfo};
use std::fs;
use std::path::Path;

/// Reads the manager configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<ManagerConfig> {
    let Some(path) = path else {
        return Ok(ManagerConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ManagerConfig::from_json(&text)
        .with_context(|| format!("invalid config {}", path.display()))
}

/// Reads a chip description: a JSON array of static chip records.
pub fn load_chips(path: &Path) -> Result<Vec<StaticChipInfo>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read chip file {}", path.display()))?;
    let chips = static_info::decode(&text)
        .with_context(|| format!("invalid chip file {}", path.display()))?;
    if chips.is_empty() {
        bail!("chip file {} describes no chip", path.display());
    }
    Ok(chips)
}

/// Parses `sta=1,ap=1` into a type multiset. A bare type counts once.
pub fn parse_combo(text: &str) -> Result<IfaceCounts> {
    let mut pairs = Vec::new();
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, count) = match item.split_once('=') {
            Some((name, count)) => {
                let count: u32 = count
                    .trim()
                    .parse()
                    .with_context(|| format!("bad count in '{}'", item))?;
                (name.trim(), count)
            }
            None => (item, 1),
        };
        let ty = IfaceType::from_name(name)
            .with_context(|| format!("unknown interface type '{}'", name))?;
        pairs.push((ty, count));
    }
    if pairs.is_empty() {
        bail!("empty combination '{}'", text);
    }
    Ok(IfaceCounts::from_pairs(pairs))
}
