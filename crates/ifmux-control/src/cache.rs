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

//! Static capability cache.
//!
//! Answers capability queries before the chip is powered on, from the last
//! chip records saved to a [`StaticChipInfoStore`]. Once the chip starts the
//! cache is replaced by live data and written back.

use crate::chip::Chip;
use ifmux_core::capability::ChipCapabilities;
use ifmux_core::combination::CombinationModel;
use ifmux_core::hal::ChipId;
use ifmux_core::iface::{IfaceCounts, IfaceType};
use ifmux_core::static_info::{self, StaticChipInfo, StaticChipInfoStore};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Capabilities and combinations of one chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedChip {
    /// Hardware id.
    pub id: ChipId,
    /// Base capability bits.
    pub capabilities: ChipCapabilities,
    /// Mode catalogue.
    pub model: CombinationModel,
}

impl From<&Chip> for CachedChip {
    fn from(chip: &Chip) -> Self {
        Self {
            id: chip.id(),
            capabilities: chip.capabilities,
            model: chip.model.clone(),
        }
    }
}

/// Last known chip capabilities, optionally backed by persistent storage.
pub struct CapabilityCache {
    chips: Vec<CachedChip>,
    store: Option<Arc<dyn StaticChipInfoStore>>,
    persist: bool,
}

impl CapabilityCache {
    /// A cache with no storage and no data.
    pub fn empty() -> Self {
        Self {
            chips: Vec::new(),
            store: None,
            persist: false,
        }
    }

    /// Loads the records saved in `store`. Unreadable records are logged and
    /// ignored.
    pub fn load(store: Arc<dyn StaticChipInfoStore>, persist: bool) -> Self {
        let chips = match store.load() {
            Ok(Some(text)) => match static_info::decode(&text) {
                Ok(records) => records
                    .iter()
                    .filter_map(|record| match record.to_model() {
                        Ok(model) => Some(CachedChip {
                            id: record.chip_id,
                            capabilities: record.chip_capabilities,
                            model,
                        }),
                        Err(e) => {
                            log::warn!("CapabilityCache: Skipping {}: {}", record.chip_id, e);
                            None
                        }
                    })
                    .collect(),
                Err(e) => {
                    log::warn!("CapabilityCache: Ignoring stored chip records: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => {
                log::debug!("CapabilityCache: No stored chip records yet");
                Vec::new()
            }
            Err(e) => {
                log::warn!("CapabilityCache: Failed to read chip records: {}", e);
                Vec::new()
            }
        };

        log::info!("CapabilityCache: Loaded {} chip record(s)", chips.len());
        Self {
            chips,
            store: Some(store),
            persist,
        }
    }

    /// Cached chips, in HAL enumeration order.
    pub fn chips(&self) -> &[CachedChip] {
        &self.chips
    }

    /// Replaces the cache with live chip data and persists it when it changed.
    pub fn refresh(&mut self, live: &[Chip]) {
        let fresh: Vec<CachedChip> = live.iter().map(CachedChip::from).collect();
        if fresh.is_empty() || fresh == self.chips {
            return;
        }
        self.chips = fresh;

        if !self.persist {
            return;
        }
        let Some(store) = &self.store else {
            return;
        };

        let records: Vec<StaticChipInfo> = self
            .chips
            .iter()
            .map(|c| StaticChipInfo::from_model(c.id, c.capabilities, &c.model))
            .collect();
        match static_info::encode(&records) {
            Ok(text) => match store.save(&text) {
                Ok(()) => log::debug!("CapabilityCache: Saved {} chip record(s)", records.len()),
                Err(e) => log::warn!("CapabilityCache: Failed to save chip records: {}", e),
            },
            Err(e) => log::error!("CapabilityCache: Failed to encode chip records: {}", e),
        }
    }
}

/// Union of the types any mode of the selected chips can host.
pub fn supported_types(chips: &[CachedChip], scope: Option<ChipId>) -> BTreeSet<IfaceType> {
    chips
        .iter()
        .filter(|c| scope.map_or(true, |id| c.id == id))
        .flat_map(|c| c.model.supported_types())
        .collect()
}

/// Whether any mode of any chip can hold `counts`.
pub fn can_support(chips: &[CachedChip], counts: &IfaceCounts) -> bool {
    chips.iter().any(|c| c.model.can_support(counts))
}
