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

//! Per-chip routing of revision-specific HAL calls.

use super::{ChipId, HalResult, HalRevision, RttControllerId, WifiHal};
use crate::capability::ChipCapabilities;
use crate::iface::IfaceType;

/// RTT controller API revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RttApi {
    /// Original controller.
    V1_0,
    /// Revision 1.4 controller.
    V1_4,
    /// Revision 1.6 controller.
    V1_6,
}

/// Routing table for one chip, resolved once from its protocol revision.
///
/// Callers ask for an operation; `ChipOps` picks the newest variant the chip
/// implements and falls back to the generic call otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipOps {
    chip: ChipId,
    revision: HalRevision,
}

impl ChipOps {
    /// Queries the chip revision and builds its routing table.
    pub fn resolve(hal: &dyn WifiHal, chip: ChipId) -> HalResult<Self> {
        let revision = hal.chip_revision(chip)?;
        log::debug!("ChipOps: {} resolved to {:?}", chip, revision);
        Ok(Self::new(chip, revision))
    }

    /// Builds a routing table for a known revision.
    pub const fn new(chip: ChipId, revision: HalRevision) -> Self {
        Self { chip, revision }
    }

    /// The chip this table routes for.
    pub const fn chip(&self) -> ChipId {
        self.chip
    }

    /// The chip's newest protocol revision.
    pub const fn revision(&self) -> HalRevision {
        self.revision
    }

    /// Returns `true` if bridged access points have a dedicated creation call
    /// and can shed instances.
    pub fn supports_bridged_ap(&self) -> bool {
        self.revision >= HalRevision::V1_5
    }

    /// The RTT controller API used for this chip.
    pub fn rtt_api(&self) -> RttApi {
        match self.revision {
            HalRevision::V1_6 => RttApi::V1_6,
            HalRevision::V1_4 | HalRevision::V1_5 => RttApi::V1_4,
            HalRevision::V1_0 => RttApi::V1_0,
        }
    }

    /// Base capability bits.
    pub fn capabilities(&self, hal: &dyn WifiHal) -> HalResult<ChipCapabilities> {
        hal.chip_capabilities(self.chip, HalRevision::V1_0)
    }

    /// Capability bits from the revision 1.5 object, when implemented.
    pub fn extended_capabilities(&self, hal: &dyn WifiHal) -> HalResult<Option<ChipCapabilities>> {
        if self.revision >= HalRevision::V1_5 {
            hal.chip_capabilities(self.chip, HalRevision::V1_5).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Creates an interface of `ty`, routing bridged access points to the
    /// dedicated call when available.
    pub fn create_iface(&self, hal: &dyn WifiHal, ty: IfaceType) -> HalResult<String> {
        match ty {
            IfaceType::ApBridged if self.supports_bridged_ap() => {
                hal.create_bridged_ap_iface(self.chip)
            }
            IfaceType::ApBridged => {
                log::warn!(
                    "ChipOps: {} ({:?}) has no bridged AP call, creating a plain AP",
                    self.chip,
                    self.revision
                );
                hal.create_iface(self.chip, ty.hal_kind())
            }
            _ => hal.create_iface(self.chip, ty.hal_kind()),
        }
    }

    /// Creates an RTT controller through the newest API of the chip.
    pub fn create_rtt_controller(
        &self,
        hal: &dyn WifiHal,
        bound_iface: &str,
    ) -> HalResult<RttControllerId> {
        hal.create_rtt_controller(self.chip, bound_iface, self.rtt_api())
    }
}
