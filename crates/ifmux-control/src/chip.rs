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

//! Live state of a powered-on chip.

use ifmux_core::capability::ChipCapabilities;
use ifmux_core::combination::{CombinationModel, ModeId};
use ifmux_core::hal::{ChipId, ChipOps, HalResult, WifiHal};
use ifmux_core::iface::IfaceType;

/// A chip as seen after power-on.
#[derive(Debug, Clone)]
pub struct Chip {
    /// Revision routing table.
    pub ops: ChipOps,
    /// Base capability bits.
    pub capabilities: ChipCapabilities,
    /// Capability bits of the revision 1.5 object, when implemented.
    pub extended_capabilities: Option<ChipCapabilities>,
    /// Modes and their expanded combinations.
    pub model: CombinationModel,
    /// Configured mode, `None` until the first configuration.
    pub current_mode: Option<ModeId>,
    /// First mode able to host a station, where an RTT controller may live.
    pub rtt_mode: Option<ModeId>,
}

impl Chip {
    /// Queries revision, capabilities, modes and current mode of a chip.
    pub fn query(hal: &dyn WifiHal, id: ChipId) -> HalResult<Self> {
        let ops = ChipOps::resolve(hal, id)?;
        let capabilities = ops.capabilities(hal)?;
        let extended_capabilities = ops.extended_capabilities(hal)?;
        let model = CombinationModel::new(hal.available_modes(id)?);
        let current_mode = hal.current_mode(id)?;
        Ok(Self::new(
            ops,
            capabilities,
            extended_capabilities,
            model,
            current_mode,
        ))
    }

    /// Assembles a chip from already known parts.
    pub fn new(
        ops: ChipOps,
        capabilities: ChipCapabilities,
        extended_capabilities: Option<ChipCapabilities>,
        model: CombinationModel,
        current_mode: Option<ModeId>,
    ) -> Self {
        let rtt_mode = model.first_mode_supporting(IfaceType::Sta);
        Self {
            ops,
            capabilities,
            extended_capabilities,
            model,
            current_mode,
            rtt_mode,
        }
    }

    /// Hardware id.
    pub fn id(&self) -> ChipId {
        self.ops.chip()
    }

    /// Capability bits a request for `ty` is checked against.
    ///
    /// Bridged access points on revision 1.5 and newer are checked against
    /// the revision 1.5 object.
    pub fn capabilities_for(&self, ty: IfaceType) -> ChipCapabilities {
        match (ty, self.extended_capabilities) {
            (IfaceType::ApBridged, Some(extended)) if self.ops.supports_bridged_ap() => extended,
            _ => self.capabilities,
        }
    }

    /// Returns `true` when the chip sits in its RTT-eligible mode.
    pub fn in_rtt_mode(&self) -> bool {
        self.rtt_mode.is_some() && self.current_mode == self.rtt_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifmux_core::combination::{ChipMode, Combination, ComboLimit};
    use ifmux_core::hal::HalRevision;

    fn chip(revision: HalRevision, current: Option<u32>) -> Chip {
        let model = CombinationModel::new(vec![
            ChipMode::new(3, vec![Combination::new(vec![ComboLimit::new(1, vec![IfaceType::Ap])])]),
            ChipMode::new(7, vec![Combination::new(vec![ComboLimit::new(1, vec![IfaceType::Sta])])]),
        ]);
        Chip::new(
            ChipOps::new(ChipId(0), revision),
            ChipCapabilities::NONE,
            Some(ChipCapabilities::BRIDGED_AP),
            model,
            current.map(ModeId),
        )
    }

    #[test]
    fn test_rtt_mode_is_first_mode_with_station() {
        assert_eq!(chip(HalRevision::V1_6, None).rtt_mode, Some(ModeId(7)));
        assert!(!chip(HalRevision::V1_6, None).in_rtt_mode());
        assert!(!chip(HalRevision::V1_6, Some(3)).in_rtt_mode());
        assert!(chip(HalRevision::V1_6, Some(7)).in_rtt_mode());
    }

    #[test]
    fn test_bridged_requests_use_extended_capabilities() {
        let modern = chip(HalRevision::V1_5, None);
        assert_eq!(modern.capabilities_for(IfaceType::ApBridged), ChipCapabilities::BRIDGED_AP);
        assert_eq!(modern.capabilities_for(IfaceType::Sta), ChipCapabilities::NONE);

        let legacy = chip(HalRevision::V1_4, None);
        assert_eq!(legacy.capabilities_for(IfaceType::ApBridged), ChipCapabilities::NONE);
    }
}
