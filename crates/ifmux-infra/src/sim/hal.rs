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

//! In-memory Wi-Fi HAL.
//!
//! [`SimulatedHal`] keeps chips, modes and interface objects in memory and
//! enforces the combination limits of the configured mode on every
//! creation, the way real firmware rejects an over-subscribed chip. Faults
//! can be injected per call, and every mutating call is recorded.

use ifmux_core::capability::ChipCapabilities;
use ifmux_core::combination::{ChipMode, CombinationModel, ModeId};
use ifmux_core::hal::{ChipId, HalError, HalResult, HalRevision, RttApi, RttControllerId, WifiHal};
use ifmux_core::iface::{HalIfaceKind, IfaceCounts, IfaceType};
use ifmux_core::static_info::{StaticChipInfo, StaticInfoError};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Description of a chip exposed by the simulated service.
#[derive(Debug, Clone)]
pub struct SimulatedChip {
    /// Hardware id.
    pub id: ChipId,
    /// Newest protocol revision the chip object implements.
    pub revision: HalRevision,
    /// Base capability bits.
    pub capabilities: ChipCapabilities,
    /// Bits reported by the revision 1.5 object. Defaults to the base bits.
    pub extended_capabilities: Option<ChipCapabilities>,
    /// Modes offered by the chip.
    pub modes: Vec<ChipMode>,
}

impl SimulatedChip {
    /// A chip with no capability bits and no modes.
    pub fn new(id: u32, revision: HalRevision) -> Self {
        Self {
            id: ChipId(id),
            revision,
            capabilities: ChipCapabilities::NONE,
            extended_capabilities: None,
            modes: Vec::new(),
        }
    }

    /// Sets the base capability bits.
    pub fn with_capabilities(mut self, capabilities: ChipCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Sets the bits reported by the revision 1.5 object.
    pub fn with_extended_capabilities(mut self, capabilities: ChipCapabilities) -> Self {
        self.extended_capabilities = Some(capabilities);
        self
    }

    /// Appends a mode.
    pub fn with_mode(mut self, mode: ChipMode) -> Self {
        self.modes.push(mode);
        self
    }

    /// Builds a chip from a persisted static record.
    pub fn from_static(info: &StaticChipInfo, revision: HalRevision) -> Result<Self, StaticInfoError> {
        Ok(Self {
            id: info.chip_id,
            revision,
            capabilities: info.chip_capabilities,
            extended_capabilities: None,
            modes: info.to_modes()?,
        })
    }
}

/// A mutating call received by the simulated service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalCall {
    /// `start`.
    Start,
    /// `stop`.
    Stop,
    /// `configure_chip`.
    Configure {
        /// Target chip.
        chip: ChipId,
        /// Requested mode.
        mode: ModeId,
    },
    /// `create_iface` or `create_bridged_ap_iface`.
    CreateIface {
        /// Target chip.
        chip: ChipId,
        /// Object kind.
        kind: HalIfaceKind,
        /// Whether the dedicated bridged AP call was used.
        bridged: bool,
        /// Assigned name.
        name: String,
    },
    /// `remove_iface`.
    RemoveIface {
        /// Target chip.
        chip: ChipId,
        /// Interface name.
        name: String,
    },
    /// `remove_bridged_ap_instance`.
    RemoveInstance {
        /// Target chip.
        chip: ChipId,
        /// Access point name.
        name: String,
        /// Removed instance.
        instance: String,
    },
    /// `create_rtt_controller`.
    CreateRttController {
        /// Target chip.
        chip: ChipId,
        /// Interface the controller is bound to.
        iface: String,
        /// API revision used.
        api: RttApi,
    },
}

/// How an injected removal fault behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalFault {
    /// The call fails and the interface survives.
    StillListed,
    /// The call fails but the interface is gone anyway.
    AlreadyGone,
}

#[derive(Debug, Default)]
struct Faults {
    start_not_available: u32,
    start_failure: bool,
    configure: bool,
    create: bool,
    removal: Option<RemovalFault>,
}

#[derive(Debug)]
struct SimIface {
    kind: HalIfaceKind,
    instances: Vec<String>,
}

impl SimIface {
    fn concurrency_type(&self) -> IfaceType {
        match self.kind {
            HalIfaceKind::Sta => IfaceType::Sta,
            HalIfaceKind::Ap if self.instances.len() >= 2 => IfaceType::ApBridged,
            HalIfaceKind::Ap => IfaceType::Ap,
            HalIfaceKind::P2p => IfaceType::P2p,
            HalIfaceKind::Nan => IfaceType::Nan,
        }
    }
}

#[derive(Debug)]
struct ChipState {
    desc: SimulatedChip,
    model: CombinationModel,
    current_mode: Option<ModeId>,
    ifaces: BTreeMap<String, SimIface>,
    next_index: u32,
}

impl ChipState {
    fn new(desc: SimulatedChip) -> Self {
        let model = CombinationModel::new(desc.modes.clone());
        Self {
            desc,
            model,
            current_mode: None,
            ifaces: BTreeMap::new(),
            next_index: 0,
        }
    }

    fn counts(&self) -> IfaceCounts {
        self.ifaces.values().map(SimIface::concurrency_type).collect()
    }

    fn require(&self, revision: HalRevision) -> HalResult<()> {
        if self.desc.revision >= revision {
            Ok(())
        } else {
            Err(HalError::NotSupported(self.desc.revision))
        }
    }

    fn reset(&mut self) {
        self.current_mode = None;
        self.ifaces.clear();
    }
}

#[derive(Debug, Clone)]
struct RttBinding {
    id: RttControllerId,
    chip: ChipId,
    iface: String,
}

#[derive(Debug)]
struct SimState {
    alive: bool,
    started: bool,
    chips: Vec<ChipState>,
    faults: Faults,
    rtt: Option<RttBinding>,
    next_rtt: u64,
    calls: Vec<HalCall>,
}

impl SimState {
    fn chip(&self, id: ChipId) -> HalResult<&ChipState> {
        self.chips
            .iter()
            .find(|c| c.desc.id == id)
            .ok_or_else(|| HalError::UnknownObject(id.to_string()))
    }

    fn chip_mut(&mut self, id: ChipId) -> HalResult<&mut ChipState> {
        self.chips
            .iter_mut()
            .find(|c| c.desc.id == id)
            .ok_or_else(|| HalError::UnknownObject(id.to_string()))
    }

    fn require_started(&self) -> HalResult<()> {
        if self.started {
            Ok(())
        } else {
            Err(HalError::Failure("service is stopped".into()))
        }
    }

    /// Drops the RTT controller if it was bound to a now missing interface.
    fn prune_rtt(&mut self) {
        let stale = match &self.rtt {
            Some(binding) => self
                .chip(binding.chip)
                .map(|c| !c.ifaces.contains_key(&binding.iface))
                .unwrap_or(true),
            None => false,
        };
        if stale {
            self.rtt = None;
        }
    }

    fn power_down(&mut self) {
        self.started = false;
        for chip in &mut self.chips {
            chip.reset();
        }
        self.rtt = None;
    }

    fn create(&mut self, chip: ChipId, kind: HalIfaceKind, bridged: bool) -> HalResult<String> {
        self.require_started()?;
        if std::mem::take(&mut self.faults.create) {
            return Err(HalError::Failure("injected create failure".into()));
        }

        let state = self.chip_mut(chip)?;
        let mode = state
            .current_mode
            .ok_or_else(|| HalError::Failure(format!("{} is not configured", chip)))?;

        let concurrency_type = match kind {
            HalIfaceKind::Sta => IfaceType::Sta,
            HalIfaceKind::Ap if bridged => IfaceType::ApBridged,
            HalIfaceKind::Ap => IfaceType::Ap,
            HalIfaceKind::P2p => IfaceType::P2p,
            HalIfaceKind::Nan => IfaceType::Nan,
        };
        let mut wanted = state.counts();
        wanted[concurrency_type] += 1;
        if !state.model.mode_supports(mode, &wanted) {
            return Err(HalError::Failure(format!(
                "{} in {} cannot hold {}",
                chip, mode, wanted
            )));
        }

        let prefix = match concurrency_type {
            IfaceType::Sta => "wlan",
            IfaceType::Ap => "ap",
            IfaceType::ApBridged => "ap_br",
            IfaceType::P2p => "p2p",
            IfaceType::Nan => "nan",
        };
        let name = format!("{}{}", prefix, state.next_index);
        state.next_index += 1;
        let instances = if bridged {
            vec![format!("{}_0", name), format!("{}_1", name)]
        } else {
            vec![name.clone()]
        };
        state.ifaces.insert(name.clone(), SimIface { kind, instances });

        log::debug!("SimHal: Created {} ({:?}) on {}", name, concurrency_type, chip);
        self.calls.push(HalCall::CreateIface {
            chip,
            kind,
            bridged,
            name: name.clone(),
        });
        Ok(name)
    }
}

/// In-memory implementation of [`WifiHal`].
#[derive(Debug)]
pub struct SimulatedHal {
    state: Mutex<SimState>,
}

impl SimulatedHal {
    /// A running service exposing `chips`, powered off.
    pub fn new(chips: Vec<SimulatedChip>) -> Self {
        Self {
            state: Mutex::new(SimState {
                alive: true,
                started: false,
                chips: chips.into_iter().map(ChipState::new).collect(),
                faults: Faults::default(),
                rtt: None,
                next_rtt: 1,
                calls: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live(&self) -> HalResult<MutexGuard<'_, SimState>> {
        let state = self.state();
        if state.alive {
            Ok(state)
        } else {
            Err(HalError::Disconnected)
        }
    }

    // ── Fault injection ──────────────────────────────────────────────────

    /// The next `count` start calls report [`HalError::NotAvailable`].
    pub fn fail_start_not_available(&self, count: u32) {
        self.state().faults.start_not_available = count;
    }

    /// The next start call fails outright.
    pub fn fail_next_start(&self) {
        self.state().faults.start_failure = true;
    }

    /// The next chip configuration fails.
    pub fn fail_next_configure(&self) {
        self.state().faults.configure = true;
    }

    /// The next interface creation fails.
    pub fn fail_next_create(&self) {
        self.state().faults.create = true;
    }

    /// The next interface removal fails as described by `fault`.
    pub fn fail_next_removal(&self, fault: RemovalFault) {
        self.state().faults.removal = Some(fault);
    }

    /// Removes an interface behind the manager's back.
    pub fn remove_externally(&self, chip: ChipId, name: &str) -> bool {
        let mut state = self.state();
        let removed = state
            .chip_mut(chip)
            .map(|c| c.ifaces.remove(name).is_some())
            .unwrap_or(false);
        state.prune_rtt();
        removed
    }

    /// Creates an interface behind the manager's back.
    pub fn create_externally(&self, chip: ChipId, kind: HalIfaceKind) -> HalResult<String> {
        let mut state = self.state();
        let name = state.create(chip, kind, false)?;
        state.calls.pop();
        Ok(name)
    }

    /// Invalidates the live RTT controller, if any.
    pub fn invalidate_rtt_controller(&self) {
        self.state().rtt = None;
    }

    pub(crate) fn set_alive(&self, alive: bool) {
        let mut state = self.state();
        if alive && !state.alive {
            state.power_down();
        }
        state.alive = alive;
    }

    // ── Inspection ───────────────────────────────────────────────────────

    /// Whether the service is powered on.
    pub fn is_started(&self) -> bool {
        self.state().started
    }

    /// Configured mode of a chip.
    pub fn mode_of(&self, chip: ChipId) -> Option<ModeId> {
        self.state().chip(chip).ok().and_then(|c| c.current_mode)
    }

    /// Names of every interface object on a chip.
    pub fn iface_names_of(&self, chip: ChipId) -> Vec<String> {
        self.state()
            .chip(chip)
            .map(|c| c.ifaces.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Physical instances of an access point.
    pub fn instances_of(&self, chip: ChipId, name: &str) -> Vec<String> {
        self.state()
            .chip(chip)
            .ok()
            .and_then(|c| c.ifaces.get(name).map(|i| i.instances.clone()))
            .unwrap_or_default()
    }

    /// The live RTT controller and the interface it is bound to.
    pub fn rtt_binding(&self) -> Option<(RttControllerId, String)> {
        self.state().rtt.as_ref().map(|b| (b.id, b.iface.clone()))
    }

    /// Every mutating call received so far.
    pub fn calls(&self) -> Vec<HalCall> {
        self.state().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

impl WifiHal for SimulatedHal {
    fn start(&self) -> HalResult<()> {
        let mut state = self.live()?;
        state.calls.push(HalCall::Start);
        if state.faults.start_not_available > 0 {
            state.faults.start_not_available -= 1;
            return Err(HalError::NotAvailable);
        }
        if std::mem::take(&mut state.faults.start_failure) {
            return Err(HalError::Failure("injected start failure".into()));
        }
        state.started = true;
        log::debug!("SimHal: Started");
        Ok(())
    }

    fn stop(&self) -> HalResult<()> {
        let mut state = self.live()?;
        state.calls.push(HalCall::Stop);
        state.power_down();
        log::debug!("SimHal: Stopped");
        Ok(())
    }

    fn chip_ids(&self) -> HalResult<Vec<ChipId>> {
        Ok(self.live()?.chips.iter().map(|c| c.desc.id).collect())
    }

    fn chip_revision(&self, chip: ChipId) -> HalResult<HalRevision> {
        Ok(self.live()?.chip(chip)?.desc.revision)
    }

    fn chip_capabilities(
        &self,
        chip: ChipId,
        revision: HalRevision,
    ) -> HalResult<ChipCapabilities> {
        let state = self.live()?;
        let chip = state.chip(chip)?;
        chip.require(revision)?;
        match revision {
            HalRevision::V1_5 => Ok(chip
                .desc
                .extended_capabilities
                .unwrap_or(chip.desc.capabilities)),
            _ => Ok(chip.desc.capabilities),
        }
    }

    fn available_modes(&self, chip: ChipId) -> HalResult<Vec<ChipMode>> {
        Ok(self.live()?.chip(chip)?.desc.modes.clone())
    }

    fn current_mode(&self, chip: ChipId) -> HalResult<Option<ModeId>> {
        Ok(self.live()?.chip(chip)?.current_mode)
    }

    fn configure_chip(&self, chip: ChipId, mode: ModeId) -> HalResult<()> {
        let mut state = self.live()?;
        state.require_started()?;
        state.calls.push(HalCall::Configure { chip, mode });
        if std::mem::take(&mut state.faults.configure) {
            return Err(HalError::Failure("injected configure failure".into()));
        }

        let target = state.chip_mut(chip)?;
        if target.model.mode(mode).is_none() {
            return Err(HalError::UnknownObject(mode.to_string()));
        }
        target.reset();
        target.current_mode = Some(mode);
        state.prune_rtt();
        log::debug!("SimHal: {} configured into {}", chip, mode);
        Ok(())
    }

    fn iface_names(&self, chip: ChipId, kind: HalIfaceKind) -> HalResult<Vec<String>> {
        let state = self.live()?;
        Ok(state
            .chip(chip)?
            .ifaces
            .iter()
            .filter(|(_, iface)| iface.kind == kind)
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn create_iface(&self, chip: ChipId, kind: HalIfaceKind) -> HalResult<String> {
        self.live()?.create(chip, kind, false)
    }

    fn create_bridged_ap_iface(&self, chip: ChipId) -> HalResult<String> {
        let mut state = self.live()?;
        state.chip(chip)?.require(HalRevision::V1_5)?;
        state.create(chip, HalIfaceKind::Ap, true)
    }

    fn bridged_ap_instances(&self, chip: ChipId, name: &str) -> HalResult<Vec<String>> {
        let state = self.live()?;
        let chip = state.chip(chip)?;
        chip.require(HalRevision::V1_5)?;
        match chip.ifaces.get(name) {
            Some(iface) if iface.kind == HalIfaceKind::Ap => Ok(iface.instances.clone()),
            _ => Err(HalError::UnknownObject(name.to_string())),
        }
    }

    fn remove_bridged_ap_instance(
        &self,
        chip: ChipId,
        name: &str,
        instance: &str,
    ) -> HalResult<()> {
        let mut state = self.live()?;
        let target = state.chip_mut(chip)?;
        target.require(HalRevision::V1_5)?;
        let iface = target
            .ifaces
            .get_mut(name)
            .filter(|i| i.kind == HalIfaceKind::Ap)
            .ok_or_else(|| HalError::UnknownObject(name.to_string()))?;
        let before = iface.instances.len();
        iface.instances.retain(|i| i != instance);
        if iface.instances.len() == before {
            return Err(HalError::UnknownObject(instance.to_string()));
        }
        state.calls.push(HalCall::RemoveInstance {
            chip,
            name: name.to_string(),
            instance: instance.to_string(),
        });
        Ok(())
    }

    fn remove_iface(&self, chip: ChipId, kind: HalIfaceKind, name: &str) -> HalResult<()> {
        let mut state = self.live()?;
        state.calls.push(HalCall::RemoveIface {
            chip,
            name: name.to_string(),
        });
        let fault = state.faults.removal.take();
        let target = state.chip_mut(chip)?;
        match target.ifaces.get(name) {
            Some(iface) if iface.kind == kind => {}
            _ => return Err(HalError::UnknownObject(name.to_string())),
        }

        match fault {
            Some(RemovalFault::StillListed) => {
                Err(HalError::Failure("injected removal failure".into()))
            }
            Some(RemovalFault::AlreadyGone) => {
                target.ifaces.remove(name);
                state.prune_rtt();
                Err(HalError::Failure("injected removal failure".into()))
            }
            None => {
                target.ifaces.remove(name);
                state.prune_rtt();
                log::debug!("SimHal: Removed {} on {}", name, chip);
                Ok(())
            }
        }
    }

    fn create_rtt_controller(
        &self,
        chip: ChipId,
        bound_iface: &str,
        api: RttApi,
    ) -> HalResult<RttControllerId> {
        let mut state = self.live()?;
        let target = state.chip(chip)?;
        let needed = match api {
            RttApi::V1_0 => HalRevision::V1_0,
            RttApi::V1_4 => HalRevision::V1_4,
            RttApi::V1_6 => HalRevision::V1_6,
        };
        target.require(needed)?;
        if !target.ifaces.contains_key(bound_iface) {
            return Err(HalError::UnknownObject(bound_iface.to_string()));
        }

        let id = RttControllerId(state.next_rtt);
        state.next_rtt += 1;
        state.rtt = Some(RttBinding {
            id,
            chip,
            iface: bound_iface.to_string(),
        });
        state.calls.push(HalCall::CreateRttController {
            chip,
            iface: bound_iface.to_string(),
            api,
        });
        Ok(id)
    }

    fn rtt_controller_bound_iface(&self, id: RttControllerId) -> HalResult<String> {
        let state = self.live()?;
        match &state.rtt {
            Some(binding) if binding.id == id => Ok(binding.iface.clone()),
            _ => Err(HalError::UnknownObject(format!("rtt controller {}", id.0))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifmux_core::combination::{Combination, ComboLimit};
    use IfaceType::*;

    fn sta_or_ap_chip(revision: HalRevision) -> SimulatedChip {
        SimulatedChip::new(0, revision)
            .with_mode(ChipMode::new(
                0,
                vec![Combination::new(vec![ComboLimit::new(1, vec![Sta])])],
            ))
            .with_mode(ChipMode::new(
                1,
                vec![Combination::new(vec![ComboLimit::new(1, vec![Ap, ApBridged])])],
            ))
    }

    fn started(chip: SimulatedChip) -> SimulatedHal {
        let hal = SimulatedHal::new(vec![chip]);
        hal.start().unwrap();
        hal
    }

    #[test]
    fn test_create_requires_configured_mode() {
        let hal = started(sta_or_ap_chip(HalRevision::V1_6));
        assert!(hal.create_iface(ChipId(0), HalIfaceKind::Sta).is_err());

        hal.configure_chip(ChipId(0), ModeId(0)).unwrap();
        let name = hal.create_iface(ChipId(0), HalIfaceKind::Sta).unwrap();
        assert_eq!(hal.iface_names_of(ChipId(0)), vec![name]);
    }

    #[test]
    fn test_create_enforces_combination_limits() {
        let hal = started(sta_or_ap_chip(HalRevision::V1_6));
        hal.configure_chip(ChipId(0), ModeId(0)).unwrap();
        hal.create_iface(ChipId(0), HalIfaceKind::Sta).unwrap();
        assert!(hal.create_iface(ChipId(0), HalIfaceKind::Sta).is_err());
        assert!(hal.create_iface(ChipId(0), HalIfaceKind::Ap).is_err());
    }

    #[test]
    fn test_configure_destroys_interfaces_and_rtt() {
        let hal = started(sta_or_ap_chip(HalRevision::V1_6));
        hal.configure_chip(ChipId(0), ModeId(0)).unwrap();
        let sta = hal.create_iface(ChipId(0), HalIfaceKind::Sta).unwrap();
        let id = hal
            .create_rtt_controller(ChipId(0), &sta, RttApi::V1_6)
            .unwrap();
        assert_eq!(hal.rtt_controller_bound_iface(id).unwrap(), sta);

        hal.configure_chip(ChipId(0), ModeId(1)).unwrap();
        assert!(hal.iface_names_of(ChipId(0)).is_empty());
        assert!(hal.rtt_controller_bound_iface(id).is_err());
    }

    #[test]
    fn test_bridged_ap_has_two_instances_and_can_shed_one() {
        let hal = started(sta_or_ap_chip(HalRevision::V1_5));
        hal.configure_chip(ChipId(0), ModeId(1)).unwrap();
        let ap = hal.create_bridged_ap_iface(ChipId(0)).unwrap();
        let instances = hal.bridged_ap_instances(ChipId(0), &ap).unwrap();
        assert_eq!(instances.len(), 2);

        hal.remove_bridged_ap_instance(ChipId(0), &ap, &instances[1])
            .unwrap();
        assert_eq!(hal.instances_of(ChipId(0), &ap), vec![instances[0].clone()]);
    }

    #[test]
    fn test_old_revision_rejects_revision_1_5_calls() {
        let hal = started(sta_or_ap_chip(HalRevision::V1_4));
        hal.configure_chip(ChipId(0), ModeId(1)).unwrap();
        assert_eq!(
            hal.create_bridged_ap_iface(ChipId(0)),
            Err(HalError::NotSupported(HalRevision::V1_4))
        );
        assert!(hal
            .chip_capabilities(ChipId(0), HalRevision::V1_5)
            .is_err());
        assert!(hal
            .create_rtt_controller(ChipId(0), "wlan0", RttApi::V1_6)
            .is_err());
    }

    #[test]
    fn test_start_not_available_then_succeeds() {
        let hal = SimulatedHal::new(vec![sta_or_ap_chip(HalRevision::V1_6)]);
        hal.fail_start_not_available(2);
        assert_eq!(hal.start(), Err(HalError::NotAvailable));
        assert_eq!(hal.start(), Err(HalError::NotAvailable));
        assert_eq!(hal.start(), Ok(()));
        assert!(hal.is_started());
    }

    #[test]
    fn test_removal_faults() {
        let hal = started(sta_or_ap_chip(HalRevision::V1_6));
        hal.configure_chip(ChipId(0), ModeId(0)).unwrap();
        let sta = hal.create_iface(ChipId(0), HalIfaceKind::Sta).unwrap();

        hal.fail_next_removal(RemovalFault::StillListed);
        assert!(hal.remove_iface(ChipId(0), HalIfaceKind::Sta, &sta).is_err());
        assert_eq!(hal.iface_names_of(ChipId(0)), vec![sta.clone()]);

        hal.fail_next_removal(RemovalFault::AlreadyGone);
        assert!(hal.remove_iface(ChipId(0), HalIfaceKind::Sta, &sta).is_err());
        assert!(hal.iface_names_of(ChipId(0)).is_empty());
    }

    #[test]
    fn test_dead_service_reports_disconnected() {
        let hal = started(sta_or_ap_chip(HalRevision::V1_6));
        hal.set_alive(false);
        assert_eq!(hal.chip_ids(), Err(HalError::Disconnected));

        hal.set_alive(true);
        assert!(!hal.is_started());
        assert_eq!(hal.chip_ids(), Ok(vec![ChipId(0)]));
    }

    #[test]
    fn test_calls_are_recorded() {
        let hal = started(sta_or_ap_chip(HalRevision::V1_6));
        hal.configure_chip(ChipId(0), ModeId(0)).unwrap();
        assert_eq!(
            hal.calls(),
            vec![
                HalCall::Start,
                HalCall::Configure {
                    chip: ChipId(0),
                    mode: ModeId(0)
                }
            ]
        );
        hal.clear_calls();
        assert!(hal.calls().is_empty());
    }
}
