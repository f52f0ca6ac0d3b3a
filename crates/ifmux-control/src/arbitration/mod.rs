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

//! The interface arbitration solver.
//!
//! Given a snapshot of every started chip (mode, live interfaces with their
//! owners' ranks) and a request, the [`Arbiter`] searches every chip, mode
//! and expanded combination for the cheapest way to make room:
//!
//! 1. Chips lacking the required capability bits are skipped entirely.
//! 2. Modes are visited current first, then in declaration order.
//! 3. A vector that cannot hold one interface of the requested type is
//!    skipped.
//! 4. Switching modes destroys every interface of the chip, so all of them
//!    must be evictable.
//! 5. Staying in the current mode first shrinks bridged APs when the vector
//!    has room for plain APs, then destroys the per-type excess.
//!
//! Proposals are ranked by [`ProposalCost`]. On a full tie the first
//! proposal found wins.
//!
//! The solver is pure: it never talks to the HAL and never mutates state.

mod selection;

pub use selection::{select_downgrades, select_removals, ProposalCost};

use ifmux_core::capability::ChipCapabilities;
use ifmux_core::combination::{CombinationModel, ModeId};
use ifmux_core::hal::ChipId;
use ifmux_core::iface::{IfaceCounts, IfaceType};
use ifmux_core::requestor::{PriorityPolicy, PriorityRank, Requestor};

/// A live interface as the solver sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveIface {
    /// Interface name.
    pub name: String,
    /// Type used for combination matching. A bridged AP backed by fewer
    /// than two instances counts as a plain AP.
    pub effective_type: IfaceType,
    /// Current owner.
    pub requestor: Requestor,
    /// Owner's rank at the time of the decision.
    pub rank: PriorityRank,
    /// Creation sequence number; higher is younger.
    pub seq: u64,
    /// Physical instances backing the interface (bridged APs only).
    pub instances: usize,
}

/// Snapshot of one started chip.
#[derive(Debug, Clone)]
pub struct ChipView {
    /// Chip id.
    pub chip: ChipId,
    /// Capability bits the request is checked against.
    pub capabilities: ChipCapabilities,
    /// Mode catalogue of the chip.
    pub model: CombinationModel,
    /// Configured mode.
    pub current_mode: Option<ModeId>,
    /// Whether bridged APs on this chip can shed instances.
    pub can_downgrade: bool,
    /// Live interfaces.
    pub ifaces: Vec<LiveIface>,
}

/// A request under evaluation.
#[derive(Debug, Clone)]
pub struct IfaceRequest {
    /// Requested type.
    pub iface_type: IfaceType,
    /// Capability bits the hosting chip must advertise.
    pub required: ChipCapabilities,
    /// Requesting identity.
    pub requestor: Requestor,
    /// Requestor's rank at the time of the decision.
    pub rank: PriorityRank,
}

/// The cheapest way found to host a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Chip that will host the interface.
    pub chip: ChipId,
    /// Mode the chip must be in.
    pub mode: ModeId,
    /// Whether the chip must be reconfigured.
    pub mode_change: bool,
    /// Interfaces to destroy.
    pub removals: Vec<LiveIface>,
    /// Bridged APs to shrink to one instance.
    pub downgrades: Vec<LiveIface>,
    /// Ranking key.
    pub cost: ProposalCost,
}

/// Searches chips, modes and combinations for the cheapest proposal.
#[derive(Debug, Clone, Copy)]
pub struct Arbiter {
    policy: PriorityPolicy,
    allow_downgrade: bool,
}

impl Arbiter {
    /// Creates an arbiter enforcing `policy`.
    pub fn new(policy: PriorityPolicy, allow_downgrade: bool) -> Self {
        Self {
            policy,
            allow_downgrade,
        }
    }

    /// The eviction policy in force.
    pub fn policy(&self) -> &PriorityPolicy {
        &self.policy
    }

    /// Returns the cheapest proposal, or `None` if the request is infeasible.
    pub fn solve(&self, chips: &[ChipView], request: &IfaceRequest) -> Option<Proposal> {
        log::debug!(
            "Arbiter: Solving {} for {} (rank={}) over {} chip(s)",
            request.iface_type,
            request.requestor,
            request.rank,
            chips.len()
        );

        let mut best: Option<Proposal> = None;

        for view in chips {
            // ── 1. Capability gate ───────────────────────────────────────
            if !view.capabilities.contains(request.required) {
                log::trace!(
                    "Arbiter: {} lacks capabilities {} (has {})",
                    view.chip,
                    request.required,
                    view.capabilities
                );
                continue;
            }

            // ── 2. Mode order: current first ─────────────────────────────
            let mut modes: Vec<ModeId> = Vec::new();
            if let Some(current) = view.current_mode {
                if view.model.mode(current).is_some() {
                    modes.push(current);
                }
            }
            modes.extend(
                view.model
                    .modes()
                    .map(|m| m.id)
                    .filter(|id| Some(*id) != view.current_mode),
            );

            // ── 3. Every expanded vector of every mode ───────────────────
            for mode in modes {
                let mode_change = Some(mode) != view.current_mode;
                for bound in view.model.bounds(mode) {
                    if bound[request.iface_type] == 0 {
                        continue;
                    }

                    let candidate = if mode_change {
                        self.propose_mode_switch(view, mode, request)
                    } else {
                        self.propose_in_mode(view, mode, bound, request)
                    };

                    if let Some(candidate) = candidate {
                        let better = best.as_ref().map_or(true, |b| candidate.cost < b.cost);
                        if better {
                            log::trace!(
                                "Arbiter: New best on {} {}: {:?}",
                                view.chip,
                                mode,
                                candidate.cost
                            );
                            best = Some(candidate);
                        }
                    }
                }
            }
        }

        match &best {
            Some(p) => log::debug!(
                "Arbiter: {} on {} {} (mode_change={}, removals={}, downgrades={})",
                request.iface_type,
                p.chip,
                p.mode,
                p.mode_change,
                p.removals.len(),
                p.downgrades.len()
            ),
            None => log::debug!(
                "Arbiter: {} for {} is infeasible",
                request.iface_type,
                request.requestor
            ),
        }
        best
    }

    fn propose_mode_switch(
        &self,
        view: &ChipView,
        mode: ModeId,
        request: &IfaceRequest,
    ) -> Option<Proposal> {
        if !view
            .ifaces
            .iter()
            .all(|iface| selection::evictable(&self.policy, request, iface))
        {
            return None;
        }

        let removals = view.ifaces.clone();
        Some(Proposal {
            chip: view.chip,
            mode,
            mode_change: true,
            cost: ProposalCost::new(&removals, 0, true),
            removals,
            downgrades: Vec::new(),
        })
    }

    fn propose_in_mode(
        &self,
        view: &ChipView,
        mode: ModeId,
        bound: &IfaceCounts,
        request: &IfaceRequest,
    ) -> Option<Proposal> {
        let mut counts: IfaceCounts = view.ifaces.iter().map(|i| i.effective_type).collect();
        counts[request.iface_type] += 1;

        // ── Bridged AP downgrades ────────────────────────────────────────
        let mut downgrades = Vec::new();
        if self.allow_downgrade
            && view.can_downgrade
            && counts[IfaceType::ApBridged] > bound[IfaceType::ApBridged]
        {
            let excess = counts[IfaceType::ApBridged] - bound[IfaceType::ApBridged];
            let ap_room = bound[IfaceType::Ap].saturating_sub(counts[IfaceType::Ap]);
            let limit = excess.min(ap_room) as usize;
            downgrades = select_downgrades(&self.policy, request, limit, &view.ifaces);
            let shrunk = downgrades.len() as u32;
            counts[IfaceType::ApBridged] -= shrunk;
            counts[IfaceType::Ap] += shrunk;
        }

        // ── Per-type excess ──────────────────────────────────────────────
        let mut removals = Vec::new();
        for ty in IfaceType::ALL {
            if counts[ty] <= bound[ty] {
                continue;
            }
            let excess = (counts[ty] - bound[ty]) as usize;
            let candidates: Vec<&LiveIface> = view
                .ifaces
                .iter()
                .filter(|i| i.effective_type == ty)
                .filter(|i| !downgrades.iter().any(|d| d.name == i.name))
                .collect();
            removals.extend(select_removals(&self.policy, request, excess, &candidates)?);
        }

        Some(Proposal {
            chip: view.chip,
            mode,
            mode_change: false,
            cost: ProposalCost::new(&removals, downgrades.len(), false),
            removals,
            downgrades,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifmux_core::combination::{ChipMode, Combination, ComboLimit};
    use IfaceType::*;

    const BG: PriorityRank = 10;
    const FG: PriorityRank = 20;
    const PRIV: PriorityRank = 40;

    fn limit(max: u32, types: &[IfaceType]) -> ComboLimit {
        ComboLimit::new(max, types.to_vec())
    }

    fn mode(id: u32, limits: Vec<ComboLimit>) -> ChipMode {
        ChipMode::new(id, vec![Combination::new(limits)])
    }

    /// Mode 0: 1xSTA + 1x{P2P, NAN}. Mode 1: 1xAP.
    fn sta_ap_model() -> CombinationModel {
        CombinationModel::new(vec![
            mode(0, vec![limit(1, &[Sta]), limit(1, &[P2p, Nan])]),
            mode(1, vec![limit(1, &[Ap])]),
        ])
    }

    fn live(name: &str, ty: IfaceType, owner: u32, rank: PriorityRank, seq: u64) -> LiveIface {
        LiveIface {
            name: name.to_string(),
            effective_type: ty,
            requestor: Requestor::new(owner, "owner"),
            rank,
            seq,
            instances: if ty == ApBridged { 2 } else { 1 },
        }
    }

    fn view(model: CombinationModel, current: Option<u32>, ifaces: Vec<LiveIface>) -> ChipView {
        ChipView {
            chip: ChipId(0),
            capabilities: ChipCapabilities::NONE,
            model,
            current_mode: current.map(ModeId),
            can_downgrade: true,
            ifaces,
        }
    }

    fn request(ty: IfaceType, owner: u32, rank: PriorityRank) -> IfaceRequest {
        IfaceRequest {
            iface_type: ty,
            required: ChipCapabilities::NONE,
            requestor: Requestor::new(owner, "owner"),
            rank,
        }
    }

    fn arbiter() -> Arbiter {
        Arbiter::new(PriorityPolicy::default(), true)
    }

    #[test]
    fn test_empty_chip_is_configured_without_removals() {
        let chips = [view(sta_ap_model(), None, vec![])];
        let p = arbiter().solve(&chips, &request(Sta, 1, PRIV)).unwrap();
        assert_eq!(p.mode, ModeId(0));
        assert!(p.mode_change);
        assert!(p.removals.is_empty());
    }

    #[test]
    fn test_current_mode_wins_when_free() {
        // Both modes could host a NAN; the current one needs nothing.
        let model = CombinationModel::new(vec![
            mode(0, vec![limit(1, &[Nan])]),
            mode(1, vec![limit(1, &[Sta]), limit(1, &[Nan])]),
        ]);
        let chips = [view(model, Some(1), vec![live("wlan0", Sta, 1, FG, 1)])];
        let p = arbiter().solve(&chips, &request(Nan, 2, FG)).unwrap();
        assert_eq!(p.mode, ModeId(1));
        assert!(!p.mode_change);
        assert!(p.removals.is_empty());
    }

    #[test]
    fn test_mode_switch_removes_everything() {
        let chips = [view(sta_ap_model(), Some(0), vec![live("wlan0", Sta, 1, PRIV, 1)])];
        let p = arbiter().solve(&chips, &request(Ap, 1, PRIV)).unwrap();
        assert_eq!(p.mode, ModeId(1));
        assert!(p.mode_change);
        assert_eq!(p.removals.len(), 1);
        assert_eq!(p.removals[0].name, "wlan0");
    }

    #[test]
    fn test_mode_switch_needs_every_interface_evictable() {
        let chips = [view(
            sta_ap_model(),
            Some(0),
            vec![live("wlan0", Sta, 1, BG, 1), live("p2p0", P2p, 2, PRIV, 2)],
        )];
        assert!(arbiter().solve(&chips, &request(Ap, 3, FG)).is_none());
    }

    #[test]
    fn test_priority_invariant_both_directions() {
        let single_sta = || CombinationModel::new(vec![mode(0, vec![limit(1, &[Sta])])]);

        let chips = [view(single_sta(), Some(0), vec![live("wlan0", Sta, 2, BG, 1)])];
        let p = arbiter().solve(&chips, &request(Sta, 1, FG)).unwrap();
        assert_eq!(p.removals[0].name, "wlan0");

        let chips = [view(single_sta(), Some(0), vec![live("wlan0", Sta, 1, FG, 1)])];
        assert!(arbiter().solve(&chips, &request(Sta, 2, BG)).is_none());
    }

    #[test]
    fn test_keep_oldest_among_equals() {
        let model = CombinationModel::new(vec![mode(0, vec![limit(2, &[Sta])])]);
        let chips = [view(
            model,
            Some(0),
            vec![live("old", Sta, 1, BG, 1), live("young", Sta, 2, BG, 2)],
        )];
        let p = arbiter().solve(&chips, &request(Sta, 3, PRIV)).unwrap();
        assert_eq!(p.removals.len(), 1);
        assert_eq!(p.removals[0].name, "young");
    }

    #[test]
    fn test_switches_mode_when_current_cannot_host_type() {
        let model = CombinationModel::new(vec![
            mode(0, vec![limit(2, &[Sta]), limit(1, &[Nan])]),
            mode(1, vec![limit(1, &[Sta]), limit(1, &[Ap])]),
        ]);
        let chips = [view(model, Some(0), vec![live("wlan0", Sta, 1, BG, 1)])];
        let p = arbiter().solve(&chips, &request(Ap, 2, PRIV)).unwrap();
        assert!(p.mode_change);
        assert_eq!(p.mode, ModeId(1));
    }

    #[test]
    fn test_bridged_ap_is_downgraded_instead_of_removed() {
        // One mode: {1xAP_BRIDGED} or {1xAP + 1xSTA}.
        let model = CombinationModel::new(vec![ChipMode::new(
            0,
            vec![
                Combination::new(vec![limit(1, &[ApBridged])]),
                Combination::new(vec![limit(1, &[Ap]), limit(1, &[Sta])]),
            ],
        )]);
        let chips = [view(model, Some(0), vec![live("ap0", ApBridged, 1, BG, 1)])];
        let p = arbiter().solve(&chips, &request(Sta, 2, FG)).unwrap();
        assert!(p.removals.is_empty());
        assert_eq!(p.downgrades.len(), 1);
        assert_eq!(p.downgrades[0].name, "ap0");

        let no_downgrade = Arbiter::new(PriorityPolicy::default(), false);
        let p = no_downgrade.solve(&chips, &request(Sta, 2, FG)).unwrap();
        assert!(p.downgrades.is_empty());
        assert_eq!(p.removals[0].name, "ap0");
    }

    #[test]
    fn test_capability_gate_excludes_chip() {
        let mut plain = view(sta_ap_model(), None, vec![]);
        plain.chip = ChipId(0);
        let mut gifted = view(sta_ap_model(), None, vec![]);
        gifted.chip = ChipId(1);
        gifted.capabilities = ChipCapabilities::INFRA_60G;

        let mut req = request(Sta, 1, FG);
        req.required = ChipCapabilities::INFRA_60G;
        let p = arbiter().solve(&[plain.clone(), gifted], &req).unwrap();
        assert_eq!(p.chip, ChipId(1));

        assert!(arbiter().solve(&[plain], &req).is_none());
    }

    #[test]
    fn test_tie_keeps_first_chip() {
        let mut a = view(sta_ap_model(), None, vec![]);
        a.chip = ChipId(4);
        let mut b = view(sta_ap_model(), None, vec![]);
        b.chip = ChipId(2);
        let p = arbiter().solve(&[a, b], &request(Sta, 1, FG)).unwrap();
        assert_eq!(p.chip, ChipId(4));
    }

    #[test]
    fn test_unknown_type_is_infeasible() {
        let chips = [view(sta_ap_model(), None, vec![])];
        assert!(arbiter().solve(&chips, &request(ApBridged, 1, PRIV)).is_none());
    }
}
