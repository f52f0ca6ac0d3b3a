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

//! Victim selection and proposal ranking.

use super::{IfaceRequest, LiveIface};
use ifmux_core::iface::IfaceType;
use ifmux_core::requestor::{PriorityPolicy, PriorityRank};
use std::cmp::Reverse;

/// Cost of a proposal. Compared lexicographically, lower is better.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProposalCost {
    /// Number of interfaces destroyed.
    pub removed: usize,
    /// Ranks of the destroyed interfaces, highest first.
    pub ranks: Vec<PriorityRank>,
    /// Number of bridged access points shrunk to one instance.
    pub downgrades: usize,
    /// Whether the chip must switch modes.
    pub mode_change: bool,
    /// Creation order of the destroyed interfaces. Destroying younger
    /// interfaces compares lower.
    pub ages: Vec<Reverse<u64>>,
}

impl ProposalCost {
    /// Computes the cost of destroying `removals`.
    pub fn new(removals: &[LiveIface], downgrades: usize, mode_change: bool) -> Self {
        let mut ranks: Vec<PriorityRank> = removals.iter().map(|i| i.rank).collect();
        ranks.sort_unstable_by(|a, b| b.cmp(a));

        let mut seqs: Vec<u64> = removals.iter().map(|i| i.seq).collect();
        seqs.sort_unstable();

        Self {
            removed: removals.len(),
            ranks,
            downgrades,
            mode_change,
            ages: seqs.into_iter().map(Reverse).collect(),
        }
    }
}

/// Returns `true` if `request` may tear down `iface`.
pub fn evictable(policy: &PriorityPolicy, request: &IfaceRequest, iface: &LiveIface) -> bool {
    policy.may_evict(&request.requestor, request.rank, &iface.requestor, iface.rank)
}

/// Picks `excess` interfaces to destroy among `candidates`.
///
/// Candidates the request may not evict are discarded. The rest are taken
/// from the lowest rank upward, newest first within a rank. Returns `None`
/// when fewer than `excess` interfaces are evictable.
pub fn select_removals(
    policy: &PriorityPolicy,
    request: &IfaceRequest,
    excess: usize,
    candidates: &[&LiveIface],
) -> Option<Vec<LiveIface>> {
    let mut pool: Vec<&LiveIface> = candidates
        .iter()
        .copied()
        .filter(|iface| evictable(policy, request, iface))
        .collect();

    if pool.len() < excess {
        log::trace!(
            "Arbiter: Only {} of {} needed interfaces are evictable",
            pool.len(),
            excess
        );
        return None;
    }

    pool.sort_by(|a, b| a.rank.cmp(&b.rank).then(b.seq.cmp(&a.seq)));
    Some(pool.into_iter().take(excess).cloned().collect())
}

/// Picks up to `limit` bridged access points to shrink, newest first.
///
/// Only bridged APs with more than one instance that the request may evict
/// are eligible.
pub fn select_downgrades(
    policy: &PriorityPolicy,
    request: &IfaceRequest,
    limit: usize,
    ifaces: &[LiveIface],
) -> Vec<LiveIface> {
    let mut pool: Vec<&LiveIface> = ifaces
        .iter()
        .filter(|iface| iface.effective_type == IfaceType::ApBridged && iface.instances > 1)
        .filter(|iface| evictable(policy, request, iface))
        .collect();
    pool.sort_by(|a, b| b.seq.cmp(&a.seq));
    pool.into_iter().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifmux_core::requestor::Requestor;

    fn iface(name: &str, owner: u32, rank: PriorityRank, seq: u64) -> LiveIface {
        LiveIface {
            name: name.to_string(),
            effective_type: IfaceType::Sta,
            requestor: Requestor::new(owner, name),
            rank,
            seq,
            instances: 1,
        }
    }

    fn request(rank: PriorityRank) -> IfaceRequest {
        IfaceRequest {
            iface_type: IfaceType::Sta,
            required: Default::default(),
            requestor: Requestor::new(100, "new"),
            rank,
        }
    }

    #[test]
    fn test_lowest_rank_goes_first_then_newest() {
        let policy = PriorityPolicy::default();
        let old_bg = iface("old_bg", 1, 10, 1);
        let new_bg = iface("new_bg", 2, 10, 5);
        let fg = iface("fg", 3, 20, 0);
        let candidates = [&fg, &old_bg, &new_bg];

        let picked = select_removals(&policy, &request(30), 2, &candidates).unwrap();
        let names: Vec<&str> = picked.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["new_bg", "old_bg"]);
    }

    #[test]
    fn test_not_enough_evictable_is_infeasible() {
        let policy = PriorityPolicy::default();
        let bg = iface("bg", 1, 10, 1);
        let sys = iface("sys", 2, 30, 2);
        assert!(select_removals(&policy, &request(20), 2, &[&bg, &sys]).is_none());
        assert!(select_removals(&policy, &request(20), 1, &[&bg, &sys]).is_some());
    }

    #[test]
    fn test_zero_excess_selects_nothing() {
        let policy = PriorityPolicy::default();
        let picked = select_removals(&policy, &request(10), 0, &[]).unwrap();
        assert!(picked.is_empty());
    }

    #[test]
    fn test_cost_prefers_fewer_then_lower_ranks() {
        let one_high = ProposalCost::new(&[iface("a", 1, 30, 1)], 0, false);
        let two_low = ProposalCost::new(&[iface("b", 2, 10, 2), iface("c", 3, 10, 3)], 0, false);
        let one_low = ProposalCost::new(&[iface("d", 4, 10, 4)], 0, false);
        assert!(one_low < one_high);
        assert!(one_high < two_low);
    }

    #[test]
    fn test_cost_prefers_same_mode_and_younger_victims() {
        let empty_switch = ProposalCost::new(&[], 0, true);
        let empty_stay = ProposalCost::new(&[], 0, false);
        assert!(empty_stay < empty_switch);

        let downgrade = ProposalCost::new(&[], 1, false);
        assert!(downgrade < empty_switch);
        assert!(empty_stay < downgrade);

        let old = ProposalCost::new(&[iface("old", 1, 10, 1)], 0, false);
        let young = ProposalCost::new(&[iface("young", 2, 10, 9)], 0, false);
        assert!(young < old);
    }

    #[test]
    fn test_downgrades_need_several_instances() {
        let policy = PriorityPolicy::default();
        let mut single = iface("ap0", 1, 10, 1);
        single.effective_type = IfaceType::ApBridged;
        let mut dual_old = iface("ap1", 2, 10, 2);
        dual_old.effective_type = IfaceType::ApBridged;
        dual_old.instances = 2;
        let mut dual_new = iface("ap2", 3, 10, 3);
        dual_new.effective_type = IfaceType::ApBridged;
        dual_new.instances = 2;

        let picked = select_downgrades(&policy, &request(30), 1, &[single, dual_old, dual_new]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "ap2");
    }
}
