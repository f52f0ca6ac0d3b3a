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

//! Requestor identities, priority classes and the eviction policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a workload asking for interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Requestor {
    /// Numeric owner id (e.g. a process or user id).
    pub uid: u32,
    /// Human-readable tag, part of the identity.
    pub name: String,
}

impl Requestor {
    /// Creates a requestor identity.
    pub fn new(uid: u32, name: &str) -> Self {
        Self {
            uid,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for Requestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.uid)
    }
}

/// Priority class of a requestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    /// Privileged settings or platform components.
    Privileged,
    /// System services.
    System,
    /// Foreground applications and services.
    Foreground,
    /// Background workloads.
    Background,
    /// Requests originating inside the manager's own stack.
    Internal,
}

/// Resolves the current priority class of a requestor.
///
/// The class of an identity can change between calls (an app moving to the
/// foreground), so the manager asks again for every decision.
pub trait PriorityResolver: Send + Sync {
    /// Returns the current class of `requestor`.
    fn priority_class(&self, requestor: &Requestor) -> PriorityClass;
}

/// Where `Internal` requestors sit relative to the other classes.
///
/// `Internal` is always below `Privileged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternalPriority {
    /// Between background and foreground.
    BelowForeground,
    /// Between foreground and system.
    BelowSystem,
    /// Same rank as system.
    #[default]
    WithSystem,
}

/// Numeric rank of a priority class; higher wins.
pub type PriorityRank = u8;

/// The eviction policy shared by every arbitration decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityPolicy {
    internal: InternalPriority,
}

impl PriorityPolicy {
    /// Creates a policy with the given placement for internal requestors.
    pub const fn new(internal: InternalPriority) -> Self {
        Self { internal }
    }

    /// Rank of a class under this policy.
    ///
    /// | Class | Rank |
    /// |---|---|
    /// | Background | 10 |
    /// | Foreground | 20 |
    /// | System | 30 |
    /// | Privileged | 40 |
    /// | Internal | 15, 25 or 30 |
    pub const fn rank(&self, class: PriorityClass) -> PriorityRank {
        match class {
            PriorityClass::Background => 10,
            PriorityClass::Foreground => 20,
            PriorityClass::System => 30,
            PriorityClass::Privileged => 40,
            PriorityClass::Internal => match self.internal {
                InternalPriority::BelowForeground => 15,
                InternalPriority::BelowSystem => 25,
                InternalPriority::WithSystem => 30,
            },
        }
    }

    /// Returns `true` if `new` may tear down an interface owned by `existing`.
    ///
    /// An owner may always replace its own interfaces. Otherwise the new
    /// requestor must rank strictly higher than the current owner.
    pub fn may_evict(
        &self,
        new: &Requestor,
        new_rank: PriorityRank,
        existing: &Requestor,
        existing_rank: PriorityRank,
    ) -> bool {
        new == existing || new_rank > existing_rank
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSES: [PriorityClass; 5] = [
        PriorityClass::Background,
        PriorityClass::Foreground,
        PriorityClass::System,
        PriorityClass::Privileged,
        PriorityClass::Internal,
    ];

    #[test]
    fn test_default_rank_order() {
        let policy = PriorityPolicy::default();
        assert!(policy.rank(PriorityClass::Background) < policy.rank(PriorityClass::Foreground));
        assert!(policy.rank(PriorityClass::Foreground) < policy.rank(PriorityClass::System));
        assert!(policy.rank(PriorityClass::System) < policy.rank(PriorityClass::Privileged));
        assert_eq!(
            policy.rank(PriorityClass::Internal),
            policy.rank(PriorityClass::System)
        );
    }

    #[test]
    fn test_internal_is_always_below_privileged() {
        for placement in [
            InternalPriority::BelowForeground,
            InternalPriority::BelowSystem,
            InternalPriority::WithSystem,
        ] {
            let policy = PriorityPolicy::new(placement);
            assert!(policy.rank(PriorityClass::Internal) < policy.rank(PriorityClass::Privileged));
        }
    }

    #[test]
    fn test_internal_placement_is_configurable() {
        let below_fg = PriorityPolicy::new(InternalPriority::BelowForeground);
        assert!(below_fg.rank(PriorityClass::Internal) < below_fg.rank(PriorityClass::Foreground));
        assert!(below_fg.rank(PriorityClass::Internal) > below_fg.rank(PriorityClass::Background));

        let below_sys = PriorityPolicy::new(InternalPriority::BelowSystem);
        assert!(below_sys.rank(PriorityClass::Internal) > below_sys.rank(PriorityClass::Foreground));
        assert!(below_sys.rank(PriorityClass::Internal) < below_sys.rank(PriorityClass::System));
    }

    #[test]
    fn test_may_evict_strictly_higher_rank_only() {
        let policy = PriorityPolicy::default();
        let a = Requestor::new(1, "a");
        let b = Requestor::new(2, "b");
        for new_class in CLASSES {
            for old_class in CLASSES {
                let new_rank = policy.rank(new_class);
                let old_rank = policy.rank(old_class);
                assert_eq!(
                    policy.may_evict(&a, new_rank, &b, old_rank),
                    new_rank > old_rank,
                    "{new_class:?} vs {old_class:?}"
                );
            }
        }
    }

    #[test]
    fn test_same_owner_can_always_replace() {
        let policy = PriorityPolicy::default();
        let a = Requestor::new(1, "a");
        let bg = policy.rank(PriorityClass::Background);
        let privileged = policy.rank(PriorityClass::Privileged);
        assert!(policy.may_evict(&a, bg, &a, privileged));
    }

    #[test]
    fn test_privileged_cannot_evict_other_privileged() {
        let policy = PriorityPolicy::default();
        let rank = policy.rank(PriorityClass::Privileged);
        assert!(!policy.may_evict(
            &Requestor::new(1, "settings"),
            rank,
            &Requestor::new(2, "tethering"),
            rank
        ));
    }
}
