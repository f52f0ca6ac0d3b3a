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

//! Virtual interface types and per-type counters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// The kind of virtual radio interface a requestor can ask for.
///
/// This is also the concurrency type used by combination limits: a bridged
/// access point occupies an `ApBridged` slot, not an `Ap` slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IfaceType {
    /// Station (client) interface.
    Sta,
    /// Single-instance access point.
    Ap,
    /// Access point bridged over several physical instances.
    ApBridged,
    /// Peer-to-peer interface.
    P2p,
    /// Neighbor-aware-network interface.
    Nan,
}

impl IfaceType {
    /// Every interface type, in counter index order.
    pub const ALL: [IfaceType; 5] = [
        IfaceType::Sta,
        IfaceType::Ap,
        IfaceType::ApBridged,
        IfaceType::P2p,
        IfaceType::Nan,
    ];

    /// Number of interface types.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this type inside an [`IfaceCounts`] vector.
    pub const fn index(self) -> usize {
        match self {
            IfaceType::Sta => 0,
            IfaceType::Ap => 1,
            IfaceType::ApBridged => 2,
            IfaceType::P2p => 3,
            IfaceType::Nan => 4,
        }
    }

    /// Numeric code used by the persisted static chip record.
    pub const fn code(self) -> u8 {
        self.index() as u8
    }

    /// Parses a persisted type code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// The HAL object kind backing this interface type.
    ///
    /// Bridged access points are AP objects at the HAL level.
    pub const fn hal_kind(self) -> HalIfaceKind {
        match self {
            IfaceType::Sta => HalIfaceKind::Sta,
            IfaceType::Ap | IfaceType::ApBridged => HalIfaceKind::Ap,
            IfaceType::P2p => HalIfaceKind::P2p,
            IfaceType::Nan => HalIfaceKind::Nan,
        }
    }

    /// Parses a lowercase name such as `"sta"` or `"ap_bridged"`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sta" => Some(IfaceType::Sta),
            "ap" => Some(IfaceType::Ap),
            "ap_bridged" | "apbridged" | "bridged_ap" => Some(IfaceType::ApBridged),
            "p2p" => Some(IfaceType::P2p),
            "nan" => Some(IfaceType::Nan),
            _ => None,
        }
    }
}

impl fmt::Display for IfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IfaceType::Sta => "STA",
            IfaceType::Ap => "AP",
            IfaceType::ApBridged => "AP_BRIDGED",
            IfaceType::P2p => "P2P",
            IfaceType::Nan => "NAN",
        };
        f.write_str(name)
    }
}

/// Interface object kinds as the HAL enumerates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HalIfaceKind {
    /// Station objects.
    Sta,
    /// Access point objects, bridged or not.
    Ap,
    /// Peer-to-peer objects.
    P2p,
    /// Neighbor-aware-network objects.
    Nan,
}

impl HalIfaceKind {
    /// Every HAL interface kind.
    pub const ALL: [HalIfaceKind; 4] = [
        HalIfaceKind::Sta,
        HalIfaceKind::Ap,
        HalIfaceKind::P2p,
        HalIfaceKind::Nan,
    ];
}

/// A multiset of interface types, stored as one counter per type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IfaceCounts([u32; IfaceType::COUNT]);

impl IfaceCounts {
    /// An empty multiset.
    pub const fn new() -> Self {
        Self([0; IfaceType::COUNT])
    }

    /// Builds a multiset from `(type, count)` pairs. Repeated types accumulate.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (IfaceType, u32)>,
    {
        let mut counts = Self::new();
        for (ty, n) in pairs {
            counts[ty] += n;
        }
        counts
    }

    /// Returns `true` when every counter is lower than or equal to `limits`.
    pub fn fits_within(&self, limits: &IfaceCounts) -> bool {
        self.0.iter().zip(limits.0.iter()).all(|(have, max)| have <= max)
    }

    /// Total number of interfaces in the multiset.
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Returns `true` if no interface is counted.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterates `(type, count)` pairs with a non-zero count.
    pub fn iter(&self) -> impl Iterator<Item = (IfaceType, u32)> + '_ {
        IfaceType::ALL
            .iter()
            .map(move |ty| (*ty, self.0[ty.index()]))
            .filter(|(_, n)| *n > 0)
    }
}

impl Index<IfaceType> for IfaceCounts {
    type Output = u32;

    fn index(&self, ty: IfaceType) -> &u32 {
        &self.0[ty.index()]
    }
}

impl IndexMut<IfaceType> for IfaceCounts {
    fn index_mut(&mut self, ty: IfaceType) -> &mut u32 {
        &mut self.0[ty.index()]
    }
}

impl FromIterator<IfaceType> for IfaceCounts {
    fn from_iter<I: IntoIterator<Item = IfaceType>>(iter: I) -> Self {
        let mut counts = Self::new();
        for ty in iter {
            counts[ty] += 1;
        }
        counts
    }
}

impl fmt::Display for IfaceCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(ty, n)| format!("{n}x{ty}")).collect();
        if parts.is_empty() {
            f.write_str("{}")
        } else {
            write!(f, "{{{}}}", parts.join(" + "))
        }
    }
}
