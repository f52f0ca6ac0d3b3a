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

//! The chip combination model.
//!
//! A chip exposes an ordered list of [`ChipMode`]s. Each mode offers one or
//! more alternative [`Combination`]s, and each combination is a list of
//! [`ComboLimit`]s: "up to `max_ifaces` interfaces drawn from `types`".
//!
//! Combinations are expanded slot by slot into per-type upper bounds
//! ([`IfaceCounts`]). A multiset of interface types fits a combination when
//! it is bounded component-wise by one of its expansions. Expansion happens
//! once, when the [`CombinationModel`] is built.

use crate::iface::{IfaceCounts, IfaceType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

/// Hardware identifier of a chip mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeId(pub u32);

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode#{}", self.0)
    }
}

/// Largest slot count a single limit may declare.
pub const MAX_IFACES_PER_LIMIT: u32 = 16;

/// One slot group of a combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboLimit {
    /// Maximum number of interfaces sharing this slot group.
    pub max_ifaces: u32,
    /// Interface types allowed to occupy the slots.
    pub types: Vec<IfaceType>,
}

impl ComboLimit {
    /// Creates a limit of `max_ifaces` slots shared by `types`.
    pub fn new(max_ifaces: u32, types: Vec<IfaceType>) -> Self {
        Self { max_ifaces, types }
    }
}

/// A set of limits whose interfaces may all run at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Combination {
    /// The slot groups of the combination.
    pub limits: Vec<ComboLimit>,
}

impl Combination {
    /// Creates a combination from its limits.
    pub fn new(limits: Vec<ComboLimit>) -> Self {
        Self { limits }
    }

    /// Expands the combination into every reachable per-type upper bound.
    ///
    /// Each slot of each limit is assigned to one of the limit's types, so a
    /// type may draw slots from several limits. Duplicates are removed.
    pub fn expand(&self) -> Vec<IfaceCounts> {
        let mut expanded: BTreeSet<IfaceCounts> = BTreeSet::new();
        expanded.insert(IfaceCounts::new());

        for limit in &self.limits {
            if limit.types.is_empty() {
                continue;
            }
            for _ in 0..limit.max_ifaces.min(MAX_IFACES_PER_LIMIT) {
                let mut next = BTreeSet::new();
                for counts in &expanded {
                    for ty in &limit.types {
                        let mut grown = *counts;
                        grown[*ty] += 1;
                        next.insert(grown);
                    }
                }
                expanded = next;
            }
        }

        expanded.into_iter().collect()
    }
}

/// A hardware-selectable chip configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipMode {
    /// Mode identifier used when configuring the chip.
    pub id: ModeId,
    /// Alternative combinations available in this mode.
    pub combinations: Vec<Combination>,
}

impl ChipMode {
    /// Creates a mode.
    pub fn new(id: u32, combinations: Vec<Combination>) -> Self {
        Self {
            id: ModeId(id),
            combinations,
        }
    }
}

#[derive(Debug)]
struct ModeEntry {
    mode: ChipMode,
    /// Deduplicated expansions of every combination of the mode.
    bounds: Vec<IfaceCounts>,
}

/// Immutable, shareable description of a chip's modes.
///
/// Cloning is cheap: clones share the same expanded data. A model is never
/// edited after construction; refreshed capability data produces a new one.
#[derive(Debug, Clone)]
pub struct CombinationModel {
    entries: Arc<[ModeEntry]>,
}

impl CombinationModel {
    /// Builds a model and expands every combination.
    pub fn new(modes: Vec<ChipMode>) -> Self {
        let entries: Vec<ModeEntry> = modes
            .into_iter()
            .map(|mode| {
                let mut seen = HashSet::new();
                let mut bounds = Vec::new();
                for combination in &mode.combinations {
                    for counts in combination.expand() {
                        if seen.insert(counts) {
                            bounds.push(counts);
                        }
                    }
                }
                ModeEntry { mode, bounds }
            })
            .collect();

        Self {
            entries: entries.into(),
        }
    }

    /// Returns `true` if the model has no modes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the modes in declaration order.
    pub fn modes(&self) -> impl Iterator<Item = &ChipMode> {
        self.entries.iter().map(|e| &e.mode)
    }

    /// Returns a clone of every mode, in declaration order.
    pub fn to_modes(&self) -> Vec<ChipMode> {
        self.modes().cloned().collect()
    }

    /// Looks up a mode by id.
    pub fn mode(&self, id: ModeId) -> Option<&ChipMode> {
        self.modes().find(|m| m.id == id)
    }

    /// Expanded upper bounds of a mode, or an empty slice for unknown ids.
    pub fn bounds(&self, id: ModeId) -> &[IfaceCounts] {
        self.entries
            .iter()
            .find(|e| e.mode.id == id)
            .map(|e| e.bounds.as_slice())
            .unwrap_or(&[])
    }

    /// Returns `true` if the given mode can hold `counts`.
    pub fn mode_supports(&self, id: ModeId, counts: &IfaceCounts) -> bool {
        self.bounds(id).iter().any(|b| counts.fits_within(b))
    }

    /// Returns `true` if any mode can hold `counts`.
    pub fn can_support(&self, counts: &IfaceCounts) -> bool {
        self.entries
            .iter()
            .any(|e| e.bounds.iter().any(|b| counts.fits_within(b)))
    }

    /// Union of every interface type reachable in any mode.
    pub fn supported_types(&self) -> BTreeSet<IfaceType> {
        let mut types = BTreeSet::new();
        for entry in self.entries.iter() {
            for bound in &entry.bounds {
                types.extend(bound.iter().map(|(ty, _)| ty));
            }
        }
        types
    }

    /// First mode, in declaration order, able to hold one interface of `ty`.
    pub fn first_mode_supporting(&self, ty: IfaceType) -> Option<ModeId> {
        let single: IfaceCounts = [ty].into_iter().collect();
        self.entries
            .iter()
            .find(|e| e.bounds.iter().any(|b| single.fits_within(b)))
            .map(|e| e.mode.id)
    }
}

impl PartialEq for CombinationModel {
    fn eq(&self, other: &Self) -> bool {
        self.modes().eq(other.modes())
    }
}

impl Eq for CombinationModel {}

impl From<Vec<ChipMode>> for CombinationModel {
    fn from(modes: Vec<ChipMode>) -> Self {
        Self::new(modes)
    }
}
