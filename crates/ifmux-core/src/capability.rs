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

//! Opaque chip capability bits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Capability bitmask reported by a chip.
///
/// The manager treats the bits as opaque predicates: a request names the
/// bits it needs and only chips advertising all of them are candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChipCapabilities(pub u64);

impl ChipCapabilities {
    /// No capability bits.
    pub const NONE: Self = Self(0);
    /// Station and access point operation on the 60 GHz band.
    pub const INFRA_60G: Self = Self(1 << 0);
    /// Dual band simultaneous operation.
    pub const DUAL_BAND_SIMULTANEOUS: Self = Self(1 << 1);
    /// Bridged access point over two radios.
    pub const BRIDGED_AP: Self = Self(1 << 2);
    /// Multi-link operation.
    pub const MULTI_LINK: Self = Self(1 << 3);

    /// Returns `true` if every bit of `required` is present.
    pub const fn contains(self, required: ChipCapabilities) -> bool {
        self.0 & required.0 == required.0
    }

    /// Returns `true` if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ChipCapabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for ChipCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_requires_every_bit() {
        let caps = ChipCapabilities::INFRA_60G | ChipCapabilities::BRIDGED_AP;
        assert!(caps.contains(ChipCapabilities::INFRA_60G));
        assert!(caps.contains(ChipCapabilities::NONE));
        assert!(!caps.contains(ChipCapabilities::INFRA_60G | ChipCapabilities::MULTI_LINK));
    }
}
