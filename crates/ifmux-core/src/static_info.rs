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

//! Persisted static chip records.
//!
//! Chip capabilities and combinations are stable across boots, so the last
//! values seen from a started chip are stored and used to answer capability
//! queries before the hardware is powered on.
//!
//! The textual format is a JSON array with one record per chip:
//!
//! ```json
//! [{"chipId": 0, "chipCapabilities": 0,
//!   "availableModes": [{"id": 0, "availableCombinations":
//!     [{"limits": [{"maxIfaces": 1, "types": [0]}]}]}]}]
//! ```
//!
//! Interface types are stored as numeric codes (see [`IfaceType::code`]).

use crate::capability::ChipCapabilities;
use crate::combination::{
    ChipMode, Combination, CombinationModel, ComboLimit, ModeId, MAX_IFACES_PER_LIMIT,
};
use crate::hal::ChipId;
use crate::iface::IfaceType;
use serde::{Deserialize, Serialize};

/// Errors raised while reading or writing static chip records.
#[derive(Debug, thiserror::Error)]
pub enum StaticInfoError {
    /// The text is not a valid record array.
    #[error("malformed static chip record: {0}")]
    Json(#[from] serde_json::Error),
    /// A limit references an interface type code that does not exist.
    #[error("{chip}: unknown interface type code {code}")]
    UnknownTypeCode {
        /// Chip owning the offending record.
        chip: ChipId,
        /// The unknown code.
        code: u8,
    },
    /// A limit declares more slots than any chip offers.
    #[error("{chip}: limit of {max_ifaces} interfaces exceeds {}", MAX_IFACES_PER_LIMIT)]
    LimitTooLarge {
        /// Chip owning the offending record.
        chip: ChipId,
        /// The declared slot count.
        max_ifaces: u32,
    },
}

/// One `{maxIfaces, types}` limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitRecord {
    /// Maximum number of interfaces in the group.
    pub max_ifaces: u32,
    /// Interface type codes.
    pub types: Vec<u8>,
}

/// One combination of a mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationRecord {
    /// Limits of the combination.
    pub limits: Vec<LimitRecord>,
}

/// One chip mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeRecord {
    /// Mode identifier.
    pub id: u32,
    /// Alternative combinations of the mode.
    pub available_combinations: Vec<CombinationRecord>,
}

/// Snapshot of a chip's static properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticChipInfo {
    /// Hardware chip id.
    pub chip_id: ChipId,
    /// Capability bits.
    pub chip_capabilities: ChipCapabilities,
    /// Modes offered by the chip.
    pub available_modes: Vec<ModeRecord>,
}

impl StaticChipInfo {
    /// Captures a chip's capability bits and modes.
    pub fn from_model(
        chip_id: ChipId,
        chip_capabilities: ChipCapabilities,
        model: &CombinationModel,
    ) -> Self {
        let available_modes = model
            .modes()
            .map(|mode| ModeRecord {
                id: mode.id.0,
                available_combinations: mode
                    .combinations
                    .iter()
                    .map(|combo| CombinationRecord {
                        limits: combo
                            .limits
                            .iter()
                            .map(|limit| LimitRecord {
                                max_ifaces: limit.max_ifaces,
                                types: limit.types.iter().map(|ty| ty.code()).collect(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            chip_id,
            chip_capabilities,
            available_modes,
        }
    }

    /// Rebuilds the chip modes, rejecting unknown type codes and oversized
    /// limits.
    pub fn to_modes(&self) -> Result<Vec<ChipMode>, StaticInfoError> {
        let mut modes = Vec::with_capacity(self.available_modes.len());
        for mode in &self.available_modes {
            let mut combinations = Vec::with_capacity(mode.available_combinations.len());
            for combo in &mode.available_combinations {
                let mut limits = Vec::with_capacity(combo.limits.len());
                for limit in &combo.limits {
                    if limit.max_ifaces > MAX_IFACES_PER_LIMIT {
                        return Err(StaticInfoError::LimitTooLarge {
                            chip: self.chip_id,
                            max_ifaces: limit.max_ifaces,
                        });
                    }
                    let types = limit
                        .types
                        .iter()
                        .map(|&code| {
                            IfaceType::from_code(code).ok_or(StaticInfoError::UnknownTypeCode {
                                chip: self.chip_id,
                                code,
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    limits.push(ComboLimit::new(limit.max_ifaces, types));
                }
                combinations.push(Combination::new(limits));
            }
            modes.push(ChipMode {
                id: ModeId(mode.id),
                combinations,
            });
        }
        Ok(modes)
    }

    /// Rebuilds the chip's combination model.
    pub fn to_model(&self) -> Result<CombinationModel, StaticInfoError> {
        self.to_modes().map(CombinationModel::new)
    }
}

/// Serializes a set of chip records.
pub fn encode(records: &[StaticChipInfo]) -> Result<String, StaticInfoError> {
    Ok(serde_json::to_string(records)?)
}

/// Parses a set of chip records, validating every type code.
pub fn decode(text: &str) -> Result<Vec<StaticChipInfo>, StaticInfoError> {
    let records: Vec<StaticChipInfo> = serde_json::from_str(text)?;
    for record in &records {
        record.to_modes()?;
    }
    Ok(records)
}

/// Storage for the textual static chip record.
pub trait StaticChipInfoStore: Send + Sync {
    /// Returns the stored text, or `None` if nothing was saved yet.
    fn load(&self) -> std::io::Result<Option<String>>;

    /// Replaces the stored text.
    fn save(&self, contents: &str) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use IfaceType::*;

    fn sample_model() -> CombinationModel {
        CombinationModel::new(vec![
            ChipMode::new(
                0,
                vec![Combination::new(vec![
                    ComboLimit::new(1, vec![Sta]),
                    ComboLimit::new(1, vec![P2p, Nan]),
                ])],
            ),
            ChipMode::new(
                1,
                vec![
                    Combination::new(vec![ComboLimit::new(1, vec![Ap])]),
                    Combination::new(vec![ComboLimit::new(1, vec![ApBridged])]),
                ],
            ),
        ])
    }

    #[test]
    fn test_record_survives_persistence() {
        let caps = ChipCapabilities::DUAL_BAND_SIMULTANEOUS | ChipCapabilities::BRIDGED_AP;
        let record = StaticChipInfo::from_model(ChipId(3), caps, &sample_model());

        let text = encode(std::slice::from_ref(&record)).unwrap();
        let decoded = decode(&text).unwrap();

        assert_eq!(decoded, vec![record]);
        assert_eq!(decoded[0].chip_capabilities, caps);
        assert_eq!(decoded[0].to_model().unwrap(), sample_model());
    }

    #[test]
    fn test_field_names_and_type_codes() {
        let record = StaticChipInfo::from_model(ChipId(0), ChipCapabilities::NONE, &sample_model());
        let value: serde_json::Value =
            serde_json::from_str(&encode(&[record]).unwrap()).unwrap();

        let chip = &value[0];
        assert_eq!(chip["chipId"], 0);
        assert_eq!(chip["chipCapabilities"], 0);
        let limits = &chip["availableModes"][0]["availableCombinations"][0]["limits"];
        assert_eq!(limits[0]["maxIfaces"], 1);
        assert_eq!(limits[0]["types"], serde_json::json!([0]));
        assert_eq!(limits[1]["types"], serde_json::json!([3, 4]));
        let bridged = &chip["availableModes"][1]["availableCombinations"][1]["limits"][0];
        assert_eq!(bridged["types"], serde_json::json!([2]));
    }

    #[test]
    fn test_unknown_type_code_is_rejected() {
        let text = r#"[{"chipId": 5, "chipCapabilities": 0, "availableModes":
            [{"id": 0, "availableCombinations": [{"limits": [{"maxIfaces": 1, "types": [9]}]}]}]}]"#;
        match decode(text) {
            Err(StaticInfoError::UnknownTypeCode { chip, code }) => {
                assert_eq!(chip, ChipId(5));
                assert_eq!(code, 9);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_oversized_limit_is_rejected() {
        let text = r#"[{"chipId": 2, "chipCapabilities": 0, "availableModes":
            [{"id": 0, "availableCombinations": [{"limits": [{"maxIfaces": 4000000000, "types": [0]}]}]}]}]"#;
        match decode(text) {
            Err(StaticInfoError::LimitTooLarge { chip, max_ifaces }) => {
                assert_eq!(chip, ChipId(2));
                assert_eq!(max_ifaces, 4_000_000_000);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let at_cap = text.replace("4000000000", &MAX_IFACES_PER_LIMIT.to_string());
        assert!(decode(&at_cap).is_ok());
    }

    #[test]
    fn test_malformed_text_is_rejected() {
        assert!(matches!(decode("{not json"), Err(StaticInfoError::Json(_))));
        assert!(matches!(decode(r#"[{"chipId": 0}]"#), Err(StaticInfoError::Json(_))));
    }
}
