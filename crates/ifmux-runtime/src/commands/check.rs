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

//! `ifmux check`: static capability queries.

use super::{load_chips, parse_combo};
use anyhow::{Context, Result};
use clap::Args;
use ifmux_control::cache::{self, CachedChip};
use ifmux_core::hal::ChipId;
use ifmux_core::iface::{IfaceCounts, IfaceType};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Chip description (JSON array of static chip records)
    #[arg(long)]
    pub chips: PathBuf,

    /// Restrict the supported-type listing to one chip id
    #[arg(long)]
    pub chip: Option<u32>,

    /// Combination to test, e.g. `sta=1,ap=1`. May be repeated.
    #[arg(long = "combo")]
    pub combos: Vec<String>,
}

pub fn run(args: &CheckArgs) -> Result<()> {
    let records = load_chips(&args.chips)?;
    let chips = records
        .iter()
        .map(|info| {
            info.to_model().map(|model| CachedChip {
                id: info.chip_id,
                capabilities: info.chip_capabilities,
                model,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .context("failed to rebuild chip modes")?;

    let combos = args
        .combos
        .iter()
        .map(|text| parse_combo(text).map(|counts| (text.clone(), counts)))
        .collect::<Result<Vec<_>>>()?;

    for line in report(&chips, args.chip.map(ChipId), &combos) {
        println!("{}", line);
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn report(chips: &[CachedChip], scope: Option<ChipId>, combos: &[(String, IfaceCounts)]) -> Vec<String> {
    let mut lines = Vec::new();

    for chip in chips {
        lines.push(format!(
            "{}: capabilities {}, {} mode(s)",
            chip.id,
            chip.capabilities,
            chip.model.modes().count()
        ));
    }

    let types: Vec<String> = cache::supported_types(chips, scope)
        .into_iter()
        .map(|ty| ty.to_string())
        .collect();
    let label = scope.map_or_else(|| "all chips".to_string(), |id| id.to_string());
    lines.push(format!("supported types ({}): {}", label, types.join(" ")));

    let pair = |a: IfaceType, b: IfaceType| IfaceCounts::from_pairs([(a, 1), (b, 1)]);
    let bridged = IfaceCounts::from_pairs([(IfaceType::ApBridged, 1)]);
    lines.push(format!(
        "STA+AP concurrency: {}",
        yes_no(cache::can_support(chips, &pair(IfaceType::Sta, IfaceType::Ap)))
    ));
    lines.push(format!(
        "bridged AP: {}",
        yes_no(cache::can_support(chips, &bridged))
    ));
    lines.push(format!(
        "STA+bridged AP concurrency: {}",
        yes_no(cache::can_support(chips, &pair(IfaceType::Sta, IfaceType::ApBridged)))
    ));

    for (text, counts) in combos {
        lines.push(format!(
            "combo {}: {}",
            text,
            yes_no(cache::can_support(chips, counts))
        ));
    }
    lines
}
