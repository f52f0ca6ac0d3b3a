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

//! `ifmux`: inspect chip descriptions and replay interface requests against
//! a simulated Wi-Fi HAL.
//!
//! ```text
//! ifmux check --chips demos/chips.json --combo sta=1,ap=1
//! ifmux simulate --chips demos/chips.json --script demos/script.json
//! ```

mod commands;
mod script;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check::CheckArgs, simulate::SimulateArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ifmux")]
#[command(about = "Wi-Fi interface arbitration toolbox", long_about = None)]
struct Cli {
    /// Manager configuration (JSON). Missing fields keep their default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer capability queries from a chip description, without a HAL.
    Check(CheckArgs),
    /// Run a request script against a simulated HAL and print each decision.
    Simulate(SimulateArgs),
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Check(args) => commands::check::run(&args),
        Command::Simulate(args) => commands::simulate::run(&args, config),
    }
}
