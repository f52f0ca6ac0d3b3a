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

//! `ifmux simulate`: replays a request script against a simulated HAL.

use super::load_chips;
use crate::script::{Fault, PriorityConfig, Script, Step};
use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use ifmux_control::{
    CreateRequest, DeviceManager, DeviceManagerService, InterfaceHandle, ManagerConfig,
};
use ifmux_core::hal::{HalRevision, RttControllerId, ServiceDiscovery};
use ifmux_core::listener::{
    InterfaceDestroyedListener, ManagerStatusListener, RttControllerLifecycleListener,
};
use ifmux_core::requestor::PriorityResolver;
use ifmux_core::static_info::{StaticChipInfo, StaticChipInfoStore};
use ifmux_infra::{
    FileChipInfoStore, RemovalFault, SimulatedChip, SimulatedDiscovery, SimulatedHal,
    StaticPriorityTable,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RevisionArg {
    #[value(name = "1.0")]
    V1_0,
    #[value(name = "1.4")]
    V1_4,
    #[value(name = "1.5")]
    V1_5,
    #[value(name = "1.6")]
    V1_6,
}

impl From<RevisionArg> for HalRevision {
    fn from(arg: RevisionArg) -> Self {
        match arg {
            RevisionArg::V1_0 => HalRevision::V1_0,
            RevisionArg::V1_4 => HalRevision::V1_4,
            RevisionArg::V1_5 => HalRevision::V1_5,
            RevisionArg::V1_6 => HalRevision::V1_6,
        }
    }
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Chip description (JSON array of static chip records)
    #[arg(long)]
    pub chips: PathBuf,

    /// Request script (JSON)
    #[arg(long)]
    pub script: PathBuf,

    /// HAL revision implemented by every simulated chip
    #[arg(long, value_enum, default_value = "1.6")]
    pub revision: RevisionArg,

    /// Static chip record file, loaded before start and rewritten after
    #[arg(long)]
    pub store: Option<PathBuf>,
}

pub fn run(args: &SimulateArgs, config: ManagerConfig) -> Result<()> {
    let chips = load_chips(&args.chips)?;
    let script = Script::load(&args.script)?;
    let store = args
        .store
        .as_ref()
        .map(|path| Arc::new(FileChipInfoStore::new(path)) as Arc<dyn StaticChipInfoStore>);

    log::info!(
        "Simulate: {} chip(s), {} step(s) from {}",
        chips.len(),
        script.steps.len(),
        args.script.display()
    );

    let mut simulation =
        Simulation::new(&chips, args.revision.into(), config, &script.priorities, store)?;
    for step in &script.steps {
        simulation.step(step)?;
        for line in simulation.drain() {
            println!("{}", line);
        }
    }
    simulation.shutdown();
    Ok(())
}

/// Lines written by the simulation and by the listeners it registers.
#[derive(Default)]
struct Transcript {
    lines: Mutex<Vec<String>>,
}

impl Transcript {
    fn push(&self, line: String) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl InterfaceDestroyedListener for Transcript {
    fn on_destroyed(&self, iface_name: &str) {
        self.push(format!("  destroyed {}", iface_name));
    }
}

impl ManagerStatusListener for Transcript {
    fn on_status_changed(&self) {
        self.push("  status changed".to_string());
    }
}

impl RttControllerLifecycleListener for Transcript {
    fn on_new_rtt_controller(&self, controller: RttControllerId) {
        self.push(format!("  rtt controller #{} available", controller.0));
    }

    fn on_rtt_controller_destroyed(&self) {
        self.push("  rtt controller destroyed".to_string());
    }
}

/// A device manager service wired to a simulated HAL.
pub struct Simulation {
    hal: Arc<SimulatedHal>,
    discovery: Arc<SimulatedDiscovery>,
    priorities: Arc<StaticPriorityTable>,
    service: DeviceManagerService,
    transcript: Arc<Transcript>,
    labels: HashMap<String, InterfaceHandle>,
}

impl Simulation {
    pub fn new(
        chips: &[StaticChipInfo],
        revision: HalRevision,
        config: ManagerConfig,
        priorities: &PriorityConfig,
        store: Option<Arc<dyn StaticChipInfoStore>>,
    ) -> Result<Self> {
        let simulated = chips
            .iter()
            .map(|info| SimulatedChip::from_static(info, revision))
            .collect::<Result<Vec<_>, _>>()
            .context("failed to build simulated chips")?;

        let hal = Arc::new(SimulatedHal::new(simulated));
        let discovery = Arc::new(SimulatedDiscovery::new(Arc::clone(&hal)));
        let table = Arc::new(StaticPriorityTable::from_entries(
            priorities.fallback,
            &priorities.entries,
        ));

        let mut manager = DeviceManager::new(
            config,
            Arc::clone(&discovery) as Arc<dyn ServiceDiscovery>,
            Arc::clone(&table) as Arc<dyn PriorityResolver>,
        );
        if let Some(store) = store {
            manager = manager.with_static_store(store);
        }
        let service =
            DeviceManagerService::spawn(manager).context("failed to spawn the manager thread")?;
        if !service.initialize() {
            bail!("device manager failed to initialize");
        }

        let transcript = Arc::new(Transcript::default());
        service.register_status_listener(
            Arc::clone(&transcript) as Arc<dyn ManagerStatusListener>,
            service.context(),
        );
        service.register_rtt_observer(
            Arc::clone(&transcript) as Arc<dyn RttControllerLifecycleListener>,
            service.context(),
        );

        Ok(Self {
            hal,
            discovery,
            priorities: table,
            service,
            transcript,
            labels: HashMap::new(),
        })
    }

    /// Lines produced since the last call.
    pub fn drain(&self) -> Vec<String> {
        self.transcript.drain()
    }

    fn handle(&self, label: &str) -> Result<InterfaceHandle> {
        self.labels
            .get(label)
            .cloned()
            .with_context(|| format!("no interface labelled '{}'", label))
    }

    /// Executes one step. Refused requests are reported, not returned as
    /// errors; only malformed steps fail.
    pub fn step(&mut self, step: &Step) -> Result<()> {
        let out = Arc::clone(&self.transcript);
        match step {
            Step::Start => {
                let ok = self.service.start();
                out.push(format!("start: {}", if ok { "ok" } else { "failed" }));
            }
            Step::Stop => {
                self.service.stop();
                out.push("stop".to_string());
            }
            Step::Kill => {
                out.push("HAL service killed".to_string());
                self.discovery.kill();
            }
            Step::Announce => {
                out.push("HAL service announced".to_string());
                self.discovery.announce();
            }
            Step::Create {
                label,
                iface_type,
                requestor,
                capabilities,
            } => {
                out.push(format!("create {} for {}", iface_type, requestor));
                let listener = Arc::clone(&self.transcript) as Arc<dyn InterfaceDestroyedListener>;
                let request = CreateRequest::new(*iface_type, requestor.clone())
                    .with_capabilities(*capabilities)
                    .on_destroyed(listener, self.service.context());
                let result = self.service.create_interface(request);
                match result {
                    Ok(handle) => {
                        out.push(format!("  -> {}", handle));
                        if let Some(label) = label {
                            self.labels.insert(label.clone(), handle);
                        }
                    }
                    Err(e) => out.push(format!("  -> refused: {}", e)),
                }
            }
            Step::Impact {
                iface_type,
                requestor,
                capabilities,
            } => {
                let verdict = match self.service.report_impact(
                    *iface_type,
                    *capabilities,
                    requestor.clone(),
                ) {
                    None => "infeasible".to_string(),
                    Some(entries) if entries.is_empty() => "no impact".to_string(),
                    Some(entries) => {
                        let victims: Vec<String> = entries
                            .iter()
                            .map(|e| format!("{} of {}", e.iface_type, e.requestor))
                            .collect();
                        format!("would destroy {}", victims.join(", "))
                    }
                };
                out.push(format!("impact {} for {}: {}", iface_type, requestor, verdict));
            }
            Step::Remove { label } => {
                let handle = self.handle(label)?;
                out.push(format!("remove {}", handle));
                let ok = self.service.remove_interface(handle);
                out.push(format!("  -> {}", if ok { "removed" } else { "not removed" }));
            }
            Step::Handover { label, requestor } => {
                let handle = self.handle(label)?;
                let ok = self.service.replace_requestor(handle.clone(), requestor.clone());
                out.push(format!(
                    "handover {} to {}: {}",
                    handle,
                    requestor,
                    if ok { "ok" } else { "failed" }
                ));
            }
            Step::SetPriority { requestor, class } => {
                self.priorities.set_class(requestor.clone(), *class);
                out.push(format!("priority of {} set to {:?}", requestor, class));
            }
            Step::Fail { fault, count } => {
                match fault {
                    Fault::Start => self.hal.fail_next_start(),
                    Fault::NotAvailable => self.hal.fail_start_not_available(*count),
                    Fault::Configure => self.hal.fail_next_configure(),
                    Fault::Create => self.hal.fail_next_create(),
                    Fault::Removal => self.hal.fail_next_removal(RemovalFault::StillListed),
                }
                out.push(format!("inject fault {:?}", fault));
            }
            Step::RemoveExternally { label } => {
                let handle = self.handle(label)?;
                let gone = self.hal.remove_externally(handle.chip, &handle.name);
                out.push(format!(
                    "external removal of {}: {}",
                    handle,
                    if gone { "done" } else { "not found" }
                ));
            }
            Step::Status => self.status(),
        }
        Ok(())
    }

    fn status(&self) {
        let out = &self.transcript;
        out.push(format!(
            "status: ready={} started={}",
            self.service.is_ready(),
            self.service.is_started()
        ));
        for handle in self.service.interfaces() {
            let owner = self
                .service
                .interface_owner(handle.clone())
                .map_or_else(|| "?".to_string(), |r| r.to_string());
            out.push(format!("  {} owned by {}", handle, owner));
        }
        if let Some(controller) = self.service.rtt_controller() {
            out.push(format!("  rtt controller #{}", controller.0));
        }
    }

    /// Stops the manager thread.
    pub fn shutdown(self) {
        self.service.shutdown();
    }
}
