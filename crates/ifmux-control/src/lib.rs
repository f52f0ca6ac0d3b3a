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

//! # ifmux Control
//!
//! The device manager. It owns the interface registry, arbitrates interface
//! requests between requestors of different priority, drives the chip
//! lifecycle through the HAL and keeps at most one RTT controller alive.
//!
//! [`DeviceManager`] holds the state and is driven through `&mut self`.
//! [`DeviceManagerService`] runs it on a dedicated thread so that it can be
//! shared between callers.

#![warn(missing_docs)]

pub mod arbitration;
pub mod cache;
pub mod chip;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod registry;
pub mod rtt;
pub mod service;

pub use arbitration::{Arbiter, Proposal, ProposalCost};
pub use cache::CapabilityCache;
pub use config::ManagerConfig;
pub use error::{CreateError, RegistryError};
pub use manager::{CreateRequest, DeviceManager, EventWaker, ImpactEntry};
pub use registry::InterfaceHandle;
pub use service::DeviceManagerService;
