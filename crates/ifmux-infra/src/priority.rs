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

//! Table-driven priority resolution.

use ifmux_core::requestor::{PriorityClass, PriorityResolver, Requestor};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// One row of a priority table as found in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriorityEntry {
    /// Requestor uid.
    pub uid: u32,
    /// Requestor name.
    pub name: String,
    /// Class assigned to the requestor.
    pub class: PriorityClass,
}

/// Resolves classes from a mutable table, with a fallback class.
///
/// Classes can be changed while the manager runs; every decision sees the
/// class in force at that moment.
#[derive(Debug)]
pub struct StaticPriorityTable {
    classes: RwLock<HashMap<Requestor, PriorityClass>>,
    fallback: PriorityClass,
}

impl StaticPriorityTable {
    /// An empty table resolving everyone to `fallback`.
    pub fn new(fallback: PriorityClass) -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
            fallback,
        }
    }

    /// Builds a table from configuration rows.
    pub fn from_entries(fallback: PriorityClass, entries: &[PriorityEntry]) -> Self {
        let table = Self::new(fallback);
        for entry in entries {
            table.set_class(Requestor::new(entry.uid, &entry.name), entry.class);
        }
        table
    }

    /// Adds a row.
    pub fn with(self, requestor: Requestor, class: PriorityClass) -> Self {
        self.set_class(requestor, class);
        self
    }

    /// Sets the class of `requestor`.
    pub fn set_class(&self, requestor: Requestor, class: PriorityClass) {
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(requestor, class);
    }
}

impl PriorityResolver for StaticPriorityTable {
    fn priority_class(&self, requestor: &Requestor) -> PriorityClass {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(requestor)
            .copied()
            .unwrap_or(self.fallback)
    }
}
