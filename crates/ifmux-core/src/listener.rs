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

//! Listener contracts and their execution-context-bound proxies.
//!
//! Every callback handed to the manager comes with the [`ExecutionContext`]
//! it must run on. The manager never invokes a listener directly: it goes
//! through a [`ListenerProxy`], which runs the callback inline when the
//! context is current and posts it to the front of the queue otherwise.

use crate::exec::ExecutionContext;
use crate::hal::RttControllerId;
use std::fmt;
use std::sync::Arc;

/// Notified when the manager's `(ready, started)` state changes.
pub trait ManagerStatusListener: Send + Sync {
    /// Called once per observed transition.
    fn on_status_changed(&self);
}

/// Notified whenever an interface is torn down, explicit removals included.
pub trait InterfaceDestroyedListener: Send + Sync {
    /// `iface_name` is the hardware name of the destroyed interface.
    fn on_destroyed(&self, iface_name: &str);
}

/// Observes the lifetime of the RTT controller.
pub trait RttControllerLifecycleListener: Send + Sync {
    /// A controller became available.
    fn on_new_rtt_controller(&self, controller: RttControllerId);
    /// The previously announced controller is gone.
    fn on_rtt_controller_destroyed(&self);
}

/// Chooses which physical instance a bridged access point gives up when it is
/// downgraded to a single-instance access point.
pub trait BridgedApDowngradeHandler: Send + Sync {
    /// Returns the instance to remove, or `None` to let the manager pick.
    fn select_instance_for_removal(&self, iface_name: &str, instances: &[String])
        -> Option<String>;
}

/// A listener paired with the execution context it runs on.
pub struct ListenerProxy<L: ?Sized> {
    listener: Arc<L>,
    context: ExecutionContext,
}

impl<L: ?Sized + Send + Sync + 'static> ListenerProxy<L> {
    /// Binds `listener` to `context`.
    pub fn new(listener: Arc<L>, context: ExecutionContext) -> Self {
        Self { listener, context }
    }

    /// The wrapped listener.
    pub fn listener(&self) -> &Arc<L> {
        &self.listener
    }

    /// The context callbacks run on.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Returns `true` if this proxy wraps the very same listener object.
    pub fn is_same(&self, listener: &Arc<L>) -> bool {
        Arc::ptr_eq(&self.listener, listener)
    }

    /// Invokes `call` on the listener's context.
    pub fn dispatch<F>(&self, call: F)
    where
        F: FnOnce(&L) + Send + 'static,
    {
        let listener = Arc::clone(&self.listener);
        self.context.run_or_post_at_front(move || call(&listener));
    }
}

impl<L: ?Sized> Clone for ListenerProxy<L> {
    fn clone(&self) -> Self {
        Self {
            listener: Arc::clone(&self.listener),
            context: self.context.clone(),
        }
    }
}

impl<L: ?Sized> fmt::Debug for ListenerProxy<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerProxy")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
