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

//! Deferred listener notifications.
//!
//! Notifications raised while the manager mutates its state are collected in
//! an [`Outbox`] and dispatched once the operation is over. A listener bound
//! to the manager's own context therefore runs after the manager is released
//! and may call back into it.

use ifmux_core::listener::ListenerProxy;

/// A queued notification.
pub type PendingCall = Box<dyn FnOnce() + Send + 'static>;

/// Notifications waiting for dispatch, in raise order.
#[derive(Default)]
pub struct Outbox {
    calls: Vec<PendingCall>,
}

impl Outbox {
    /// Queues `call` for `proxy`.
    pub fn notify<L, F>(&mut self, proxy: &ListenerProxy<L>, call: F)
    where
        L: ?Sized + Send + Sync + 'static,
        F: FnOnce(&L) + Send + 'static,
    {
        let proxy = proxy.clone();
        self.calls.push(Box::new(move || proxy.dispatch(call)));
    }

    /// Takes every queued call.
    pub fn take(&mut self) -> Vec<PendingCall> {
        std::mem::take(&mut self.calls)
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Number of queued calls.
    pub fn len(&self) -> usize {
        self.calls.len()
    }
}

/// Runs a batch of taken calls.
pub fn deliver(calls: Vec<PendingCall>) {
    for call in calls {
        call();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifmux_core::exec::Looper;
    use ifmux_core::listener::ManagerStatusListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl ManagerStatusListener for Counter {
        fn on_status_changed(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_nothing_runs_until_delivered() {
        let looper = Looper::new("owner");
        let counter = Arc::new(Counter::default());
        let listener: Arc<dyn ManagerStatusListener> = counter.clone();
        let proxy = ListenerProxy::new(listener, looper.context());

        let mut outbox = Outbox::default();
        looper.enter(|| {
            outbox.notify(&proxy, |l| l.on_status_changed());
            outbox.notify(&proxy, |l| l.on_status_changed());
            assert_eq!(counter.0.load(Ordering::SeqCst), 0);
            assert_eq!(outbox.len(), 2);
            deliver(outbox.take());
        });

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert!(outbox.is_empty());
        assert!(looper.is_idle());
    }
}
