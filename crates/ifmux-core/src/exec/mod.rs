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

//! Execution contexts: message queues that run callbacks on a known thread.
//!
//! A [`Looper`] owns a queue with two lanes. The front lane is drained
//! before any work waiting in the back lane, and is FIFO within itself. An
//! [`ExecutionContext`] is the cloneable posting handle of a looper.
//!
//! A looper either runs on its own thread ([`Looper::spawn`]) or is pumped
//! by hand ([`Looper::dispatch_pending`]), which keeps tests deterministic.
//! While a looper runs a task, its context is the thread's *current*
//! context, and [`ExecutionContext::run_or_post_at_front`] executes inline.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

type Task = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Task),
    Quit,
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_CONTEXT: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Restores the previous current context when dropped.
struct CurrentGuard {
    previous: Option<u64>,
}

impl CurrentGuard {
    fn enter(id: u64) -> Self {
        let previous = CURRENT_CONTEXT.with(|c| c.replace(Some(id)));
        Self { previous }
    }
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|c| c.set(self.previous));
    }
}

/// Cloneable handle used to post work to a [`Looper`].
#[derive(Clone)]
pub struct ExecutionContext {
    id: u64,
    name: Arc<str>,
    front: flume::Sender<Message>,
    back: flume::Sender<Message>,
}

impl ExecutionContext {
    /// Unique id of the context.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name given to the looper.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the calling thread is currently running this context.
    pub fn is_current(&self) -> bool {
        CURRENT_CONTEXT.with(|c| c.get() == Some(self.id))
    }

    /// Queues `task` at the back. Returns `false` if the looper is gone.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.back.send(Message::Run(Box::new(task))).is_ok()
    }

    /// Queues `task` ahead of all back-lane work. Returns `false` if the
    /// looper is gone.
    pub fn post_at_front<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.front.send(Message::Run(Box::new(task))).is_ok()
    }

    /// Runs `task` inline when this context is current, otherwise posts it
    /// to the front of the queue.
    pub fn run_or_post_at_front<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_current() {
            task();
        } else if !self.post_at_front(task) {
            log::warn!("Looper '{}' is gone, dropping callback.", self.name);
        }
    }

    /// Runs `task` on this context and waits for its result.
    ///
    /// Runs inline when the context is already current. Returns `None` if the
    /// looper is gone or the task panicked.
    pub fn run_blocking<R, F>(&self, task: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return Some(task());
        }
        let (reply, result) = flume::bounded(1);
        let posted = self.post(move || {
            let _ = reply.send(task());
        });
        if !posted {
            return None;
        }
        result.recv().ok()
    }

    fn quit(&self) -> bool {
        self.back.send(Message::Quit).is_ok()
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ExecutionContext {}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// A two-lane message queue bound to an [`ExecutionContext`].
pub struct Looper {
    id: u64,
    name: Arc<str>,
    front_rx: flume::Receiver<Message>,
    back_rx: flume::Receiver<Message>,
    context: ExecutionContext,
}

impl Looper {
    /// Creates a looper pumped by hand.
    pub fn new(name: &str) -> Self {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        let name: Arc<str> = Arc::from(name);
        let (front, front_rx) = flume::unbounded();
        let (back, back_rx) = flume::unbounded();
        let context = ExecutionContext {
            id,
            name: Arc::clone(&name),
            front,
            back,
        };
        Self {
            id,
            name,
            front_rx,
            back_rx,
            context,
        }
    }

    /// Starts a looper on a dedicated thread.
    pub fn spawn(name: &str) -> std::io::Result<LooperThread> {
        let looper = Self::new(name);
        let context = looper.context();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || looper.run())?;
        Ok(LooperThread {
            context,
            handle: Some(handle),
        })
    }

    /// Posting handle of this looper.
    pub fn context(&self) -> ExecutionContext {
        self.context.clone()
    }

    /// Runs `f` with this looper's context marked current on the calling thread.
    pub fn enter<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = CurrentGuard::enter(self.id);
        f()
    }

    /// Runs every queued task, including tasks posted while dispatching.
    /// Returns the number of tasks run.
    pub fn dispatch_pending(&self) -> usize {
        let _guard = CurrentGuard::enter(self.id);
        let mut ran = 0;
        loop {
            let message = match self.front_rx.try_recv() {
                Ok(message) => message,
                Err(_) => match self.back_rx.try_recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };
            match message {
                Message::Run(task) => {
                    task();
                    ran += 1;
                }
                Message::Quit => {}
            }
        }
        ran
    }

    /// Returns `true` if no task is queued.
    pub fn is_idle(&self) -> bool {
        self.front_rx.is_empty() && self.back_rx.is_empty()
    }

    fn run(self) {
        let Looper {
            id,
            name,
            front_rx,
            back_rx,
            context,
        } = self;
        // The thread must not keep its own queue alive.
        drop(context);

        let _guard = CurrentGuard::enter(id);
        log::debug!("Looper '{}' started.", name);

        loop {
            let message = match front_rx.try_recv() {
                Ok(message) => Ok(message),
                Err(_) => flume::Selector::new()
                    .recv(&front_rx, |m| m)
                    .recv(&back_rx, |m| m)
                    .wait(),
            };
            match message {
                Ok(Message::Run(task)) => task(),
                Ok(Message::Quit) | Err(_) => break,
            }
        }

        log::debug!("Looper '{}' stopped.", name);
    }
}

/// A looper running on its own thread. Quits and joins when dropped.
pub struct LooperThread {
    context: ExecutionContext,
    handle: Option<thread::JoinHandle<()>>,
}

impl LooperThread {
    /// Posting handle of the looper.
    pub fn context(&self) -> ExecutionContext {
        self.context.clone()
    }

    /// Asks the looper to stop after the work already queued and waits for it.
    pub fn quit(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.context.quit();
            if handle.join().is_err() {
                log::error!("Looper '{}' panicked.", self.context.name());
            }
        }
    }
}

impl Drop for LooperThread {
    fn drop(&mut self) {
        self.quit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_manual_looper_runs_front_lane_first() {
        let looper = Looper::new("test");
        let ctx = looper.context();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (lane, tag) in [("back", 1), ("front", 2), ("back", 3), ("front", 4)] {
            let order = Arc::clone(&order);
            let task = move || order.lock().unwrap().push(tag);
            if lane == "front" {
                ctx.post_at_front(task);
            } else {
                ctx.post(task);
            }
        }

        assert_eq!(looper.dispatch_pending(), 4);
        assert_eq!(*order.lock().unwrap(), vec![2, 4, 1, 3]);
        assert!(looper.is_idle());
    }

    #[test]
    fn test_run_or_post_is_inline_only_on_current_context() {
        let looper = Looper::new("test");
        let ctx = looper.context();
        let hits = Arc::new(Mutex::new(0));

        let h = Arc::clone(&hits);
        ctx.run_or_post_at_front(move || *h.lock().unwrap() += 1);
        assert_eq!(*hits.lock().unwrap(), 0, "must be queued off-context");
        looper.dispatch_pending();
        assert_eq!(*hits.lock().unwrap(), 1);

        let h = Arc::clone(&hits);
        looper.enter(|| ctx.run_or_post_at_front(move || *h.lock().unwrap() += 1));
        assert_eq!(*hits.lock().unwrap(), 2, "must run inline on-context");
        assert!(looper.is_idle());
    }

    #[test]
    fn test_enter_restores_previous_context() {
        let outer = Looper::new("outer");
        let inner = Looper::new("inner");
        let outer_ctx = outer.context();
        let inner_ctx = inner.context();

        outer.enter(|| {
            assert!(outer_ctx.is_current());
            inner.enter(|| {
                assert!(inner_ctx.is_current());
                assert!(!outer_ctx.is_current());
            });
            assert!(outer_ctx.is_current());
        });
        assert!(!outer_ctx.is_current());
    }

    #[test]
    fn test_spawned_looper_runs_tasks_on_its_thread() {
        let thread = Looper::spawn("worker").expect("spawn looper");
        let ctx = thread.context();
        let (tx, rx) = flume::bounded(1);

        let probe = ctx.clone();
        ctx.post(move || {
            tx.send(probe.is_current()).unwrap();
        });

        let was_current = rx
            .recv_timeout(Duration::from_secs(1))
            .expect("task should run");
        assert!(was_current);
        assert!(!ctx.is_current());
    }

    #[test]
    fn test_run_blocking_returns_value_from_looper_thread() {
        let thread = Looper::spawn("blocking").expect("spawn looper");
        let ctx = thread.context();
        let probe = ctx.clone();
        assert_eq!(ctx.run_blocking(move || probe.is_current()), Some(true));
    }

    #[test]
    fn test_run_blocking_is_inline_when_current() {
        let looper = Looper::new("manual");
        let ctx = looper.context();
        let value = looper.enter(|| ctx.run_blocking(|| 7));
        assert_eq!(value, Some(7));
        assert!(looper.is_idle());
    }

    #[test]
    fn test_run_blocking_after_quit_returns_none() {
        let mut thread = Looper::spawn("gone").expect("spawn looper");
        let ctx = thread.context();
        thread.quit();
        assert_eq!(ctx.run_blocking(|| 1), None);
    }

    #[test]
    fn test_post_fails_after_quit() {
        let mut thread = Looper::spawn("short-lived").expect("spawn looper");
        let ctx = thread.context();
        thread.quit();
        assert!(!ctx.post(|| {}));
    }

    #[test]
    fn test_contexts_compare_by_identity() {
        let a = Looper::new("a");
        let b = Looper::new("a");
        assert_eq!(a.context(), a.context());
        assert_ne!(a.context(), b.context());
    }
}
