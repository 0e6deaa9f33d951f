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

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

/// Identifies one trigger within its [`TriggerEventManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerId(u64);

/// What happens to a trigger after its callback has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerOptions {
    /// The trigger stays registered and may fire again.
    #[default]
    KeepAlive,
    /// The trigger is removed after its callback runs once.
    DeleteAfterTrigger,
}

#[derive(Default)]
struct PendingState {
    valid: HashSet<TriggerId>,
    triggered: Vec<TriggerId>,
    discarded: Vec<TriggerId>,
    // A wake token has been written for the current burst.
    written: bool,
}

struct Shared {
    state: Mutex<PendingState>,
    wake_tx: flume::Sender<()>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn trigger(&self, id: TriggerId) -> bool {
        let mut state = self.lock();
        if !state.valid.contains(&id) {
            log::trace!("Ignoring trigger {id:?}: it has been discarded.");
            return false;
        }
        if !state.triggered.contains(&id) {
            state.triggered.push(id);
        }
        if !state.written {
            state.written = true;
            drop(state);
            // Full means a wake-up is already pending.
            let _ = self.wake_tx.try_send(());
        }
        true
    }

    fn discard(&self, id: TriggerId) {
        let mut state = self.lock();
        if state.valid.remove(&id) {
            state.discarded.push(id);
        }
    }
}

struct Registered {
    callback: Box<dyn FnMut() + Send>,
    options: TriggerOptions,
}

/// Owns a set of trigger callbacks and runs them on the thread that drives it.
///
/// All triggers of a manager share one wake primitive. A burst of
/// [`TriggerHandle::trigger`] calls writes it once, and each triggered callback
/// runs once per dispatch no matter how many times it was triggered.
///
/// # Example
///
/// ```rust
/// use strata_core::trigger::{TriggerEventManager, TriggerOptions};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let mut manager = TriggerEventManager::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = hits.clone();
/// let event = manager.create_trigger(
///     move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     },
///     TriggerOptions::KeepAlive,
/// );
///
/// let handle = event.handle();
/// std::thread::spawn(move || handle.trigger()).join().unwrap();
///
/// manager.dispatch_pending();
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
pub struct TriggerEventManager {
    shared: Arc<Shared>,
    wake_rx: flume::Receiver<()>,
    callbacks: HashMap<TriggerId, Registered>,
    next_id: u64,
}

impl TriggerEventManager {
    /// Creates a manager with no registered triggers.
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = flume::bounded(1);
        log::debug!("Trigger event manager initialized.");
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PendingState::default()),
                wake_tx,
            }),
            wake_rx,
            callbacks: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a callback and returns the owning [`TriggerEvent`].
    ///
    /// The callback always runs on the thread calling
    /// [`dispatch_pending`](Self::dispatch_pending) and must not block.
    pub fn create_trigger<F>(&mut self, callback: F, options: TriggerOptions) -> TriggerEvent
    where
        F: FnMut() + Send + 'static,
    {
        let id = TriggerId(self.next_id);
        self.next_id += 1;

        self.shared.lock().valid.insert(id);
        self.callbacks.insert(
            id,
            Registered {
                callback: Box::new(callback),
                options,
            },
        );
        log::trace!("Created trigger {id:?} ({options:?}).");

        TriggerEvent {
            handle: TriggerHandle {
                id,
                shared: Arc::downgrade(&self.shared),
            },
        }
    }

    /// Runs the callbacks of every trigger fired since the last dispatch.
    ///
    /// Discarded triggers are removed first, so a trigger discarded before
    /// dispatch never runs. Returns the number of callbacks invoked.
    pub fn dispatch_pending(&mut self) -> usize {
        while self.wake_rx.try_recv().is_ok() {}

        let (triggered, discarded) = {
            let mut state = self.shared.lock();
            state.written = false;
            (
                std::mem::take(&mut state.triggered),
                std::mem::take(&mut state.discarded),
            )
        };

        for id in discarded {
            self.callbacks.remove(&id);
        }

        let mut fired = 0;
        for id in triggered {
            let Some(entry) = self.callbacks.get_mut(&id) else {
                continue;
            };
            (entry.callback)();
            fired += 1;

            if entry.options == TriggerOptions::DeleteAfterTrigger {
                self.callbacks.remove(&id);
                self.shared.discard(id);
            }
        }
        fired
    }

    /// Blocks up to `timeout` for a wake-up, then dispatches.
    ///
    /// Returns the number of callbacks invoked, zero on timeout.
    pub fn wait_and_dispatch(&mut self, timeout: Duration) -> usize {
        match self.wake_rx.recv_timeout(timeout) {
            Ok(()) => self.dispatch_pending(),
            Err(_) => 0,
        }
    }

    /// Runs the loop until `done` returns `true` or `timeout` elapses.
    ///
    /// Returns whether `done` was satisfied.
    pub fn run_until<F>(&mut self, mut done: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            self.dispatch_pending();
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.wait_and_dispatch(deadline - now);
        }
    }

    /// Number of registered callbacks, including discarded ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Returns `true` if no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl Default for TriggerEventManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A non-owning, thread-safe handle used to fire a trigger from any thread.
///
/// Firing a handle whose trigger was discarded, or whose manager is gone,
/// is a no-op that returns `false`.
#[derive(Clone)]
pub struct TriggerHandle {
    id: TriggerId,
    shared: Weak<Shared>,
}

impl TriggerHandle {
    /// Requests that the trigger's callback run on the owner's loop.
    pub fn trigger(&self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.trigger(self.id),
            None => {
                log::trace!("Ignoring trigger {:?}: manager dropped.", self.id);
                false
            }
        }
    }

    /// Returns the trigger's identifier.
    pub fn id(&self) -> TriggerId {
        self.id
    }
}

impl std::fmt::Debug for TriggerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TriggerHandle").field(&self.id).finish()
    }
}

/// The owning side of a trigger. Dropping it discards the trigger.
#[derive(Debug)]
pub struct TriggerEvent {
    handle: TriggerHandle,
}

impl TriggerEvent {
    /// Fires the trigger. See [`TriggerHandle::trigger`].
    pub fn trigger(&self) -> bool {
        self.handle.trigger()
    }

    /// Returns a non-owning handle for other threads.
    pub fn handle(&self) -> TriggerHandle {
        self.handle.clone()
    }

    /// Returns the trigger's identifier.
    pub fn id(&self) -> TriggerId {
        self.handle.id
    }
}

impl Drop for TriggerEvent {
    fn drop(&mut self) {
        if let Some(shared) = self.handle.shared.upgrade() {
            shared.discard(self.handle.id);
        }
    }
}
