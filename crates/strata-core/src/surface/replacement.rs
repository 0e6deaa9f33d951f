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

//! The hand-off protocol for swapping the surface a render thread draws into.
//!
//! The event thread calls [`SurfaceReplacementProtocol::request_replace`], which
//! queues a [`ReplaceSurfaceRequest`] and returns a [`ReplacementTicket`] without
//! blocking. The render thread drains the request at a frame boundary, calls
//! [`ReplaceSurfaceRequest::begin`], rebinds its context and finally
//! [`ReplaceSurfaceRequest::complete`]s it, which wakes the event thread through
//! the ticket and the optional trigger.
//!
//! A failed rebind still completes the request, with the error recorded in the
//! [`ReplacementOutcome`]. A request dropped without being completed, for example
//! when the render thread dies with it still queued, completes with
//! [`ContextError::ContextLost`]. There is no timeout: a driver call that never returns
//! stalls the render thread and leaves the ticket pending.

use super::handle::NativeSurfaceHandle;
use crate::error::ContextError;
use crate::request::{RenderRequest, RenderRequestProducer};
use crate::trigger::TriggerHandle;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// The lifecycle of one surface replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementState {
    /// No replacement is in flight.
    Idle,
    /// The request is queued and the render thread has not picked it up yet.
    RequestPending,
    /// The render thread is tearing down the old binding and binding the new surface.
    Replacing,
    /// The render thread is done with the request. The event thread has not acknowledged it yet.
    Completed,
}

/// The result of a completed replacement, handed back to the event thread.
#[derive(Debug, Clone)]
pub struct ReplacementOutcome {
    /// The surface that was bound before the replacement.
    ///
    /// The event thread owns it again and may release the native resource.
    pub previous_surface: Option<NativeSurfaceHandle>,
    /// Set when binding the new surface failed.
    pub error: Option<ContextError>,
}

impl ReplacementOutcome {
    /// Returns `true` if the new surface was bound.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

struct CompletionState {
    state: ReplacementState,
    outcome: Option<ReplacementOutcome>,
}

struct Completion {
    inner: Mutex<CompletionState>,
    condvar: Condvar,
    completed: AtomicBool,
}

impl Completion {
    fn new() -> Self {
        Self {
            inner: Mutex::new(CompletionState {
                state: ReplacementState::RequestPending,
                outcome: None,
            }),
            condvar: Condvar::new(),
            completed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CompletionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A request to replace the render surface, owned by the queue until the render thread claims it.
pub struct ReplaceSurfaceRequest {
    new_surface: NativeSurfaceHandle,
    completion: Arc<Completion>,
    notify: Option<TriggerHandle>,
}

impl ReplaceSurfaceRequest {
    /// The surface to bind.
    pub fn new_surface(&self) -> &NativeSurfaceHandle {
        &self.new_surface
    }

    /// Returns `true` once the request has been completed.
    pub fn is_completed(&self) -> bool {
        self.completion.completed.load(Ordering::Acquire)
    }

    /// Marks the start of the teardown/rebind phase.
    pub fn begin(&self) {
        let mut inner = self.completion.lock();
        if inner.state == ReplacementState::RequestPending {
            inner.state = ReplacementState::Replacing;
        }
    }

    /// Completes the request and wakes the event thread.
    ///
    /// `result` is the outcome of binding the new surface. The request is completed
    /// even when it is an error.
    ///
    /// # Panics
    ///
    /// Panics if the request was already completed.
    pub fn complete(
        self,
        previous_surface: Option<NativeSurfaceHandle>,
        result: Result<(), ContextError>,
    ) {
        let completed = self.finish(previous_surface, result);
        assert!(completed, "surface replacement completed twice");
    }

    fn finish(
        &self,
        previous_surface: Option<NativeSurfaceHandle>,
        result: Result<(), ContextError>,
    ) -> bool {
        {
            let mut inner = self.completion.lock();
            if self.completion.completed.swap(true, Ordering::AcqRel) {
                return false;
            }
            inner.state = ReplacementState::Completed;
            inner.outcome = Some(ReplacementOutcome {
                previous_surface,
                error: result.err(),
            });
        }
        self.completion.condvar.notify_all();

        if let Some(notify) = &self.notify {
            notify.trigger();
        }
        true
    }
}

impl Drop for ReplaceSurfaceRequest {
    fn drop(&mut self) {
        if !self.is_completed() {
            log::warn!(
                "Replacement with {} dropped before it was processed.",
                self.new_surface.id()
            );
            self.finish(None, Err(ContextError::ContextLost));
        }
    }
}

impl std::fmt::Debug for ReplaceSurfaceRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplaceSurfaceRequest")
            .field("new_surface", &self.new_surface)
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// The event thread's view of one replacement.
#[derive(Clone)]
pub struct ReplacementTicket {
    new_surface: NativeSurfaceHandle,
    completion: Arc<Completion>,
}

impl ReplacementTicket {
    /// The surface this replacement binds.
    pub fn new_surface(&self) -> &NativeSurfaceHandle {
        &self.new_surface
    }

    /// Returns `true` once the render thread has completed the request. Never reverts.
    pub fn is_completed(&self) -> bool {
        self.completion.completed.load(Ordering::Acquire)
    }

    /// Returns the current state.
    pub fn state(&self) -> ReplacementState {
        self.completion.lock().state
    }

    /// Returns the outcome without blocking, if the request has completed.
    pub fn outcome(&self) -> Option<ReplacementOutcome> {
        self.completion.lock().outcome.clone()
    }

    /// Blocks until the render thread completes the request.
    pub fn wait_until_surface_replaced(&self) -> ReplacementOutcome {
        let mut inner = self.completion.lock();
        loop {
            if let Some(outcome) = &inner.outcome {
                return outcome.clone();
            }
            inner = self
                .completion
                .condvar
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait_until_surface_replaced`](Self::wait_until_surface_replaced),
    /// giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ReplacementOutcome> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.completion.lock();
        loop {
            if let Some(outcome) = &inner.outcome {
                return Some(outcome.clone());
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            inner = self
                .completion
                .condvar
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Moves a completed replacement back to `Idle` and returns its outcome.
    ///
    /// The previous surface is handed over with the returned outcome and is no
    /// longer kept by the ticket. Returns `None` and changes nothing if the request
    /// has not completed yet.
    pub fn acknowledge(&self) -> Option<ReplacementOutcome> {
        let mut inner = self.completion.lock();
        let stored = inner.outcome.as_mut()?;
        let outcome = ReplacementOutcome {
            previous_surface: stored.previous_surface.take(),
            error: stored.error.clone(),
        };
        inner.state = ReplacementState::Idle;
        Some(outcome)
    }
}

impl std::fmt::Debug for ReplacementTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplacementTicket")
            .field("new_surface", &self.new_surface)
            .field("state", &self.state())
            .finish()
    }
}

/// The event-thread side of surface replacement.
///
/// A second request issued before the first completes is queued behind it. Each
/// request gets its own ticket and completes in order.
pub struct SurfaceReplacementProtocol {
    producer: RenderRequestProducer,
    notify: Option<TriggerHandle>,
    outstanding: VecDeque<ReplacementTicket>,
}

impl SurfaceReplacementProtocol {
    /// Creates the protocol on top of a request producer.
    ///
    /// `notify` is fired by the render thread each time a replacement completes.
    pub fn new(producer: RenderRequestProducer, notify: Option<TriggerHandle>) -> Self {
        Self {
            producer,
            notify,
            outstanding: VecDeque::new(),
        }
    }

    /// Queues a replacement and returns immediately.
    pub fn request_replace(&mut self, new_surface: NativeSurfaceHandle) -> ReplacementTicket {
        if !self.outstanding.is_empty() {
            log::debug!(
                "Queueing replacement with {} behind {} outstanding request(s).",
                new_surface.id(),
                self.outstanding.len()
            );
        }

        let completion = Arc::new(Completion::new());
        let ticket = ReplacementTicket {
            new_surface: new_surface.clone(),
            completion: completion.clone(),
        };
        self.producer
            .push(RenderRequest::ReplaceSurface(ReplaceSurfaceRequest {
                new_surface,
                completion,
                notify: self.notify.clone(),
            }));
        self.outstanding.push_back(ticket.clone());
        ticket
    }

    /// Forwards any other request kind to the render thread.
    pub fn push_request(&self, request: RenderRequest) {
        self.producer.push(request);
    }

    /// The state of the oldest unacknowledged replacement, or `Idle`.
    pub fn state(&self) -> ReplacementState {
        self.outstanding
            .front()
            .map_or(ReplacementState::Idle, ReplacementTicket::state)
    }

    /// Number of replacements not yet acknowledged.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Blocks until the oldest outstanding replacement completes, then acknowledges it.
    ///
    /// Returns `None` if nothing is outstanding.
    pub fn wait_until_surface_replaced(&mut self) -> Option<ReplacementOutcome> {
        let ticket = self.outstanding.pop_front()?;
        ticket.wait_until_surface_replaced();
        ticket.acknowledge()
    }

    /// Acknowledges every completed replacement at the front of the queue, in order.
    ///
    /// Meant to be called from the completion trigger's callback.
    pub fn take_completed(&mut self) -> Vec<ReplacementOutcome> {
        let mut outcomes = Vec::new();
        while let Some(ticket) = self.outstanding.front() {
            match ticket.acknowledge() {
                Some(outcome) => {
                    outcomes.push(outcome);
                    self.outstanding.pop_front();
                }
                None => break,
            }
        }
        outcomes
    }
}

impl std::fmt::Debug for SurfaceReplacementProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceReplacementProtocol")
            .field("outstanding", &self.outstanding.len())
            .field("state", &self.state())
            .finish()
    }
}
