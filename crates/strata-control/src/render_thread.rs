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

//! The event-thread side of the render thread.

use crate::render_loop::{fail_request, RenderLoop};
use crate::services::{RenderIdleTrigger, SurfaceReplacedTrigger};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use strata_core::frame::{ClockTerminator, FrameClock};
use strata_core::graphics::GraphicsContextLifecycle;
use strata_core::render::FrameRenderer;
use strata_core::request::{RenderRequest, RenderRequestConsumer, RenderRequestQueue};
use strata_core::surface::{
    NativeSurfaceHandle, ReplacementOutcome, ReplacementState, ReplacementTicket,
    SurfaceReplacementProtocol,
};
use strata_core::{AdaptorContext, ContextError};
use strata_telemetry::{FpsTracker, FrameStatistics, FrameSummary};

/// Run count meaning "render until told otherwise".
const CONTINUOUS: i32 = -1;
/// Run count meaning "render one frame, then pause".
pub(crate) const ONCE: i32 = 1;
/// Update requests are counted up to this value.
const MAXIMUM_UPDATE_REQUESTS: u32 = 2;

/// Scheduling state shared by the controller and the render thread.
#[derive(Debug, Default)]
pub(crate) struct ControlState {
    /// Set by start/resume, cleared by pause/stop. Event-thread view only.
    pub(crate) running: bool,
    /// `CONTINUOUS`, a number of frames left to render, or 0 when paused.
    pub(crate) run_count: i32,
    pub(crate) can_sleep: bool,
    pub(crate) pending_update: bool,
    pub(crate) update_requests: u32,
    pub(crate) frames_per_render: Option<u32>,
    pub(crate) stopping: bool,
    /// The render thread is blocked waiting for work.
    pub(crate) idle: bool,
    pub(crate) exited: bool,
    pub(crate) fatal_error: Option<ContextError>,
    /// The request consumer, parked here once the render thread is gone.
    pub(crate) orphaned: Option<RenderRequestConsumer>,
}

impl ControlState {
    fn is_paused(&self) -> bool {
        self.run_count != CONTINUOUS || self.can_sleep
    }

    fn run(&mut self, run_count: i32) {
        self.run_count = run_count;
        self.can_sleep = false;
    }
}

pub(crate) struct SharedState {
    state: Mutex<ControlState>,
    wake: Condvar,
    pub(crate) frames_rendered: AtomicU64,
}

impl SharedState {
    pub(crate) fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn wait<'a>(
        &self,
        guard: MutexGuard<'a, ControlState>,
    ) -> MutexGuard<'a, ControlState> {
        self.wake.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.wake.notify_all();
    }
}

/// What the render thread leaves behind when it exits.
#[derive(Debug)]
pub struct RenderThreadReport {
    /// The surface bound when the thread exited. The graphics context no longer
    /// references it, so the native window can be released.
    pub last_surface: Option<NativeSurfaceHandle>,
    /// Frame totals over the thread's lifetime.
    pub statistics: FrameSummary,
    /// The fatal error that ended the thread, if any.
    pub error: Option<ContextError>,
}

/// Starts, schedules and stops the render thread.
///
/// Lives on the event thread. None of its methods wait for the render thread,
/// except [`stop`](Self::stop) and the explicit replacement waits.
pub struct RenderThreadController<G, R>
where
    G: GraphicsContextLifecycle + 'static,
    R: FrameRenderer + 'static,
{
    shared: Arc<SharedState>,
    terminator: ClockTerminator,
    protocol: SurfaceReplacementProtocol,
    render_loop: Option<RenderLoop<G, R>>,
    handle: Option<thread::JoinHandle<RenderThreadReport>>,
}

impl<G, R> RenderThreadController<G, R>
where
    G: GraphicsContextLifecycle + 'static,
    R: FrameRenderer + 'static,
{
    /// Prepares the render thread without starting it.
    ///
    /// The graphics context configuration and FPS tracking come from
    /// `context.options`. A [`SurfaceReplacedTrigger`] and a [`RenderIdleTrigger`]
    /// registered in `context.services` are fired by the render thread.
    pub fn new(
        context: &AdaptorContext,
        graphics: G,
        renderer: R,
        clock: FrameClock,
        initial_surface: Option<NativeSurfaceHandle>,
    ) -> Self {
        let (producer, consumer) = RenderRequestQueue::channel();
        let replaced = context
            .services
            .get::<SurfaceReplacedTrigger>()
            .map(|service| service.0.clone());
        let idle_trigger = context
            .services
            .get::<RenderIdleTrigger>()
            .map(|service| service.0.clone());

        let shared = Arc::new(SharedState {
            state: Mutex::new(ControlState::default()),
            wake: Condvar::new(),
            frames_rendered: AtomicU64::new(0),
        });

        Self {
            shared: Arc::clone(&shared),
            terminator: clock.terminator(),
            protocol: SurfaceReplacementProtocol::new(producer, replaced),
            render_loop: Some(RenderLoop {
                graphics,
                renderer,
                clock,
                requests: consumer,
                shared,
                context_config: context.options.context_config(),
                context: None,
                surface: initial_surface,
                idle_trigger,
                statistics: FrameStatistics::new(),
                fps: FpsTracker::new(context.options.fps_tracking_seconds),
                previous_stamp: None,
            }),
            handle: None,
        }
    }

    /// Spawns the render thread and starts rendering continuously.
    ///
    /// Does nothing if the thread was already started.
    pub fn start(&mut self) -> std::io::Result<()> {
        let Some(render_loop) = self.render_loop.take() else {
            return Ok(());
        };

        {
            let mut state = self.shared.lock();
            state.running = true;
            state.run(CONTINUOUS);
        }

        match thread::Builder::new()
            .name("strata-render".into())
            .spawn(move || render_loop.run())
        {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(err) => {
                let mut state = self.shared.lock();
                state.running = false;
                state.exited = true;
                Err(err)
            }
        }
    }

    /// Stops rendering after the current frame. Requests are still processed.
    pub fn pause(&self) {
        let mut state = self.shared.lock();
        state.running = false;
        state.run_count = 0;
        log::debug!("Render thread paused.");
    }

    /// Resumes continuous rendering after [`pause`](Self::pause).
    pub fn resume(&self) {
        let mut state = self.shared.lock();
        if !state.running && state.is_paused() && !state.stopping {
            log::debug!("Render thread resumed.");
            state.running = true;
            state.run(CONTINUOUS);
            self.shared.notify();
        }
    }

    /// Asks for more frames, waking the render thread if it went to sleep.
    ///
    /// Requests are counted up to two. Each frame after which the renderer has
    /// nothing left to animate consumes one.
    pub fn request_update(&self) {
        let mut state = self.shared.lock();
        if state.update_requests < MAXIMUM_UPDATE_REQUESTS {
            state.update_requests += 1;
        }
        if state.running && state.is_paused() {
            state.run(CONTINUOUS);
        }
        state.pending_update = true;
        self.shared.notify();
    }

    /// Renders exactly one more frame, even while paused.
    pub fn request_update_once(&self) {
        let mut state = self.shared.lock();
        if state.update_requests < MAXIMUM_UPDATE_REQUESTS {
            state.update_requests += 1;
        }
        if state.is_paused() {
            state.run(ONCE);
            self.shared.notify();
        }
    }

    /// Renders once every `frames_per_render` display refreshes from the next frame on.
    pub fn set_render_refresh_rate(&self, frames_per_render: u32) {
        if frames_per_render < 1 {
            log::warn!("Ignoring render refresh rate of 0.");
            return;
        }
        self.shared.lock().frames_per_render = Some(frames_per_render);
    }

    /// Queues a surface replacement and returns without waiting for it.
    ///
    /// The render thread binds `new_surface` at the next frame boundary. If the
    /// thread is gone, the ticket completes immediately with an error.
    pub fn replace_surface(&mut self, new_surface: NativeSurfaceHandle) -> ReplacementTicket {
        let (ticket, failed) = {
            let mut state = self.shared.lock();
            let ticket = self.protocol.request_replace(new_surface);
            self.shared.notify();
            (ticket, Self::take_orphaned_requests(&mut state))
        };
        failed.fail();
        ticket
    }

    /// Queues a resize of the bound surface.
    pub fn resize_surface(&self, width: u32, height: u32) {
        let failed = {
            let mut state = self.shared.lock();
            self.protocol
                .push_request(RenderRequest::ResizeSurface { width, height });
            self.shared.notify();
            Self::take_orphaned_requests(&mut state)
        };
        failed.fail();
    }

    /// Blocks until the oldest outstanding replacement completes.
    pub fn wait_until_surface_replaced(&mut self) -> Option<ReplacementOutcome> {
        self.protocol.wait_until_surface_replaced()
    }

    /// Acknowledges completed replacements, oldest first.
    pub fn take_completed_replacements(&mut self) -> Vec<ReplacementOutcome> {
        self.protocol.take_completed()
    }

    /// The state of the oldest unacknowledged replacement.
    pub fn replacement_state(&self) -> ReplacementState {
        self.protocol.state()
    }

    /// Returns `true` while the render thread is alive.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.shared.lock().exited
    }

    /// Returns `true` while the render thread is blocked waiting for work.
    pub fn is_sleeping(&self) -> bool {
        self.shared.lock().idle
    }

    /// Frames rendered since start.
    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames_rendered.load(Ordering::Acquire)
    }

    /// The error that ended the render thread, if it failed.
    pub fn fatal_error(&self) -> Option<ContextError> {
        self.shared.lock().fatal_error.clone()
    }

    /// Stops the render thread and waits for it to exit.
    ///
    /// The graphics context is destroyed before this returns. Returns `None` if the
    /// thread panicked or was already stopped.
    pub fn stop(&mut self) -> Option<RenderThreadReport> {
        {
            let mut state = self.shared.lock();
            state.stopping = true;
            state.running = false;
            self.shared.notify();
        }
        self.terminator.terminate();

        if let Some(handle) = self.handle.take() {
            log::debug!("Joining the render thread.");
            return match handle.join() {
                Ok(report) => Some(report),
                Err(_) => {
                    log::error!("Render thread panicked.");
                    None
                }
            };
        }

        // Never started: nothing was created, but queued requests still complete.
        self.render_loop.take().map(RenderLoop::retire)
    }

    fn take_orphaned_requests(state: &mut ControlState) -> OrphanedRequests {
        if !state.exited {
            return OrphanedRequests::default();
        }
        let error = state
            .fatal_error
            .clone()
            .unwrap_or(ContextError::ContextLost);
        let requests = state
            .orphaned
            .as_ref()
            .map(RenderRequestConsumer::drain_all)
            .unwrap_or_default();
        OrphanedRequests {
            requests,
            error: Some(error),
        }
    }
}

impl<G, R> Drop for RenderThreadController<G, R>
where
    G: GraphicsContextLifecycle + 'static,
    R: FrameRenderer + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<G, R> std::fmt::Debug for RenderThreadController<G, R>
where
    G: GraphicsContextLifecycle + 'static,
    R: FrameRenderer + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderThreadController")
            .field("running", &self.is_running())
            .field("frames_rendered", &self.frames_rendered())
            .field("replacements", &self.protocol)
            .finish()
    }
}

/// Requests queued after the render thread exited, completed outside the state lock.
#[derive(Default)]
struct OrphanedRequests {
    requests: Vec<RenderRequest>,
    error: Option<ContextError>,
}

impl OrphanedRequests {
    fn fail(self) {
        if let Some(error) = self.error {
            for request in self.requests {
                fail_request(request, &error);
            }
        }
    }
}
