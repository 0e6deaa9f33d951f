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

//! The body of the render thread.

use crate::render_thread::{RenderThreadReport, SharedState, ONCE};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use strata_core::frame::{FrameClock, FrameTimeStamp};
use strata_core::graphics::{ContextConfig, ContextHandle, GraphicsContextLifecycle};
use strata_core::render::FrameRenderer;
use strata_core::request::{RenderRequest, RenderRequestConsumer};
use strata_core::surface::{NativeSurfaceHandle, ReplaceSurfaceRequest};
use strata_core::trigger::TriggerHandle;
use strata_core::ContextError;
use strata_telemetry::{FpsTracker, FrameStatistics};

/// Why the render thread left its wait.
enum Wake {
    Stop,
    Requests {
        waited: bool,
    },
    Frame {
        waited: bool,
        frames_per_render: Option<u32>,
    },
}

/// Everything the render thread owns.
pub(crate) struct RenderLoop<G, R> {
    pub(crate) graphics: G,
    pub(crate) renderer: R,
    pub(crate) clock: FrameClock,
    pub(crate) requests: RenderRequestConsumer,
    pub(crate) shared: Arc<SharedState>,
    pub(crate) context_config: ContextConfig,
    pub(crate) context: Option<ContextHandle>,
    pub(crate) surface: Option<NativeSurfaceHandle>,
    pub(crate) idle_trigger: Option<TriggerHandle>,
    pub(crate) statistics: FrameStatistics,
    pub(crate) fps: FpsTracker,
    pub(crate) previous_stamp: Option<FrameTimeStamp>,
}

impl<G, R> RenderLoop<G, R>
where
    G: GraphicsContextLifecycle,
    R: FrameRenderer,
{
    /// Runs the thread to completion and hands back what the event thread needs.
    pub(crate) fn run(mut self) -> RenderThreadReport {
        log::info!("Render thread started.");
        let _exit = ExitGuard(Arc::clone(&self.shared));

        let result = match self.initialize() {
            Ok(()) => self.frame_loop(),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            log::error!("Fatal graphics context error, render thread exiting: {err}");
            self.shared.lock().fatal_error = Some(err);
        }

        self.shutdown();
        let report = self.retire();
        log::info!("Render thread stopped.");
        report
    }

    fn initialize(&mut self) -> Result<(), ContextError> {
        let context = self.graphics.create_context(&self.context_config)?;
        // Stored before binding so a failed bind still tears the context down.
        self.context = Some(context);
        self.renderer.context_created();

        if let (Some(context), Some(surface)) = (&self.context, &self.surface) {
            self.graphics.bind_surface(context, surface)?;
            log::debug!("Initial surface {} bound.", surface.id());
        }

        let mode = self.clock.initialize();
        log::debug!("Render thread paced by {mode:?} clock.");
        Ok(())
    }

    fn frame_loop(&mut self) -> Result<(), ContextError> {
        let mut update_required = true;
        let mut resumed = true;

        loop {
            match self.wait_until_ready(update_required) {
                Wake::Stop => return Ok(()),
                Wake::Requests { waited } => {
                    resumed |= waited;
                    self.process_requests()?;
                }
                Wake::Frame {
                    waited,
                    frames_per_render,
                } => {
                    if let Some(frames_per_render) = frames_per_render {
                        self.clock.set_frames_per_render(frames_per_render);
                    }
                    if resumed || waited {
                        self.clock.reset_pacing();
                        self.statistics.break_sequence();
                        self.previous_stamp = None;
                        resumed = false;
                    }

                    let Some(stamp) = self.clock.wait_for_tick() else {
                        return Ok(());
                    };

                    // Frame boundary: nothing is in flight against the old surface.
                    self.process_requests()?;
                    update_required = self.render(&stamp)?;
                }
            }
        }
    }

    /// Blocks while the thread is paused or asleep and there is nothing to process.
    fn wait_until_ready(&self, update_required: bool) -> Wake {
        let shared = Arc::clone(&self.shared);
        let mut state = shared.lock();
        let mut waited = false;

        loop {
            if state.stopping {
                return Wake::Stop;
            }

            let sleeping = state.can_sleep && !update_required && !state.pending_update;
            if state.run_count != 0 && !sleeping {
                state.idle = false;
                state.can_sleep = false;
                state.pending_update = false;
                if state.run_count > 0 {
                    state.run_count -= 1;
                }
                return Wake::Frame {
                    waited,
                    frames_per_render: state.frames_per_render.take(),
                };
            }

            if self.requests.has_pending() {
                state.idle = false;
                return Wake::Requests { waited };
            }

            if !state.idle {
                log::debug!(
                    "Render thread waiting (run count {}, can sleep {}).",
                    state.run_count,
                    state.can_sleep
                );
            }
            state.idle = true;
            waited = true;
            state = shared.wait(state);
        }
    }

    fn process_requests(&mut self) -> Result<(), ContextError> {
        let mut requests = self.requests.drain_all().into_iter();
        let mut processed = false;

        while let Some(request) = requests.next() {
            log::trace!("Processing render request: {}", request.kind_name());
            let result = match request {
                RenderRequest::ReplaceSurface(request) => self.replace_surface(request),
                RenderRequest::ResizeSurface { width, height } => {
                    self.resize_surface(width, height)
                }
            };
            if let Err(err) = result {
                for request in requests {
                    fail_request(request, &err);
                }
                return Err(err);
            }
            processed = true;
        }

        if processed {
            // Draw at least one frame into the new or resized surface, even while paused.
            let mut state = self.shared.lock();
            state.pending_update = true;
            if state.run_count == 0 {
                state.run_count = ONCE;
            }
        }
        Ok(())
    }

    fn replace_surface(&mut self, request: ReplaceSurfaceRequest) -> Result<(), ContextError> {
        request.begin();
        let new_surface = request.new_surface().clone();

        if self.surface.as_ref() == Some(&new_surface) {
            log::warn!("Surface {} is already bound; nothing to replace.", new_surface.id());
            request.complete(None, Ok(()));
            return Ok(());
        }

        match self.rebind(&new_surface) {
            Ok(()) => {
                let previous = self.surface.replace(new_surface.clone());
                self.renderer.surface_replaced(&new_surface);
                log::info!(
                    "Surface replaced: {} -> {}.",
                    previous
                        .as_ref()
                        .map_or_else(|| "none".to_owned(), |surface| surface.id().to_string()),
                    new_surface.id()
                );
                request.complete(previous, Ok(()));
                Ok(())
            }
            Err(err) => {
                log::error!("Failed to bind surface {}: {err}", new_surface.id());
                let previous = self.surface.take();
                request.complete(previous, Err(err.clone()));
                Err(err)
            }
        }
    }

    fn rebind(&mut self, new_surface: &NativeSurfaceHandle) -> Result<(), ContextError> {
        let lost = match &self.context {
            Some(context) => self.graphics.is_context_lost(context),
            None => true,
        };
        if lost {
            self.recreate_context()?;
        }

        let context = self.context.as_ref().ok_or(ContextError::ContextLost)?;
        self.graphics.release_surface(context);
        self.graphics.bind_surface(context, new_surface)
    }

    fn recreate_context(&mut self) -> Result<(), ContextError> {
        log::warn!("Graphics context lost; recreating it.");
        if let Some(context) = self.context.take() {
            self.renderer.context_destroyed();
            self.graphics.destroy_context(context);
        }

        let context = self.graphics.create_context(&self.context_config)?;
        self.context = Some(context);
        self.renderer.context_created();
        Ok(())
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), ContextError> {
        let context = self.context.as_ref().ok_or(ContextError::ContextLost)?;
        self.graphics.resize_surface(context, width, height)?;
        self.renderer.surface_resized(width, height);
        log::debug!("Surface resized to {width}x{height}.");
        Ok(())
    }

    /// Renders one frame. Returns whether the renderer wants another one.
    fn render(&mut self, stamp: &FrameTimeStamp) -> Result<bool, ContextError> {
        let Some(context) = self.context.as_ref() else {
            return Err(ContextError::ContextLost);
        };
        if self.surface.is_none() {
            log::trace!("No surface bound; skipping frame {:?}.", stamp.frame_number);
            self.request_sleep();
            return Ok(false);
        }

        let outcome = self.renderer.render_frame(stamp);
        if outcome.rendered {
            self.graphics.present(context)?;
        }

        self.shared.frames_rendered.fetch_add(1, Ordering::Release);
        self.statistics.record(stamp);
        if let Some(previous) = self.previous_stamp.replace(*stamp) {
            self.fps.track(Duration::from_nanos(stamp.nanos_since(&previous)));
        }
        log::trace!(
            "Frame {:?} done (rendered: {}, keep updating: {}).",
            stamp.frame_number,
            outcome.rendered,
            outcome.keep_updating
        );

        if outcome.keep_updating {
            Ok(true)
        } else {
            self.request_sleep();
            Ok(false)
        }
    }

    /// Consumes one update request and lets the thread sleep once none are left.
    fn request_sleep(&self) {
        let going_to_sleep = {
            let mut state = self.shared.lock();
            state.update_requests = state.update_requests.saturating_sub(1);
            if state.update_requests == 0 {
                state.can_sleep = true;
            }
            state.can_sleep
        };

        if going_to_sleep {
            log::debug!("No update pending; render thread going to sleep.");
            if let Some(trigger) = &self.idle_trigger {
                trigger.trigger();
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(context) = self.context.take() {
            self.renderer.context_destroyed();
            self.graphics.release_surface(&context);
            self.graphics.destroy_context(context);
        }
    }

    /// Marks the thread as gone and fails whatever was queued but never processed.
    pub(crate) fn retire(self) -> RenderThreadReport {
        let RenderLoop {
            requests,
            shared,
            surface,
            statistics,
            ..
        } = self;

        let (pending, error) = {
            let mut state = shared.lock();
            state.exited = true;
            state.idle = false;
            let pending = requests.drain_all();
            state.orphaned = Some(requests);
            (pending, state.fatal_error.clone())
        };

        let reason = error.clone().unwrap_or(ContextError::ContextLost);
        for request in pending {
            fail_request(request, &reason);
        }

        statistics.log_summary();
        RenderThreadReport {
            last_surface: surface,
            statistics: statistics.summary(),
            error,
        }
    }
}

/// Marks the render thread as gone however it leaves, including by panic.
struct ExitGuard(Arc<SharedState>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::error!("Render thread panicked; pending requests will fail.");
        }
        let mut state = self.0.lock();
        state.exited = true;
        state.idle = false;
    }
}

/// Completes a request the render thread will never process.
pub(crate) fn fail_request(request: RenderRequest, error: &ContextError) {
    match request {
        RenderRequest::ReplaceSurface(request) => {
            log::warn!(
                "Dropping replacement with {}: {error}",
                request.new_surface().id()
            );
            request.begin();
            request.complete(None, Err(error.clone()));
        }
        RenderRequest::ResizeSurface { width, height } => {
            log::debug!("Dropping resize to {width}x{height}: {error}");
        }
    }
}
